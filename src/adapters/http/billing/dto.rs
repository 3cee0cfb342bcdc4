//! HTTP DTOs for billing endpoints.
//!
//! Field names follow the storefront client's wire format, which mixes
//! camelCase request keys with a few snake_case response keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::member::{BillingError, Member};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /checkout-session`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub price_id: Option<String>,
}

/// Body of the endpoints that only take a customer id
/// (`/customer-portal`, `/cancel-subscription`, `/client-secret`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// Body of `POST /create-payment-intent`.
///
/// Older clients send the plan key as `martial_art` or `martialArt`. Each
/// spelling is its own field, so a body carrying both still decodes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentIntentRequest {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub martial_art: Option<String>,
    #[serde(default, rename = "martialArt")]
    pub martial_art_camel: Option<String>,
}

impl PaymentIntentRequest {
    /// The first non-blank of `plan`, `martial_art`, `martialArt`.
    pub fn plan_key(&self) -> Option<&str> {
        [&self.plan, &self.martial_art, &self.martial_art_camel]
            .into_iter()
            .filter_map(|key| key.as_deref())
            .find(|key| !key.trim().is_empty())
    }
}

/// Body of `POST /revenue-data`. A missing `monthsAgo` means the current month.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueDataRequest {
    #[serde(default)]
    pub months_ago: i64,
}

/// Body of `POST /members`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMemberRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Returns the trimmed value of a required string field.
///
/// # Errors
///
/// `BillingError::Validation` naming `field` when the value is absent or blank.
pub fn required_field(field: &str, value: Option<&str>) -> Result<String, BillingError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(BillingError::validation(field, "is required")),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct PublishableKeyResponse {
    pub key: String,
}

/// Hosted page URL (checkout or portal).
#[derive(Debug, Clone, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientSecretResponse {
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// Revenue keyed by year, then English month name.
pub type RevenueDataResponse = BTreeMap<String, BTreeMap<String, i64>>;

/// Member record as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub stripe_customer_id: Option<String>,
    pub is_subscribed: bool,
    pub program: Option<String>,
    /// ISO 8601.
    pub created_at: String,
    /// ISO 8601.
    pub updated_at: String,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id.to_string(),
            email: member.email,
            name: member.name,
            stripe_customer_id: member.customer_ref,
            is_subscribed: member.is_subscribed,
            program: member.program,
            created_at: member.created_at.to_rfc3339(),
            updated_at: member.updated_at.to_rfc3339(),
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
