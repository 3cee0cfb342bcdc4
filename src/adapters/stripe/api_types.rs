//! Stripe REST response shapes.
//!
//! Only the fields the adapter maps into port types are captured; Stripe
//! sends many more and serde ignores them.

use serde::{Deserialize, Serialize};

use crate::domain::member::ObjectRef;

/// Paginated list wrapper (`"object": "list"`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,
    /// Hosted checkout URL; null once the session is complete or expired.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePortalSession {
    /// Unique session identifier (bps_...).
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,
    pub customer: ObjectRef,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomerSession {
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    /// Unique price identifier (price_...).
    pub id: String,
    pub unit_amount: Option<i64>,
    pub currency: String,
    pub product: Option<ObjectRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeProduct {
    /// Unique product identifier (prod_...).
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentIntent {
    /// Unique payment intent identifier (pi_...).
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    /// Unix timestamp of creation.
    pub created: i64,
    pub client_secret: Option<String>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    pub message: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}
