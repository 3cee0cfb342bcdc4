//! Member record.
//!
//! A member is the record-store row that billing state hangs off. It carries
//! the payment-platform customer reference and the subscription flags that
//! webhooks reconcile.
//!
//! # Invariants
//!
//! - `email` and `name` are non-blank
//! - `customer_ref` is set at most once and never reassigned
//! - `mark_subscribed` / `mark_unsubscribed` are plain assignments, so
//!   applying either twice leaves the same state as applying it once

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::MemberId;

use super::BillingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub email: String,
    pub name: String,

    /// Stripe customer id (`cus_...`); `None` until provisioning completes.
    pub customer_ref: Option<String>,

    pub is_subscribed: bool,

    /// Plan/product name, set from the product attached to a paid invoice.
    pub program: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Creates a new, unsubscribed member without a customer reference.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Validation` when `email` or `name` is blank.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Result<Self, BillingError> {
        let email = required("email", email.into())?;
        let name = required("name", name.into())?;
        let now = Utc::now();

        Ok(Self {
            id: MemberId::new(),
            email,
            name,
            customer_ref: None,
            is_subscribed: false,
            program: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a member from stored fields, enforcing the same field rules
    /// as creation so that a malformed row surfaces as an error.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: MemberId,
        email: Option<String>,
        name: Option<String>,
        customer_ref: Option<String>,
        is_subscribed: bool,
        program: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        let email = required("email", email.unwrap_or_default())?;
        let name = required("name", name.unwrap_or_default())?;

        Ok(Self {
            id,
            email,
            name,
            customer_ref: customer_ref.filter(|r| !r.trim().is_empty()),
            is_subscribed,
            program: program.filter(|p| !p.trim().is_empty()),
            created_at,
            updated_at,
        })
    }

    pub fn has_customer_ref(&self) -> bool {
        self.customer_ref.is_some()
    }

    /// Records the payment-platform customer id.
    ///
    /// Assigning the value already held is a no-op.
    ///
    /// # Errors
    ///
    /// - `Validation` if `customer_ref` is blank
    /// - `Validation` if a different reference is already assigned
    pub fn assign_customer_ref(&mut self, customer_ref: impl Into<String>) -> Result<(), BillingError> {
        let customer_ref = required("customer_ref", customer_ref.into())?;

        match &self.customer_ref {
            Some(existing) if *existing == customer_ref => Ok(()),
            Some(existing) => Err(BillingError::validation(
                "customer_ref",
                format!("member already linked to customer {}", existing),
            )),
            None => {
                self.customer_ref = Some(customer_ref);
                self.touch();
                Ok(())
            }
        }
    }

    /// Marks the member as subscribed. `program` replaces the stored plan
    /// name only when present.
    pub fn mark_subscribed(&mut self, program: Option<String>) {
        self.is_subscribed = true;
        if let Some(program) = program {
            self.program = Some(program);
        }
        self.touch();
    }

    pub fn mark_unsubscribed(&mut self) {
        self.is_subscribed = false;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn required(field: &str, value: String) -> Result<String, BillingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BillingError::validation(field, "must not be blank"));
    }
    Ok(trimmed.to_string())
}
