//! Member domain module.
//!
//! The member record, the webhook event vocabulary the reconciler consumes,
//! and the error taxonomy shared by every billing operation.
//!
//! # Module Structure
//!
//! - `aggregate` - Member record and its state transitions
//! - `errors` - `BillingError`
//! - `events` - Webhook envelope and the closed `BillingEvent` enum
//! - `webhook_verifier` - Stripe-Signature verification

mod aggregate;
mod errors;
pub mod events;
mod webhook_verifier;

pub use aggregate::Member;
pub use errors::BillingError;
pub use events::{
    BillingEvent, InvoiceObject, ObjectRef, SubscriptionObject, WebhookEnvelope,
};
pub use webhook_verifier::{
    signature_header, SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS,
};
