//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe, including:
//! - Customer creation
//! - Checkout, billing portal and customer sessions
//! - Subscription listing and cancellation
//! - Price, product and payment-intent access
//!
//! Webhook signatures are verified in the domain
//! (`domain::member::StripeWebhookVerifier`), not here.

mod api_types;
mod mock_payment_provider;
mod stripe_adapter;

pub use api_types::{StripeErrorBody, StripeList};
pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter, DEFAULT_API_BASE_URL};
