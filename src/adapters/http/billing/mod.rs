//! HTTP adapter for billing endpoints.
//!
//! - `GET /publishable-key` - Stripe publishable key for the client
//! - `POST /checkout-session` - Hosted subscription checkout
//! - `POST /customer-portal` - Billing portal session (JSON or 303)
//! - `POST /cancel-subscription` - Cancel the customer's latest subscription
//! - `POST /client-secret` - Customer session for the pricing table
//! - `POST /create-payment-intent` - One-off payment for a configured plan
//! - `POST /revenue-data` - Succeeded revenue by year and month
//! - `POST /members`, `GET /members/:id` - Member records
//! - `POST /webhook` - Stripe webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState, BillingSettings, ValidatedJson};
pub use routes::billing_router;
