//! Billing handlers.
//!
//! ## Commands
//! - Registering a member and provisioning its payment customer
//! - Reconciling subscription state from payment webhooks
//! - Cancelling a customer's subscription
//! - Creating a payment intent for a configured plan
//!
//! ## Queries
//! - Monthly revenue report

mod cancel_subscription;
mod create_payment_intent;
mod get_revenue_report;
mod handle_payment_webhook;
mod provision_customer;
mod register_member;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    CANCEL_FAILED_MESSAGE, NO_SUBSCRIPTION_MESSAGE,
};
pub use create_payment_intent::{
    CreatePaymentIntentCommand, CreatePaymentIntentHandler, CreatePaymentIntentResult,
};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    WebhookOutcome,
};
pub use provision_customer::{
    ProvisionCustomerCommand, ProvisionCustomerHandler, ProvisionCustomerResult,
};
pub use register_member::{RegisterMemberCommand, RegisterMemberHandler, RegisterMemberResult};

// Queries
pub use get_revenue_report::{GetRevenueReportHandler, GetRevenueReportQuery, FETCH_FAILED_MESSAGE};
