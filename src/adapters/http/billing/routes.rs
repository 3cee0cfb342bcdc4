//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, create_checkout_session, create_client_secret, create_customer_portal,
    create_member, create_payment_intent, get_member, get_publishable_key, get_revenue_data,
    handle_stripe_webhook, health, BillingAppState,
};

/// Storefront endpoints called by the browser client.
///
/// # Routes
/// - `GET /publishable-key`
/// - `POST /checkout-session`
/// - `POST /customer-portal`
/// - `POST /cancel-subscription`
/// - `POST /client-secret`
/// - `POST /create-payment-intent`
/// - `POST /revenue-data`
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/publishable-key", get(get_publishable_key))
        .route("/checkout-session", post(create_checkout_session))
        .route("/customer-portal", post(create_customer_portal))
        .route("/cancel-subscription", post(cancel_subscription))
        .route("/client-secret", post(create_client_secret))
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/revenue-data", post(get_revenue_data))
}

/// Member record endpoints.
///
/// # Routes
/// - `POST /members` - Register a member and provision its customer
/// - `GET /members/:id`
pub fn member_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/members", post(create_member))
        .route("/members/:id", get(get_member))
}

/// Webhook endpoint. Kept apart because it reads the raw body.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/webhook", post(handle_stripe_webhook))
}

/// The complete billing router, including `GET /health`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .merge(billing_routes())
        .merge(member_routes())
        .merge(webhook_routes())
        .route("/health", get(health))
}
