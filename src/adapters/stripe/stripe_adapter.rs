//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port over Stripe's form-encoded REST API.
//! Every call authenticates with the secret key as the basic-auth user.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(secret_key).with_base_url("http://localhost:12111");
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::revenue::{PaymentSummary, RevenueWindow};
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, CreatePaymentIntentRequest,
    Customer, CustomerSession, PaymentError, PaymentErrorCode, PaymentIntent, PaymentProvider,
    PortalSession, Price, Product, Subscription,
};

use super::api_types::{
    StripeCheckoutSession, StripeCustomer, StripeCustomerSession, StripeErrorBody, StripeList,
    StripePaymentIntent, StripePortalSession, StripePrice, StripeProduct, StripeSubscription,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Maximum page size Stripe accepts for list endpoints.
const LIST_PAGE_LIMIT: &str = "100";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (stripe-mock, local fakes).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let request = self.authed(self.http_client.post(self.url(path))).form(params);
        self.send(request, path).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let request = self.authed(self.http_client.get(self.url(path))).query(query);
        self.send(request, path).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, PaymentError> {
        let request = self.authed(self.http_client.delete(self.url(path)));
        self.send(request, path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, PaymentError> {
        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !status.is_success() {
            let err = error_from_response(status, &body);
            tracing::error!(
                path = path,
                status = status.as_u16(),
                error = %err,
                "Stripe API call failed"
            );
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Maps a non-2xx Stripe response onto a `PaymentError`, preferring the
/// message from Stripe's `{"error": {...}}` body.
fn error_from_response(status: StatusCode, body: &str) -> PaymentError {
    let code = match status {
        StatusCode::UNAUTHORIZED => PaymentErrorCode::AuthenticationError,
        StatusCode::PAYMENT_REQUIRED => PaymentErrorCode::CardDeclined,
        StatusCode::NOT_FOUND => PaymentErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
        StatusCode::BAD_REQUEST => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    match serde_json::from_str::<StripeErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| format!("Stripe API error ({})", status.as_u16()));
            let err = PaymentError::new(code, message);
            match parsed.error.code.or(parsed.error.error_type) {
                Some(provider_code) => err.with_provider_code(provider_code),
                None => err,
            }
        }
        Err(_) => PaymentError::new(code, format!("Stripe API error ({}): {}", status.as_u16(), body)),
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let params = [
            ("email", request.email.clone()),
            ("name", request.name.clone()),
            ("metadata[member_id]", request.member_id.to_string()),
        ];

        let customer: StripeCustomer = self.post_form("/v1/customers", &params).await?;

        Ok(Customer {
            id: customer.id,
            email: customer.email.or(Some(request.email)),
            name: customer.name.or(Some(request.name)),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = [
            ("mode", "subscription".to_string()),
            ("customer", request.customer_id),
            ("line_items[0][price]", request.price_id),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url),
            ("cancel_url", request.cancel_url),
        ];

        let session: StripeCheckoutSession =
            self.post_form("/v1/checkout/sessions", &params).await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Checkout session has no URL"))?;

        Ok(CheckoutSession { id: session.id, url })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let params = [
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];

        let session: StripePortalSession =
            self.post_form("/v1/billing_portal/sessions", &params).await?;

        Ok(PortalSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, PaymentError> {
        let query = [("customer", customer_id.to_string())];

        let page: StripeList<StripeSubscription> = self.get("/v1/subscriptions", &query).await?;

        Ok(page.data.into_iter().map(into_subscription).collect())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError> {
        let path = format!("/v1/subscriptions/{}", subscription_id);

        let sub: StripeSubscription = self.delete(&path).await?;

        Ok(into_subscription(sub))
    }

    async fn create_customer_session(
        &self,
        customer_id: &str,
    ) -> Result<CustomerSession, PaymentError> {
        let params = [
            ("customer", customer_id.to_string()),
            ("components[pricing_table][enabled]", "true".to_string()),
        ];

        let session: StripeCustomerSession =
            self.post_form("/v1/customer_sessions", &params).await?;

        Ok(CustomerSession {
            client_secret: session.client_secret,
        })
    }

    async fn get_price(&self, price_id: &str) -> Result<Price, PaymentError> {
        let path = format!("/v1/prices/{}", price_id);

        let price: StripePrice = self.get(&path, &[]).await?;

        Ok(Price {
            id: price.id,
            unit_amount: price.unit_amount,
            currency: price.currency,
            product: price.product.map(|p| p.id().to_string()),
        })
    }

    async fn get_product(&self, product_id: &str) -> Result<Product, PaymentError> {
        let path = format!("/v1/products/{}", product_id);

        let product: StripeProduct = self.get(&path, &[]).await?;

        Ok(Product {
            id: product.id,
            name: product.name,
        })
    }

    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let params = [
            ("amount", request.amount.to_string()),
            ("currency", request.currency),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[plan]", request.plan),
        ];

        let intent: StripePaymentIntent = self.post_form("/v1/payment_intents", &params).await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::provider("Payment intent has no client secret"))?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        })
    }

    async fn list_payment_intents(
        &self,
        window: RevenueWindow,
    ) -> Result<Vec<PaymentSummary>, PaymentError> {
        let mut payments = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![
                ("created[gte]", window.start.timestamp().to_string()),
                ("created[lte]", window.end.timestamp().to_string()),
                ("limit", LIST_PAGE_LIMIT.to_string()),
            ];
            if let Some(cursor) = &starting_after {
                query.push(("starting_after", cursor.clone()));
            }

            let page: StripeList<StripePaymentIntent> =
                self.get("/v1/payment_intents", &query).await?;

            starting_after = page.data.last().map(|pi| pi.id.clone());
            let has_more = page.has_more;

            for intent in page.data {
                payments.push(into_payment_summary(intent)?);
            }

            if !has_more || starting_after.is_none() {
                break;
            }
        }

        tracing::debug!(
            count = payments.len(),
            start = %window.start,
            end = %window.end,
            "Listed payment intents"
        );

        Ok(payments)
    }
}

fn into_subscription(sub: StripeSubscription) -> Subscription {
    Subscription {
        customer_id: sub.customer.id().to_string(),
        id: sub.id,
        status: sub.status,
    }
}

fn into_payment_summary(intent: StripePaymentIntent) -> Result<PaymentSummary, PaymentError> {
    let created = chrono::DateTime::from_timestamp(intent.created, 0).ok_or_else(|| {
        PaymentError::provider(format!(
            "Payment intent {} has invalid created timestamp",
            intent.id
        ))
    })?;

    Ok(PaymentSummary {
        id: intent.id,
        amount: intent.amount,
        currency: intent.currency,
        status: intent.status,
        created,
    })
}
