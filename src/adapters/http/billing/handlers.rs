//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to the billing command/query handlers
//! and to the payment port directly where no domain logic is involved.

use std::collections::HashMap;
use std::sync::Arc;

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Json, Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde::de::DeserializeOwned;

use crate::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CreatePaymentIntentCommand,
    CreatePaymentIntentHandler, GetRevenueReportHandler, GetRevenueReportQuery,
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, RegisterMemberCommand,
    RegisterMemberHandler, WebhookOutcome,
};
use crate::domain::foundation::MemberId;
use crate::domain::member::{BillingError, StripeWebhookVerifier};
use crate::ports::{CreateCheckoutRequest, MemberRepository, PaymentProvider};

use super::dto::{
    required_field, CheckoutSessionRequest, ClientSecretResponse, CreateMemberRequest,
    CustomerRequest, ErrorResponse, MemberResponse, MessageResponse, PaymentIntentRequest,
    PaymentIntentResponse, PublishableKeyResponse, RevenueDataRequest, RevenueDataResponse,
    UrlResponse,
};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub const CANCELLED_MESSAGE: &str = "Subscription cancelled successfully";
pub const UNHANDLED_EVENT_BODY: &str = "Unhandled event type";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Static billing settings resolved from configuration at startup.
#[derive(Debug, Clone, Default)]
pub struct BillingSettings {
    pub publishable_key: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    pub portal_return_url: String,
    /// Answer `/customer-portal` with a 303 instead of a JSON body.
    pub portal_redirect: bool,
    /// Plan key -> price id.
    pub plan_prices: HashMap<String, String>,
    /// `None` disables webhook signature verification.
    pub webhook_verifier: Option<StripeWebhookVerifier>,
}

/// Shared application state containing all dependencies.
#[derive(Clone)]
pub struct BillingAppState {
    pub member_repository: Arc<dyn MemberRepository>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub settings: Arc<BillingSettings>,
}

impl BillingAppState {
    pub fn new(
        member_repository: Arc<dyn MemberRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        settings: BillingSettings,
    ) -> Self {
        Self {
            member_repository,
            payment_provider,
            settings: Arc::new(settings),
        }
    }

    pub fn webhook_handler(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(
            self.member_repository.clone(),
            self.payment_provider.clone(),
            self.settings.webhook_verifier.clone(),
        )
    }

    pub fn register_member_handler(&self) -> RegisterMemberHandler {
        RegisterMemberHandler::new(self.member_repository.clone(), self.payment_provider.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.payment_provider.clone())
    }

    pub fn payment_intent_handler(&self) -> CreatePaymentIntentHandler {
        CreatePaymentIntentHandler::new(
            self.payment_provider.clone(),
            self.settings.plan_prices.clone(),
        )
    }

    pub fn revenue_report_handler(&self) -> GetRevenueReportHandler {
        GetRevenueReportHandler::new(self.payment_provider.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Extractors
// ════════════════════════════════════════════════════════════════════════════════

/// JSON body extractor whose rejections use the billing error body.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = BillingApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(BillingApiError::from(body_error(rejection))),
        }
    }
}

fn body_error(rejection: JsonRejection) -> BillingError {
    BillingError::validation("body", rejection.body_text())
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /publishable-key
pub async fn get_publishable_key(State(state): State<BillingAppState>) -> impl IntoResponse {
    Json(PublishableKeyResponse {
        key: state.settings.publishable_key.clone(),
    })
}

/// GET /members/:id
pub async fn get_member(
    State(state): State<BillingAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let member_id: MemberId = id
        .parse()
        .map_err(|_| BillingError::validation("id", "must be a UUID"))?;

    let member = state
        .member_repository
        .find_by_id(&member_id)
        .await
        .map_err(BillingError::from)?
        .ok_or_else(|| BillingError::not_found("Member not found"))?;

    Ok(Json(MemberResponse::from(member)))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /checkout-session
pub async fn create_checkout_session(
    State(state): State<BillingAppState>,
    ValidatedJson(request): ValidatedJson<CheckoutSessionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let customer_id = required_field("customerId", request.customer_id.as_deref())?;
    let price_id = required_field("priceId", request.price_id.as_deref())?;

    let session = state
        .payment_provider
        .create_checkout_session(CreateCheckoutRequest {
            customer_id,
            price_id,
            success_url: state.settings.checkout_success_url.clone(),
            cancel_url: state.settings.checkout_cancel_url.clone(),
        })
        .await
        .map_err(BillingError::from)?;

    Ok(Json(UrlResponse { url: session.url }))
}

/// POST /customer-portal
pub async fn create_customer_portal(
    State(state): State<BillingAppState>,
    ValidatedJson(request): ValidatedJson<CustomerRequest>,
) -> Result<Response, BillingApiError> {
    let customer_id = required_field("customerId", request.customer_id.as_deref())?;

    let session = state
        .payment_provider
        .create_portal_session(&customer_id, &state.settings.portal_return_url)
        .await
        .map_err(BillingError::from)?;

    if state.settings.portal_redirect {
        return Ok(Redirect::to(&session.url).into_response());
    }
    Ok(Json(UrlResponse { url: session.url }).into_response())
}

/// POST /cancel-subscription
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    ValidatedJson(request): ValidatedJson<CustomerRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let customer_id = required_field("customerId", request.customer_id.as_deref())?;

    state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand { customer_id })
        .await?;

    Ok(Json(MessageResponse {
        message: CANCELLED_MESSAGE.to_string(),
    }))
}

/// POST /client-secret
pub async fn create_client_secret(
    State(state): State<BillingAppState>,
    ValidatedJson(request): ValidatedJson<CustomerRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let customer_id = required_field("customerId", request.customer_id.as_deref())?;

    let session = state
        .payment_provider
        .create_customer_session(&customer_id)
        .await
        .map_err(BillingError::from)?;

    Ok(Json(ClientSecretResponse {
        client_secret: session.client_secret,
    }))
}

/// POST /create-payment-intent
pub async fn create_payment_intent(
    State(state): State<BillingAppState>,
    ValidatedJson(request): ValidatedJson<PaymentIntentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let plan = required_field("plan", request.plan_key())?;

    let result = state
        .payment_intent_handler()
        .handle(CreatePaymentIntentCommand { plan })
        .await?;

    Ok(Json(PaymentIntentResponse {
        client_secret: result.client_secret,
    }))
}

/// POST /revenue-data
pub async fn get_revenue_data(
    State(state): State<BillingAppState>,
    ValidatedJson(request): ValidatedJson<RevenueDataRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let report = state
        .revenue_report_handler()
        .handle(GetRevenueReportQuery {
            months_ago: request.months_ago,
        })
        .await?;

    let response: RevenueDataResponse = report.into_inner();
    Ok(Json(response))
}

/// POST /members
pub async fn create_member(
    State(state): State<BillingAppState>,
    ValidatedJson(request): ValidatedJson<CreateMemberRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .register_member_handler()
        .handle(RegisterMemberCommand {
            email: request.email.unwrap_or_default(),
            name: request.name.unwrap_or_default(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(MemberResponse::from(result.member))))
}

/// POST /webhook
///
/// Takes the raw body so the signature is checked against the exact bytes
/// the platform signed.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BillingApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let result = state
        .webhook_handler()
        .handle(cmd)
        .await
        .map_err(BillingApiError::for_webhook)?;

    tracing::info!(
        event_id = %result.event_id,
        event_type = %result.event_type,
        outcome = ?result.outcome,
        "Webhook processed"
    );

    match result.outcome {
        WebhookOutcome::Unhandled { .. } => {
            Ok((StatusCode::OK, UNHANDLED_EVENT_BODY).into_response())
        }
        _ => Ok(StatusCode::OK.into_response()),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError {
    status: StatusCode,
    error: BillingError,
}

impl BillingApiError {
    /// Webhook mapping: a missing member is a server-side failure so the
    /// platform redelivers the event.
    pub fn for_webhook(error: BillingError) -> Self {
        match error {
            BillingError::NotFound(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error,
            },
            other => Self::from(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<BillingError> for BillingApiError {
    fn from(error: BillingError) -> Self {
        let status = match &error {
            BillingError::Validation { .. } | BillingError::Decode(_) => StatusCode::BAD_REQUEST,
            BillingError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
            BillingError::NotFound(_) => StatusCode::NOT_FOUND,
            BillingError::Upstream(_) | BillingError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self { status, error }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, "Request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.error, "Request rejected");
        }

        let body = ErrorResponse::new(self.error.to_string());
        (self.status, Json(body)).into_response()
    }
}
