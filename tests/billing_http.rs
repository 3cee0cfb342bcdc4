//! Integration tests for the billing HTTP surface.
//!
//! Drives the full axum router with `tower::ServiceExt::oneshot`, backed by
//! the scriptable Stripe mock and the in-memory member store.

use std::collections::HashMap;

use axum::body::{to_bytes, Body};
use axum::Router;
use chrono::{Datelike, TimeZone, Utc};
use http::{header, Method, Request, StatusCode};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use member_billing::adapters::http::{billing_router, BillingAppState, BillingSettings};
use member_billing::adapters::memory::InMemoryMemberRepository;
use member_billing::adapters::stripe::MockPaymentProvider;
use member_billing::domain::foundation::DomainError;
use member_billing::domain::member::{signature_header, Member, StripeWebhookVerifier};
use member_billing::domain::revenue::PaymentSummary;
use member_billing::ports::{MemberRepository, PaymentError, Price, Product, Subscription};

const WEBHOOK_SECRET: &str = "whsec_test_secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    members: InMemoryMemberRepository,
    stripe: MockPaymentProvider,
}

fn settings() -> BillingSettings {
    BillingSettings {
        publishable_key: "pk_test_123".to_string(),
        checkout_success_url: "https://dojo.example.com/success".to_string(),
        checkout_cancel_url: "https://dojo.example.com/cancel".to_string(),
        portal_return_url: "https://dojo.example.com/account".to_string(),
        portal_redirect: false,
        plan_prices: HashMap::from([("karate".to_string(), "price_karate".to_string())]),
        webhook_verifier: None,
    }
}

fn app_with(settings: BillingSettings) -> TestApp {
    let members = InMemoryMemberRepository::new();
    let stripe = MockPaymentProvider::new();
    let state = BillingAppState::new(
        std::sync::Arc::new(members.clone()),
        std::sync::Arc::new(stripe.clone()),
        settings,
    );

    TestApp {
        router: billing_router().with_state(state),
        members,
        stripe,
    }
}

fn app() -> TestApp {
    app_with(settings())
}

fn signed_app() -> TestApp {
    app_with(BillingSettings {
        webhook_verifier: Some(StripeWebhookVerifier::new(SecretString::new(
            WEBHOOK_SECRET.to_string(),
        ))),
        ..settings()
    })
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, ResponseHeaders, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, ResponseHeaders { location }, body.to_vec())
}

struct ResponseHeaders {
    location: Option<String>,
}

async fn post_json(app: &TestApp, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, bytes) = send(app, request).await;
    (status, parse(&bytes))
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, bytes) = send(app, request).await;
    (status, parse(&bytes))
}

async fn post_webhook(app: &TestApp, payload: &[u8], signature: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(Method::POST).uri("/webhook");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    let request = builder.body(Body::from(payload.to_vec())).unwrap();
    let (status, _, bytes) = send(app, request).await;
    (status, bytes)
}

fn parse(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

fn event(event_type: &str, object: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_test_1",
        "type": event_type,
        "created": 1_700_000_000,
        "livemode": false,
        "data": { "object": object }
    }))
    .unwrap()
}

fn paid_invoice(customer: &str) -> Value {
    json!({
        "id": "in_1",
        "customer": customer,
        "subscription": "sub_1",
        "lines": { "data": [ { "price": { "id": "price_karate", "product": "prod_karate" } } ] }
    })
}

async fn seed_member(app: &TestApp, customer_ref: &str, subscribed: bool) -> Member {
    let mut member = Member::new("ana@example.com", "Ana").unwrap();
    member.assign_customer_ref(customer_ref).unwrap();
    if subscribed {
        member.mark_subscribed(Some("Judo".to_string()));
    }
    app.members.seed(member.clone()).await;
    member
}

fn subscription(id: &str, customer: &str) -> Subscription {
    Subscription {
        id: id.to_string(),
        customer_id: customer.to_string(),
        status: "active".to_string(),
    }
}

// =============================================================================
// Storefront Endpoints
// =============================================================================

#[tokio::test]
async fn publishable_key_is_served() {
    let app = app();
    let (status, body) = get(&app, "/publishable-key").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "key": "pk_test_123" }));
}

#[tokio::test]
async fn health_answers_ok() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn checkout_session_returns_hosted_url() {
    let app = app();
    let (status, body) = post_json(
        &app,
        "/checkout-session",
        json!({ "customerId": "cus_1", "priceId": "price_karate" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://checkout.stripe.test/"), "url: {url}");
    assert_eq!(
        app.stripe.calls()[0].args,
        vec!["cus_1".to_string(), "price_karate".to_string()]
    );
}

#[tokio::test]
async fn checkout_session_requires_price_id() {
    let app = app();
    let (status, body) = post_json(&app, "/checkout-session", json!({ "customerId": "cus_1" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("priceId"));
    assert!(!app.stripe.was_called("create_checkout_session"));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request_with_error_body() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/checkout-session")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, bytes) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(parse(&bytes)["error"].is_string());
}

#[tokio::test]
async fn provider_failure_is_500_with_message_passed_through() {
    let app = app();
    app.stripe
        .set_method_error("create_checkout_session", PaymentError::provider("No such price"));

    let (status, body) = post_json(
        &app,
        "/checkout-session",
        json!({ "customerId": "cus_1", "priceId": "price_gone" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "No such price" }));
}

#[tokio::test]
async fn customer_portal_returns_url_as_json() {
    let app = app();
    let (status, body) = post_json(&app, "/customer-portal", json!({ "customerId": "cus_1" })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["url"].as_str().unwrap().starts_with("https://billing.stripe.test/"));
    assert_eq!(
        app.stripe.calls()[0].args,
        vec!["cus_1".to_string(), "https://dojo.example.com/account".to_string()]
    );
}

#[tokio::test]
async fn customer_portal_redirects_when_configured() {
    let app = app_with(BillingSettings {
        portal_redirect: true,
        ..settings()
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/customer-portal")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "customerId": "cus_1" }).to_string()))
        .unwrap();
    let (status, headers, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(headers
        .location
        .unwrap()
        .starts_with("https://billing.stripe.test/"));
}

#[tokio::test]
async fn cancel_subscription_cancels_the_latest_subscription() {
    let app = app();
    app.stripe.add_subscription(subscription("sub_1", "cus_1"));

    let (status, body) =
        post_json(&app, "/cancel-subscription", json!({ "customerId": "cus_1" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Subscription cancelled successfully" }));
    assert!(app.stripe.subscriptions_for("cus_1").is_empty());
}

#[tokio::test]
async fn cancel_subscription_without_subscriptions_is_404() {
    let app = app();
    let (status, body) =
        post_json(&app, "/cancel-subscription", json!({ "customerId": "cus_1" })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "No subscription found for the customer" }));
    assert!(!app.stripe.was_called("cancel_subscription"));
}

#[tokio::test]
async fn cancel_subscription_provider_failure_is_500() {
    let app = app();
    app.stripe.add_subscription(subscription("sub_1", "cus_1"));
    app.stripe
        .set_method_error("cancel_subscription", PaymentError::network("connection reset"));

    let (status, body) =
        post_json(&app, "/cancel-subscription", json!({ "customerId": "cus_1" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to cancel subscription" }));
}

#[tokio::test]
async fn client_secret_comes_from_a_customer_session() {
    let app = app();
    let (status, body) = post_json(&app, "/client-secret", json!({ "customerId": "cus_1" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "client_secret": "cuss_secret_cus_1" }));
}

#[tokio::test]
async fn payment_intent_uses_configured_plan_price() {
    let app = app();
    app.stripe.add_price(Price {
        id: "price_karate".to_string(),
        unit_amount: Some(5000),
        currency: "usd".to_string(),
        product: Some("prod_karate".to_string()),
    });

    let (status, body) =
        post_json(&app, "/create-payment-intent", json!({ "martialArt": "karate" })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["clientSecret"].as_str().unwrap().ends_with("_secret_test"));
    let call = app
        .stripe
        .calls()
        .into_iter()
        .find(|c| c.method == "create_payment_intent")
        .unwrap();
    assert_eq!(call.args, vec!["5000", "usd", "karate"]);
}

#[tokio::test]
async fn payment_intent_for_unknown_plan_is_rejected() {
    let app = app();
    let (status, body) = post_json(&app, "/create-payment-intent", json!({ "plan": "fencing" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("plan"));
    assert!(!app.stripe.was_called("create_payment_intent"));
}

#[tokio::test]
async fn revenue_data_groups_succeeded_payments_by_year_and_month() {
    let app = app();
    let march = |day| Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
    for (id, amount, status, day) in [
        ("pi_1", 1000, "succeeded", 5),
        ("pi_2", 2500, "succeeded", 20),
        ("pi_3", 9900, "requires_payment_method", 21),
    ] {
        app.stripe.add_payment_intent(PaymentSummary {
            id: id.to_string(),
            amount,
            currency: "usd".to_string(),
            status: status.to_string(),
            created: march(day),
        });
    }

    let now = Utc::now();
    let months_ago = (now.year() - 2024) * 12 + now.month() as i32 - 3;

    let (status, body) = post_json(&app, "/revenue-data", json!({ "monthsAgo": months_ago })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "2024": { "March": 3500 } }));
}

#[tokio::test]
async fn revenue_data_rejects_negative_months() {
    let app = app();
    let (status, body) = post_json(&app, "/revenue-data", json!({ "monthsAgo": -1 })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("monthsAgo"));
}

#[tokio::test]
async fn revenue_data_fetch_failure_is_500() {
    let app = app();
    app.stripe
        .set_method_error("list_payment_intents", PaymentError::network("timeout"));

    let (status, body) = post_json(&app, "/revenue-data", json!({ "monthsAgo": 1 })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to fetch payment intents" }));
}

// =============================================================================
// Member Endpoints
// =============================================================================

#[tokio::test]
async fn registering_a_member_provisions_a_customer() {
    let app = app();
    app.stripe.set_next_customer_id("cus_new");

    let (status, body) = post_json(
        &app,
        "/members",
        json!({ "email": "ana@example.com", "name": "Ana" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stripe_customer_id"], "cus_new");
    assert_eq!(body["is_subscribed"], false);

    let (status, fetched) = get(&app, &format!("/members/{}", body["id"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["stripe_customer_id"], "cus_new");
    assert_eq!(fetched["email"], "ana@example.com");
}

#[tokio::test]
async fn registering_with_blank_email_is_rejected() {
    let app = app();
    let (status, _) = post_json(&app, "/members", json!({ "email": " ", "name": "Ana" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.members.is_empty().await);
    assert!(!app.stripe.was_called("create_customer"));
}

#[tokio::test]
async fn unknown_member_is_404() {
    let app = app();
    let (status, body) = get(&app, &format!("/members/{}", uuid::Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Member not found" }));
}

#[tokio::test]
async fn malformed_member_id_is_400() {
    let app = app();
    let (status, _) = get(&app, "/members/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Webhook Endpoint
// =============================================================================

#[tokio::test]
async fn invoice_paid_subscribes_member_and_sets_program() {
    let app = app();
    let member = seed_member(&app, "cus_1", false).await;
    app.stripe.add_product(Product {
        id: "prod_karate".to_string(),
        name: "Karate".to_string(),
    });

    let (status, _) = post_webhook(&app, &event("invoice.paid", paid_invoice("cus_1")), None).await;

    assert_eq!(status, StatusCode::OK);
    let stored = app.members.find_by_id(&member.id).await.unwrap().unwrap();
    assert!(stored.is_subscribed);
    assert_eq!(stored.program.as_deref(), Some("Karate"));
}

#[tokio::test]
async fn subscription_deleted_unsubscribes_member() {
    let app = app();
    let member = seed_member(&app, "cus_1", true).await;
    let payload = event(
        "customer.subscription.deleted",
        json!({ "id": "sub_1", "customer": "cus_1" }),
    );

    let (status, _) = post_webhook(&app, &payload, None).await;

    assert_eq!(status, StatusCode::OK);
    let stored = app.members.find_by_id(&member.id).await.unwrap().unwrap();
    assert!(!stored.is_subscribed);
}

#[tokio::test]
async fn unhandled_event_is_acknowledged_without_writes() {
    let app = app();
    seed_member(&app, "cus_1", false).await;

    let (status, body) =
        post_webhook(&app, &event("charge.refunded", json!({ "id": "ch_1" })), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Unhandled event type");
    assert_eq!(app.members.write_count(), 0);
}

#[tokio::test]
async fn webhook_for_unknown_customer_is_500() {
    let app = app();
    let payload = event(
        "customer.subscription.deleted",
        json!({ "id": "sub_1", "customer": "cus_missing" }),
    );

    let (status, body) = post_webhook(&app, &payload, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(parse(&body)["error"].is_string());
    assert_eq!(app.members.write_count(), 0);
}

#[tokio::test]
async fn undecodable_webhook_object_is_400() {
    let app = app();
    let (status, _) =
        post_webhook(&app, &event("invoice.paid", json!({ "customer": [1, 2] })), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_webhook(&app, b"not json at all", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_webhook_is_accepted() {
    let app = signed_app();
    let member = seed_member(&app, "cus_1", true).await;
    let payload = event(
        "customer.subscription.deleted",
        json!({ "id": "sub_1", "customer": "cus_1" }),
    );
    let signature = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), &payload).unwrap();

    let (status, _) = post_webhook(&app, &payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    let stored = app.members.find_by_id(&member.id).await.unwrap().unwrap();
    assert!(!stored.is_subscribed);
}

#[tokio::test]
async fn forged_or_unsigned_webhook_is_401_without_dispatch() {
    let app = signed_app();
    seed_member(&app, "cus_1", true).await;
    let payload = event(
        "customer.subscription.deleted",
        json!({ "id": "sub_1", "customer": "cus_1" }),
    );
    let forged = signature_header("whsec_other", Utc::now().timestamp(), &payload).unwrap();

    let (status, _) = post_webhook(&app, &payload, Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_webhook(&app, &payload, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.members.write_count(), 0);
}

#[tokio::test]
async fn stale_signature_is_401() {
    let app = signed_app();
    let payload = event("charge.refunded", json!({ "id": "ch_1" }));
    let stale = signature_header(WEBHOOK_SECRET, Utc::now().timestamp() - 3_600, &payload).unwrap();

    let (status, _) = post_webhook(&app, &payload, Some(&stale)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn out_of_range_or_non_numeric_timestamp_is_401_without_dispatch() {
    let app = signed_app();
    seed_member(&app, "cus_1", true).await;
    let payload = event(
        "customer.subscription.deleted",
        json!({ "id": "sub_1", "customer": "cus_1" }),
    );

    for signature in [
        format!("t={},v1=00", i64::MIN),
        format!("t={},v1=00", i64::MAX),
        "t=9223372036854775808,v1=00".to_string(),
        "t=yesterday,v1=00".to_string(),
    ] {
        let (status, body) = post_webhook(&app, &payload, Some(&signature)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "signature: {signature}");
        assert!(parse(&body)["error"].is_string());
    }

    assert_eq!(app.members.write_count(), 0);
    assert!(app.stripe.calls().is_empty());
}

#[tokio::test]
async fn unreadable_stored_member_is_400_on_webhook() {
    let app = app();
    seed_member(&app, "cus_1", false).await;
    app.members
        .fail_reads_with(Some(DomainError::invalid_record(
            "email",
            "invalid stored member: must not be blank",
        )))
        .await;

    let (status, body) =
        post_webhook(&app, &event("invoice.paid", paid_invoice("cus_1")), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        parse(&body)["error"],
        "email: invalid stored member: must not be blank"
    );
    assert_eq!(app.members.write_count(), 0);
}
