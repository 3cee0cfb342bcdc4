//! Member Billing server
//!
//! ## Endpoints
//!
//! - `GET /publishable-key`
//! - `POST /checkout-session`, `/customer-portal`, `/cancel-subscription`
//! - `POST /client-secret`, `/create-payment-intent`, `/revenue-data`
//! - `POST /members`, `GET /members/:id`
//! - `POST /webhook` - Stripe webhook receiver
//! - `GET /health` - Liveness probe

use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use member_billing::adapters::http::{billing_router, BillingAppState, BillingSettings};
use member_billing::adapters::memory::InMemoryMemberRepository;
use member_billing::adapters::postgres::PostgresMemberRepository;
use member_billing::adapters::stripe::StripePaymentAdapter;
use member_billing::config::{AppConfig, DatabaseConfig, ServerConfig};
use member_billing::ports::{MemberRepository, PaymentProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.server);
    config.validate().context("invalid configuration")?;

    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "Starting member billing"
    );

    if !config.payment.verify_signatures {
        tracing::warn!(
            "Webhook signature verification is DISABLED; any caller can forge Stripe events"
        );
    }

    let member_repository = member_repository(config.database.as_ref()).await?;
    let payment_provider: Arc<dyn PaymentProvider> =
        Arc::new(StripePaymentAdapter::new(config.payment.stripe_config()));

    let settings = BillingSettings {
        publishable_key: config.payment.stripe_publishable_key.clone(),
        checkout_success_url: config.payment.checkout_success_url.clone(),
        checkout_cancel_url: config.payment.checkout_cancel_url.clone(),
        portal_return_url: config.payment.portal_return_url.clone(),
        portal_redirect: config.payment.portal_redirect,
        plan_prices: config.payment.plan_price_table()?,
        webhook_verifier: config.payment.webhook_verifier(),
    };

    let state = BillingAppState::new(member_repository, payment_provider, settings);
    let app = build_router(state, &config.server)?;

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn member_repository(
    database: Option<&DatabaseConfig>,
) -> anyhow::Result<Arc<dyn MemberRepository>> {
    let Some(database) = database else {
        tracing::warn!("No database configured; member records are kept in memory only");
        return Ok(Arc::new(InMemoryMemberRepository::new()));
    };

    let pool = database
        .pool_options()
        .connect(&database.url)
        .await
        .context("failed to connect to PostgreSQL")?;
    tracing::info!(max_connections = database.max_connections, "Database pool created");

    if database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        tracing::info!("Migrations applied");
    }

    Ok(Arc::new(PostgresMemberRepository::new(pool)))
}

fn build_router(state: BillingAppState, server: &ServerConfig) -> anyhow::Result<Router> {
    let origins = server.cors_origins_list();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let values = origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid CORS origin")?;
        AllowOrigin::list(values)
    };

    let router = billing_router()
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state);

    Ok(router)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
