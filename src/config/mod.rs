//! Application configuration module
//!
//! Configuration is read from environment variables with the
//! `MEMBER_BILLING` prefix; nested values are separated by `__`.
//!
//! # Example
//!
//! ```no_run
//! use member_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MEMBER_BILLING";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Stripe keys, URLs and plan prices.
    pub payment: PaymentConfig,

    /// PostgreSQL; absent means the in-memory member store.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// Reads `.env` if present, then variables such as
    /// `MEMBER_BILLING__SERVER__PORT=8080` or
    /// `MEMBER_BILLING__PAYMENT__STRIPE_SECRET_KEY=sk_test_...`.
    ///
    /// # Errors
    ///
    /// `ConfigError` when a required value is missing or fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
    }

    fn from_environment(source: config::Environment) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Semantic validation of every section.
    ///
    /// # Errors
    ///
    /// The first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.payment.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
