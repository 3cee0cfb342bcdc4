//! Payment configuration

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::stripe::{StripeConfig, DEFAULT_API_BASE_URL};
use crate::domain::member::StripeWebhookVerifier;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Secret API key (`sk_test_...` / `sk_live_...`).
    pub stripe_secret_key: SecretString,

    /// Publishable key handed to the browser (`pk_...`).
    pub stripe_publishable_key: String,

    /// Webhook signing secret (`whsec_...`).
    #[serde(default)]
    pub stripe_webhook_secret: Option<SecretString>,

    #[serde(default = "default_true")]
    pub verify_signatures: bool,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    pub portal_return_url: String,

    /// Answer `/customer-portal` with a 303 redirect.
    #[serde(default)]
    pub portal_redirect: bool,

    pub checkout_success_url: String,
    pub checkout_cancel_url: String,

    /// Comma-separated `plan=price_id` pairs.
    #[serde(default)]
    pub plan_prices: Option<String>,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_secret_key.expose_secret().starts_with("sk_test_")
    }

    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig::new(self.stripe_secret_key.clone()).with_base_url(&self.api_base_url)
    }

    /// Verifier for incoming webhooks; `None` when verification is switched off.
    pub fn webhook_verifier(&self) -> Option<StripeWebhookVerifier> {
        if !self.verify_signatures {
            return None;
        }
        self.stripe_webhook_secret
            .clone()
            .map(StripeWebhookVerifier::new)
    }

    /// Parses `plan_prices` into a plan key -> price id table.
    pub fn plan_price_table(&self) -> Result<HashMap<String, String>, ValidationError> {
        let Some(raw) = self.plan_prices.as_deref() else {
            return Ok(HashMap::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((plan, price)) if !plan.trim().is_empty() && !price.trim().is_empty() => {
                    Ok((plan.trim().to_string(), price.trim().to_string()))
                }
                _ => Err(ValidationError::InvalidPlanPrice(entry.to_string())),
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret_key = self.stripe_secret_key.expose_secret();
        if secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_SECRET_KEY"));
        }
        if !secret_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }

        if self.stripe_publishable_key.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_PUBLISHABLE_KEY",
            ));
        }
        if !self.stripe_publishable_key.starts_with("pk_") {
            return Err(ValidationError::InvalidPublishableKey);
        }

        match &self.stripe_webhook_secret {
            Some(secret) if !secret.expose_secret().starts_with("whsec_") => {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
            None if self.verify_signatures => {
                return Err(ValidationError::MissingRequired(
                    "PAYMENT__STRIPE_WEBHOOK_SECRET",
                ));
            }
            _ => {}
        }

        require_http_url("PAYMENT__API_BASE_URL", &self.api_base_url)?;
        require_http_url("PAYMENT__PORTAL_RETURN_URL", &self.portal_return_url)?;
        require_http_url("PAYMENT__CHECKOUT_SUCCESS_URL", &self.checkout_success_url)?;
        require_http_url("PAYMENT__CHECKOUT_CANCEL_URL", &self.checkout_cancel_url)?;

        self.plan_price_table()?;
        Ok(())
    }
}

fn require_http_url(key: &'static str, url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::MissingRequired(key));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ValidationError::InvalidUrl(key));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
