//! CreatePaymentIntentHandler - One-off charge for a configured plan.
//!
//! The plan key resolves to a price id through the configured plan table;
//! the price supplies amount and currency.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::member::BillingError;
use crate::ports::{CreatePaymentIntentRequest, PaymentProvider};

#[derive(Debug, Clone)]
pub struct CreatePaymentIntentCommand {
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePaymentIntentResult {
    pub payment_intent_id: String,
    pub client_secret: String,
}

pub struct CreatePaymentIntentHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    /// Plan key → price id.
    plan_prices: HashMap<String, String>,
}

impl CreatePaymentIntentHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>, plan_prices: HashMap<String, String>) -> Self {
        Self {
            payment_provider,
            plan_prices,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePaymentIntentCommand,
    ) -> Result<CreatePaymentIntentResult, BillingError> {
        let plan = cmd.plan.trim();
        if plan.is_empty() {
            return Err(BillingError::validation("plan", "must not be blank"));
        }

        let price_id = self
            .plan_prices
            .get(plan)
            .ok_or_else(|| BillingError::validation("plan", format!("unknown plan '{}'", plan)))?;

        let price = self.payment_provider.get_price(price_id).await?;
        let amount = price.unit_amount.ok_or_else(|| {
            BillingError::upstream(format!("price {} has no unit amount", price.id))
        })?;

        let intent = self
            .payment_provider
            .create_payment_intent(CreatePaymentIntentRequest {
                amount,
                currency: price.currency,
                plan: plan.to_string(),
            })
            .await?;

        tracing::info!(
            payment_intent_id = %intent.id,
            plan = plan,
            amount = amount,
            "Payment intent created"
        );

        Ok(CreatePaymentIntentResult {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::ports::Price;

    fn setup(unit_amount: Option<i64>) -> (MockPaymentProvider, CreatePaymentIntentHandler) {
        let provider = MockPaymentProvider::new();
        provider.add_price(Price {
            id: "price_bjj".to_string(),
            unit_amount,
            currency: "usd".to_string(),
            product: Some("prod_bjj".to_string()),
        });
        let plans = HashMap::from([("bjj".to_string(), "price_bjj".to_string())]);
        let handler = CreatePaymentIntentHandler::new(Arc::new(provider.clone()), plans);
        (provider, handler)
    }

    fn cmd(plan: &str) -> CreatePaymentIntentCommand {
        CreatePaymentIntentCommand {
            plan: plan.to_string(),
        }
    }

    #[tokio::test]
    async fn creates_intent_for_price_amount() {
        let (provider, handler) = setup(Some(12_000));

        let result = handler.handle(cmd("bjj")).await.unwrap();

        assert!(result.client_secret.starts_with(&result.payment_intent_id));
        let call = provider
            .calls()
            .into_iter()
            .find(|c| c.method == "create_payment_intent")
            .unwrap();
        assert_eq!(call.args, vec!["12000", "usd", "bjj"]);
    }

    #[tokio::test]
    async fn unknown_plan_is_validation_error() {
        let (provider, handler) = setup(Some(100));

        let result = handler.handle(cmd("fencing")).await;

        assert!(matches!(result, Err(BillingError::Validation { .. })));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_plan_is_validation_error() {
        let (_, handler) = setup(Some(100));
        assert!(matches!(handler.handle(cmd("  ")).await, Err(BillingError::Validation { .. })));
    }

    #[tokio::test]
    async fn price_without_amount_is_upstream_error() {
        let (provider, handler) = setup(None);

        let result = handler.handle(cmd("bjj")).await;

        assert!(matches!(result, Err(BillingError::Upstream(_))));
        assert!(!provider.was_called("create_payment_intent"));
    }
}
