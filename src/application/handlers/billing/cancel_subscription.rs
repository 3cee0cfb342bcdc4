//! CancelSubscriptionHandler - Cancels the first subscription listed for a
//! customer.

use std::sync::Arc;

use crate::domain::member::BillingError;
use crate::ports::PaymentProvider;

pub const NO_SUBSCRIPTION_MESSAGE: &str = "No subscription found for the customer";
pub const CANCEL_FAILED_MESSAGE: &str = "Failed to cancel subscription";

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub customer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSubscriptionResult {
    pub subscription_id: String,
}

pub struct CancelSubscriptionHandler {
    payment_provider: Arc<dyn PaymentProvider>,
}

impl CancelSubscriptionHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self { payment_provider }
    }

    /// # Errors
    ///
    /// - `NotFound` when the customer has no subscriptions
    /// - `Upstream` when listing or cancelling fails
    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        let subscriptions = self
            .payment_provider
            .list_subscriptions(&cmd.customer_id)
            .await
            .map_err(|e| {
                tracing::error!(customer_ref = %cmd.customer_id, error = %e, "Failed to list subscriptions");
                BillingError::upstream(CANCEL_FAILED_MESSAGE)
            })?;

        let first = subscriptions
            .into_iter()
            .next()
            .ok_or_else(|| BillingError::not_found(NO_SUBSCRIPTION_MESSAGE))?;

        self.payment_provider
            .cancel_subscription(&first.id)
            .await
            .map_err(|e| {
                tracing::error!(
                    customer_ref = %cmd.customer_id,
                    subscription_id = %first.id,
                    error = %e,
                    "Failed to cancel subscription"
                );
                BillingError::upstream(CANCEL_FAILED_MESSAGE)
            })?;

        tracing::info!(
            customer_ref = %cmd.customer_id,
            subscription_id = %first.id,
            "Subscription cancelled"
        );

        Ok(CancelSubscriptionResult {
            subscription_id: first.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::ports::{PaymentError, Subscription};

    fn sub(id: &str) -> Subscription {
        Subscription {
            id: id.to_string(),
            customer_id: "cus_1".to_string(),
            status: "active".to_string(),
        }
    }

    fn cmd() -> CancelSubscriptionCommand {
        CancelSubscriptionCommand {
            customer_id: "cus_1".to_string(),
        }
    }

    #[tokio::test]
    async fn cancels_only_the_first_subscription() {
        let provider = MockPaymentProvider::new();
        provider.add_subscription(sub("sub_a"));
        provider.add_subscription(sub("sub_b"));
        let handler = CancelSubscriptionHandler::new(Arc::new(provider.clone()));

        let result = handler.handle(cmd()).await.unwrap();

        assert_eq!(result.subscription_id, "sub_a");
        assert_eq!(provider.call_count("cancel_subscription"), 1);
        assert_eq!(provider.subscriptions_for("cus_1"), vec![sub("sub_b")]);
    }

    #[tokio::test]
    async fn no_subscription_is_not_found_with_exact_message() {
        let provider = MockPaymentProvider::new();
        let handler = CancelSubscriptionHandler::new(Arc::new(provider.clone()));

        let result = handler.handle(cmd()).await;

        assert_eq!(result, Err(BillingError::NotFound(NO_SUBSCRIPTION_MESSAGE.to_string())));
        assert!(!provider.was_called("cancel_subscription"));
    }

    #[tokio::test]
    async fn provider_failure_on_cancel_is_upstream() {
        let provider = MockPaymentProvider::new();
        provider.add_subscription(sub("sub_a"));
        provider.set_method_error("cancel_subscription", PaymentError::provider("nope"));
        let handler = CancelSubscriptionHandler::new(Arc::new(provider));

        let result = handler.handle(cmd()).await;

        assert_eq!(result, Err(BillingError::Upstream(CANCEL_FAILED_MESSAGE.to_string())));
    }

    #[tokio::test]
    async fn provider_failure_on_list_is_upstream() {
        let provider = MockPaymentProvider::new();
        provider.set_method_error("list_subscriptions", PaymentError::network("down"));
        let handler = CancelSubscriptionHandler::new(Arc::new(provider));

        let result = handler.handle(cmd()).await;

        assert!(matches!(result, Err(BillingError::Upstream(_))));
    }
}
