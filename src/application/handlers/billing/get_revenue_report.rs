//! GetRevenueReportHandler - Succeeded revenue per month since the start of
//! a past month.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::member::BillingError;
use crate::domain::revenue::{RevenueReport, RevenueWindow};
use crate::ports::PaymentProvider;

pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch payment intents";

#[derive(Debug, Clone)]
pub struct GetRevenueReportQuery {
    /// How many whole months before the current one the window starts.
    pub months_ago: i64,
}

pub struct GetRevenueReportHandler {
    payment_provider: Arc<dyn PaymentProvider>,
}

impl GetRevenueReportHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self { payment_provider }
    }

    pub async fn handle(&self, query: GetRevenueReportQuery) -> Result<RevenueReport, BillingError> {
        self.handle_at(query, Utc::now()).await
    }

    /// Same as `handle`, with an explicit current time.
    pub async fn handle_at(
        &self,
        query: GetRevenueReportQuery,
        now: DateTime<Utc>,
    ) -> Result<RevenueReport, BillingError> {
        let months_ago = u32::try_from(query.months_ago)
            .map_err(|_| BillingError::validation("monthsAgo", "must be a non-negative integer"))?;

        let window = RevenueWindow::months_back(months_ago, now)?;

        let payments = self
            .payment_provider
            .list_payment_intents(window)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error iterating payment intents");
                BillingError::upstream(FETCH_FAILED_MESSAGE)
            })?;

        Ok(RevenueReport::aggregate(&payments))
    }
}
