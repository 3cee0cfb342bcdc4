//! Monthly revenue report.
//!
//! Sums succeeded payments over a window that starts at midnight UTC on the
//! first day of a past month and ends now, grouped by year then month name.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::member::BillingError;

/// Status string Stripe uses for a captured payment intent.
pub const SUCCEEDED: &str = "succeeded";

/// A payment intent as the revenue report sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub id: String,
    /// Amount in the currency's minor unit.
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created: DateTime<Utc>,
}

impl PaymentSummary {
    pub fn is_succeeded(&self) -> bool {
        self.status == SUCCEEDED
    }
}

/// Inclusive creation-time window for payment listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RevenueWindow {
    /// Window from the first day of the month `months_ago` months before
    /// `now` through `now`. `months_ago == 0` is the current month to date.
    pub fn months_back(months_ago: u32, now: DateTime<Utc>) -> Result<Self, BillingError> {
        let first_of_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .ok_or_else(|| BillingError::validation("monthsAgo", "invalid current date"))?;
        let start_date = first_of_month
            .checked_sub_months(Months::new(months_ago))
            .ok_or_else(|| BillingError::validation("monthsAgo", "out of range"))?;
        let start = start_date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| BillingError::validation("monthsAgo", "out of range"))?;

        Ok(Self { start, end: now })
    }
}

/// Year → English month name → total minor units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevenueReport(BTreeMap<String, BTreeMap<String, i64>>);

impl RevenueReport {
    /// Builds the report from listed payments. Only succeeded payments count.
    pub fn aggregate<'a>(payments: impl IntoIterator<Item = &'a PaymentSummary>) -> Self {
        let mut totals: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();

        for payment in payments.into_iter().filter(|p| p.is_succeeded()) {
            let year = payment.created.format("%Y").to_string();
            let month = payment.created.format("%B").to_string();
            *totals.entry(year).or_default().entry(month).or_insert(0) += payment.amount;
        }

        Self(totals)
    }

    #[cfg(test)]
    pub fn total_for(&self, year: &str, month: &str) -> i64 {
        self.0
            .get(year)
            .and_then(|months| months.get(month))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, BTreeMap<String, i64>> {
        self.0
    }
}
