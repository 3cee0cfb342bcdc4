//! Revenue reporting over listed payment intents.

mod report;

pub use report::{PaymentSummary, RevenueReport, RevenueWindow, SUCCEEDED};
