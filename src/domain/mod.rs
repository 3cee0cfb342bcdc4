//! Domain layer - pure billing types with no I/O.
//!
//! - `foundation` - Identifiers and shared error types
//! - `member` - Member record, webhook events, billing errors
//! - `revenue` - Revenue window and monthly aggregation

pub mod foundation;
pub mod member;
pub mod revenue;
