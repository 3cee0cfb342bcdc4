//! Billing error taxonomy.
//!
//! Every fallible operation in the billing flow resolves to one of these
//! variants. The HTTP layer maps them onto status codes:
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | Decode | 400 |
//! | InvalidSignature | 401 |
//! | NotFound | 404 (500 on the webhook route) |
//! | Upstream | 500 |
//! | Persistence | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::PaymentError;

/// Errors produced by billing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// A required field is missing, blank or malformed.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// The referenced record or remote object does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The payment platform rejected or failed the call.
    #[error("{0}")]
    Upstream(String),

    /// The record store failed to read or write.
    #[error("{0}")]
    Persistence(String),

    /// A webhook payload could not be decoded into its typed shape.
    #[error("failed to decode webhook payload: {0}")]
    Decode(String),

    /// The webhook signature did not verify.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        BillingError::NotFound(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        BillingError::Upstream(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        BillingError::Persistence(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        BillingError::Decode(message.into())
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        BillingError::InvalidSignature(message.into())
    }
}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        BillingError::Upstream(err.message)
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "record".to_string());
                BillingError::Validation {
                    field,
                    message: err.message,
                }
            }
            ErrorCode::MemberNotFound => BillingError::NotFound(err.message),
            ErrorCode::DuplicateCustomerRef | ErrorCode::DatabaseError => {
                BillingError::Persistence(err.message)
            }
        }
    }
}
