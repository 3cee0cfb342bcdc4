//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing logic and the outside world. Adapters implement these ports.
//!
//! - `MemberRepository` - Record store for member rows
//! - `PaymentProvider` - Payment platform operations

mod member_repository;
mod payment_provider;

pub use member_repository::MemberRepository;
pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, CreatePaymentIntentRequest,
    Customer, CustomerSession, PaymentError, PaymentErrorCode, PaymentIntent, PaymentProvider,
    PortalSession, Price, Product, Subscription,
};
