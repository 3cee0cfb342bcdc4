//! Member Billing - Stripe billing for member records
//!
//! Provisions a Stripe customer for every member, brokers checkout, portal
//! and payment-intent sessions for the storefront, reconciles subscription
//! state from Stripe webhooks and reports monthly revenue.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
