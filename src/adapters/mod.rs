//! Adapters - Implementations of port interfaces.
//!
//! - `http` - Axum routes and handlers
//! - `memory` - In-memory member store for development and tests
//! - `postgres` - PostgreSQL member store
//! - `stripe` - Stripe REST client and a scriptable mock provider

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
