//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresMemberRepository` - Member records in the `members` table

mod member_repository;

pub use member_repository::PostgresMemberRepository;
