//! Member repository port.
//!
//! The record store the billing flow reads and writes. Implementations must
//! keep `customer_ref` unique among members that have one.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MemberId};
use crate::domain::member::Member;

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Insert a new member.
    ///
    /// # Errors
    ///
    /// - `DuplicateCustomerRef` if another member holds the same customer ref
    /// - `DatabaseError` on persistence failure
    async fn create(&self, member: &Member) -> Result<(), DomainError>;

    /// Overwrite an existing member.
    ///
    /// # Errors
    ///
    /// - `MemberNotFound` if the member doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, member: &Member) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &MemberId) -> Result<Option<Member>, DomainError>;

    /// First member whose customer ref equals `customer_ref`.
    async fn find_by_customer_ref(&self, customer_ref: &str)
        -> Result<Option<Member>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn MemberRepository) {}
    }
}
