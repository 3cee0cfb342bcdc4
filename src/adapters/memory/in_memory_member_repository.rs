//! In-memory member store.
//!
//! Backs the service when no database is configured, and serves as the
//! record-store double in tests (write counting and failure injection).

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, MemberId};
use crate::domain::member::Member;
use crate::ports::MemberRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryMemberRepository {
    /// Members in insertion order; lookups take the first match.
    members: Arc<RwLock<Vec<Member>>>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
    read_error: Arc<RwLock<Option<DomainError>>>,
}

impl InMemoryMemberRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a member directly, bypassing write counting.
    pub async fn seed(&self, member: Member) {
        self.members.write().await.push(member);
    }

    /// Makes every subsequent `create`/`update` fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent lookup return `err`, as a store does when a
    /// row cannot be read back into a `Member`. `None` clears it.
    pub async fn fail_reads_with(&self, err: Option<DomainError>) {
        *self.read_error.write().await = err;
    }

    /// Number of successful `create`/`update` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("record store unavailable"));
        }
        Ok(())
    }

    async fn check_readable(&self) -> Result<(), DomainError> {
        match self.read_error.read().await.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn create(&self, member: &Member) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut members = self.members.write().await;

        if let Some(customer_ref) = &member.customer_ref {
            if members
                .iter()
                .any(|m| m.customer_ref.as_ref() == Some(customer_ref))
            {
                return Err(DomainError::new(
                    ErrorCode::DuplicateCustomerRef,
                    "Customer reference already linked to another member",
                ));
            }
        }

        members.push(member.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, member: &Member) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut members = self.members.write().await;

        if let Some(customer_ref) = &member.customer_ref {
            if members
                .iter()
                .any(|m| m.id != member.id && m.customer_ref.as_ref() == Some(customer_ref))
            {
                return Err(DomainError::new(
                    ErrorCode::DuplicateCustomerRef,
                    "Customer reference already linked to another member",
                ));
            }
        }

        let slot = members
            .iter_mut()
            .find(|m| m.id == member.id)
            .ok_or_else(|| DomainError::new(ErrorCode::MemberNotFound, "Member not found"))?;
        *slot = member.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_by_id(&self, id: &MemberId) -> Result<Option<Member>, DomainError> {
        self.check_readable().await?;
        Ok(self.members.read().await.iter().find(|m| m.id == *id).cloned())
    }

    async fn find_by_customer_ref(
        &self,
        customer_ref: &str,
    ) -> Result<Option<Member>, DomainError> {
        self.check_readable().await?;
        Ok(self
            .members
            .read()
            .await
            .iter()
            .find(|m| m.customer_ref.as_deref() == Some(customer_ref))
            .cloned())
    }
}
