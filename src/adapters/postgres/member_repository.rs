//! PostgreSQL implementation of MemberRepository.
//!
//! Members live in the `members` table; the customer reference is stored in
//! `stripe_customer_id`, which carries a partial unique index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, MemberId};
use crate::domain::member::{BillingError, Member};
use crate::ports::MemberRepository;

const CUSTOMER_REF_UNIQUE_INDEX: &str = "members_stripe_customer_id_key";

const SELECT_COLUMNS: &str = r#"
    SELECT id, email, name, stripe_customer_id, is_subscribed, program, created_at, updated_at
    FROM members
"#;

pub struct PostgresMemberRepository {
    pool: PgPool,
}

impl PostgresMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a member.
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    email: Option<String>,
    name: Option<String>,
    stripe_customer_id: Option<String>,
    is_subscribed: bool,
    program: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for Member {
    type Error = DomainError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Member::reconstitute(
            MemberId::from_uuid(row.id),
            row.email,
            row.name,
            row.stripe_customer_id,
            row.is_subscribed,
            row.program,
            row.created_at,
            row.updated_at,
        )
        .map_err(|e| {
            let (field, message) = match e {
                BillingError::Validation { field, message } => (field, message),
                other => ("record".to_string(), other.to_string()),
            };
            DomainError::invalid_record(field, format!("invalid stored member: {}", message))
                .with_detail("member_id", row.id.to_string())
        })
    }
}

fn map_write_error(e: sqlx::Error, action: &str) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some(CUSTOMER_REF_UNIQUE_INDEX) {
            return DomainError::new(
                ErrorCode::DuplicateCustomerRef,
                "Customer reference already linked to another member",
            );
        }
    }
    DomainError::database(format!("Failed to {} member: {}", action, e))
}

#[async_trait]
impl MemberRepository for PostgresMemberRepository {
    async fn create(&self, member: &Member) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO members (
                id, email, name, stripe_customer_id, is_subscribed, program, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(&member.email)
        .bind(&member.name)
        .bind(&member.customer_ref)
        .bind(member.is_subscribed)
        .bind(&member.program)
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "create"))?;

        Ok(())
    }

    async fn update(&self, member: &Member) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE members SET
                email = $2,
                name = $3,
                stripe_customer_id = $4,
                is_subscribed = $5,
                program = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(&member.email)
        .bind(&member.name)
        .bind(&member.customer_ref)
        .bind(member.is_subscribed)
        .bind(&member.program)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "update"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::MemberNotFound, "Member not found"));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &MemberId) -> Result<Option<Member>, DomainError> {
        let row: Option<MemberRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find member: {}", e)))?;

        row.map(Member::try_from).transpose()
    }

    async fn find_by_customer_ref(
        &self,
        customer_ref: &str,
    ) -> Result<Option<Member>, DomainError> {
        let row: Option<MemberRow> = sqlx::query_as(&format!(
            "{} WHERE stripe_customer_id = $1 ORDER BY created_at ASC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(customer_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find member: {}", e)))?;

        row.map(Member::try_from).transpose()
    }
}
