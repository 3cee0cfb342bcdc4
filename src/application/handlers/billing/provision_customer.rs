//! ProvisionCustomerHandler - Links a member to a new payment-platform
//! customer.
//!
//! Runs after a member record is created. If the remote customer is created
//! but the local save fails, the remote customer is left orphaned; the error
//! log names it so it can be cleaned up by hand.

use std::sync::Arc;

use crate::domain::member::{BillingError, Member};
use crate::ports::{CreateCustomerRequest, MemberRepository, PaymentProvider};

#[derive(Debug, Clone)]
pub struct ProvisionCustomerCommand {
    pub member: Member,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionCustomerResult {
    pub member: Member,
    /// False when the member already had a customer reference.
    pub created: bool,
}

pub struct ProvisionCustomerHandler {
    repository: Arc<dyn MemberRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl ProvisionCustomerHandler {
    pub fn new(
        repository: Arc<dyn MemberRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            repository,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProvisionCustomerCommand,
    ) -> Result<ProvisionCustomerResult, BillingError> {
        let mut member = cmd.member;

        if member.has_customer_ref() {
            return Ok(ProvisionCustomerResult {
                member,
                created: false,
            });
        }

        let customer = self
            .payment_provider
            .create_customer(CreateCustomerRequest {
                member_id: member.id,
                email: member.email.clone(),
                name: member.name.clone(),
            })
            .await
            .map_err(|e| {
                tracing::error!(member_id = %member.id, error = %e, "Failed to create payment customer");
                BillingError::from(e)
            })?;

        member.assign_customer_ref(customer.id.clone())?;

        if let Err(e) = self.repository.update(&member).await {
            tracing::error!(
                member_id = %member.id,
                customer_ref = %customer.id,
                error = %e,
                "Customer created but member save failed; remote customer is orphaned"
            );
            return Err(e.into());
        }

        tracing::info!(
            member_id = %member.id,
            customer_ref = %customer.id,
            "Payment customer provisioned"
        );

        Ok(ProvisionCustomerResult {
            member,
            created: true,
        })
    }
}
