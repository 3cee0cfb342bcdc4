//! RegisterMemberHandler - Creates a member record, then provisions its
//! payment customer as the post-create step.

use std::sync::Arc;

use crate::domain::member::{BillingError, Member};
use crate::ports::{MemberRepository, PaymentProvider};

use super::provision_customer::{ProvisionCustomerCommand, ProvisionCustomerHandler};

#[derive(Debug, Clone)]
pub struct RegisterMemberCommand {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMemberResult {
    pub member: Member,
}

pub struct RegisterMemberHandler {
    repository: Arc<dyn MemberRepository>,
    provisioner: ProvisionCustomerHandler,
}

impl RegisterMemberHandler {
    pub fn new(
        repository: Arc<dyn MemberRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            provisioner: ProvisionCustomerHandler::new(repository.clone(), payment_provider),
            repository,
        }
    }

    /// # Errors
    ///
    /// - `Validation` for a blank email or name
    /// - `Persistence` if the record cannot be created
    /// - any provisioning error; the record then stays without a customer ref
    pub async fn handle(&self, cmd: RegisterMemberCommand) -> Result<RegisterMemberResult, BillingError> {
        let member = Member::new(cmd.email, cmd.name)?;

        self.repository.create(&member).await?;
        tracing::info!(member_id = %member.id, "Member created");

        let provisioned = self
            .provisioner
            .handle(ProvisionCustomerCommand { member })
            .await?;

        Ok(RegisterMemberResult {
            member: provisioned.member,
        })
    }
}
