//! HandlePaymentWebhookHandler - Reconciles member subscription state from
//! payment-platform webhooks.
//!
//! | Event | Action |
//! |-------|--------|
//! | `invoice.paid` | subscribed, program from the first line's product |
//! | `invoice.payment_failed` | unsubscribed |
//! | `customer.subscription.deleted` | unsubscribed |
//! | anything else | acknowledged, no mutation |
//!
//! Invoices without a subscription are skipped. Every transition is a plain
//! assignment, so redelivering an event leaves the same final state.

use std::sync::Arc;

use crate::domain::foundation::MemberId;
use crate::domain::member::{
    BillingError, BillingEvent, InvoiceObject, Member, StripeWebhookVerifier,
    SubscriptionObject, WebhookEnvelope,
};
use crate::ports::{MemberRepository, PaymentProvider};

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header, if present.
    pub signature: Option<String>,
}

/// What the reconciler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Subscribed {
        member_id: MemberId,
        program: Option<String>,
    },
    Unsubscribed {
        member_id: MemberId,
    },
    /// Handled type, but nothing to change (e.g. invoice without subscription).
    Skipped { reason: String },
    Unhandled { event_type: String },
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlePaymentWebhookResult {
    pub event_id: String,
    pub event_type: String,
    pub outcome: WebhookOutcome,
}

pub struct HandlePaymentWebhookHandler {
    repository: Arc<dyn MemberRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
    /// `None` when signature verification is disabled.
    verifier: Option<StripeWebhookVerifier>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        repository: Arc<dyn MemberRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        verifier: Option<StripeWebhookVerifier>,
    ) -> Self {
        Self {
            repository,
            payment_provider,
            verifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, BillingError> {
        // 1. Verify signature
        if let Some(verifier) = &self.verifier {
            let signature = cmd
                .signature
                .as_deref()
                .ok_or_else(|| BillingError::invalid_signature("missing Stripe-Signature header"))?;
            verifier.verify(&cmd.payload, signature)?;
        }

        // 2. Decode
        let envelope = WebhookEnvelope::from_slice(&cmd.payload)?;
        let event = BillingEvent::from_envelope(&envelope)?;

        tracing::info!(
            event_id = %envelope.id,
            event_type = %envelope.event_type,
            livemode = envelope.livemode,
            "Processing payment webhook"
        );

        // 3. Reconcile
        let outcome = self.reconcile(event).await?;

        Ok(HandlePaymentWebhookResult {
            event_id: envelope.id,
            event_type: envelope.event_type,
            outcome,
        })
    }

    /// Applies a decoded event to the matching member.
    pub async fn reconcile(&self, event: BillingEvent) -> Result<WebhookOutcome, BillingError> {
        tracing::debug!(event_type = event.event_type(), "Reconciling event");

        match event {
            BillingEvent::InvoicePaid(invoice) => self.handle_invoice_paid(&invoice).await,
            BillingEvent::InvoicePaymentFailed(invoice) => {
                self.handle_invoice_payment_failed(&invoice).await
            }
            BillingEvent::SubscriptionDeleted(subscription) => {
                self.handle_subscription_deleted(&subscription).await
            }
            BillingEvent::Unhandled { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled event type");
                Ok(WebhookOutcome::Unhandled { event_type })
            }
        }
    }

    async fn handle_invoice_paid(
        &self,
        invoice: &InvoiceObject,
    ) -> Result<WebhookOutcome, BillingError> {
        if !invoice.has_subscription() {
            return Ok(skipped_without_subscription(invoice));
        }

        let mut member = self.find_member(invoice.customer_id()).await?;

        let program = match invoice.first_product_id() {
            Some(product_id) => {
                let product = self.payment_provider.get_product(product_id).await.map_err(|e| {
                    tracing::error!(
                        product_id = product_id,
                        error = %e,
                        "Failed to fetch product for paid invoice"
                    );
                    BillingError::upstream(format!("error finding product {}: {}", product_id, e.message))
                })?;
                Some(product.name)
            }
            None => None,
        };

        member.mark_subscribed(program.clone());
        self.repository.update(&member).await?;

        tracing::info!(
            member_id = %member.id,
            customer_ref = invoice.customer_id(),
            program = ?program,
            "Member subscribed"
        );

        Ok(WebhookOutcome::Subscribed {
            member_id: member.id,
            program,
        })
    }

    async fn handle_invoice_payment_failed(
        &self,
        invoice: &InvoiceObject,
    ) -> Result<WebhookOutcome, BillingError> {
        if !invoice.has_subscription() {
            return Ok(skipped_without_subscription(invoice));
        }

        let member = self.find_member(invoice.customer_id()).await?;
        self.unsubscribe(member, invoice.customer_id()).await
    }

    async fn handle_subscription_deleted(
        &self,
        subscription: &SubscriptionObject,
    ) -> Result<WebhookOutcome, BillingError> {
        let member = self.find_member(subscription.customer_id()).await?;
        self.unsubscribe(member, subscription.customer_id()).await
    }

    async fn unsubscribe(
        &self,
        mut member: Member,
        customer_ref: &str,
    ) -> Result<WebhookOutcome, BillingError> {
        member.mark_unsubscribed();
        self.repository.update(&member).await?;

        tracing::info!(
            member_id = %member.id,
            customer_ref = customer_ref,
            "Member unsubscribed"
        );

        Ok(WebhookOutcome::Unsubscribed {
            member_id: member.id,
        })
    }

    async fn find_member(&self, customer_ref: &str) -> Result<Member, BillingError> {
        self.repository
            .find_by_customer_ref(customer_ref)
            .await?
            .ok_or_else(|| {
                tracing::error!(customer_ref = customer_ref, "No member for webhook customer");
                BillingError::not_found(format!("No member found for customer {}", customer_ref))
            })
    }
}

fn skipped_without_subscription(invoice: &InvoiceObject) -> WebhookOutcome {
    tracing::debug!(
        invoice_id = ?invoice.id,
        customer_ref = invoice.customer_id(),
        "Invoice has no subscription, skipping"
    );
    WebhookOutcome::Skipped {
        reason: "invoice has no subscription".to_string(),
    }
}
