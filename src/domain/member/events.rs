//! Inbound payment-platform webhook events.
//!
//! A webhook body is decoded into a `WebhookEnvelope`, then narrowed into the
//! closed `BillingEvent` enum. Only the fields the reconciler reads are
//! captured; everything else in Stripe's schema is ignored.

use serde::{Deserialize, Serialize};

use super::BillingError;

pub const INVOICE_PAID: &str = "invoice.paid";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Stripe event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEnvelope {
    /// Event id (`evt_...`).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp of event creation.
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub livemode: bool,

    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookData {
    /// The object the event is about; its shape depends on `type`.
    pub object: serde_json::Value,
}

impl WebhookEnvelope {
    /// Decodes an envelope from a raw request body.
    pub fn from_slice(payload: &[u8]) -> Result<Self, BillingError> {
        serde_json::from_slice(payload).map_err(|e| BillingError::decode(e.to_string()))
    }

    fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, BillingError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| {
            BillingError::decode(format!("{} object: {}", self.event_type, e))
        })
    }
}

/// Reference to another Stripe object: either its bare id or the expanded
/// object, which always carries an `id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Id(String),
    Expanded { id: String },
}

impl ObjectRef {
    pub fn id(&self) -> &str {
        match self {
            ObjectRef::Id(id) => id,
            ObjectRef::Expanded { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InvoiceObject {
    #[serde(default)]
    pub id: Option<String>,

    pub customer: ObjectRef,

    /// `None` for one-off invoices that are not tied to a subscription.
    #[serde(default)]
    pub subscription: Option<ObjectRef>,

    #[serde(default)]
    pub lines: InvoiceLines,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct InvoiceLines {
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InvoiceLine {
    #[serde(default)]
    pub price: Option<LinePrice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinePrice {
    #[serde(default)]
    pub product: Option<ObjectRef>,
}

impl InvoiceObject {
    pub fn customer_id(&self) -> &str {
        self.customer.id()
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    /// Product id of the first line item, if it carries one.
    pub fn first_product_id(&self) -> Option<&str> {
        self.lines
            .data
            .first()
            .and_then(|line| line.price.as_ref())
            .and_then(|price| price.product.as_ref())
            .map(ObjectRef::id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: ObjectRef,
}

impl SubscriptionObject {
    pub fn customer_id(&self) -> &str {
        self.customer.id()
    }
}

/// Billing events the reconciler distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    InvoicePaid(InvoiceObject),
    InvoicePaymentFailed(InvoiceObject),
    SubscriptionDeleted(SubscriptionObject),
    Unhandled { event_type: String },
}

impl BillingEvent {
    /// Narrows an envelope into a typed event.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Decode` when the object of a handled event type
    /// does not match its expected shape. Unknown types never fail.
    pub fn from_envelope(envelope: &WebhookEnvelope) -> Result<Self, BillingError> {
        match envelope.event_type.as_str() {
            INVOICE_PAID => Ok(BillingEvent::InvoicePaid(envelope.object()?)),
            INVOICE_PAYMENT_FAILED => Ok(BillingEvent::InvoicePaymentFailed(envelope.object()?)),
            SUBSCRIPTION_DELETED => Ok(BillingEvent::SubscriptionDeleted(envelope.object()?)),
            other => Ok(BillingEvent::Unhandled {
                event_type: other.to_string(),
            }),
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::InvoicePaid(_) => INVOICE_PAID,
            BillingEvent::InvoicePaymentFailed(_) => INVOICE_PAYMENT_FAILED,
            BillingEvent::SubscriptionDeleted(_) => SUBSCRIPTION_DELETED,
            BillingEvent::Unhandled { event_type } => event_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, object: serde_json::Value) -> WebhookEnvelope {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_700_000_000,
            "livemode": false,
            "data": { "object": object }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_invoice_paid_with_string_refs() {
        let env = envelope(
            "invoice.paid",
            json!({
                "id": "in_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "lines": { "data": [ { "price": { "product": "prod_1" } } ] }
            }),
        );

        let event = BillingEvent::from_envelope(&env).unwrap();

        let BillingEvent::InvoicePaid(invoice) = event else {
            panic!("expected InvoicePaid");
        };
        assert_eq!(invoice.customer_id(), "cus_1");
        assert!(invoice.has_subscription());
        assert_eq!(invoice.first_product_id(), Some("prod_1"));
    }

    #[test]
    fn decodes_expanded_references() {
        let env = envelope(
            "invoice.payment_failed",
            json!({
                "customer": { "id": "cus_2", "email": "a@b.c" },
                "subscription": { "id": "sub_2", "status": "past_due" },
                "lines": { "data": [ { "price": { "product": { "id": "prod_2", "name": "Judo" } } } ] }
            }),
        );

        let BillingEvent::InvoicePaymentFailed(invoice) = BillingEvent::from_envelope(&env).unwrap()
        else {
            panic!("expected InvoicePaymentFailed");
        };
        assert_eq!(invoice.customer_id(), "cus_2");
        assert_eq!(invoice.first_product_id(), Some("prod_2"));
    }

    #[test]
    fn null_subscription_decodes_as_none() {
        let env = envelope("invoice.paid", json!({ "customer": "cus_1", "subscription": null }));

        let BillingEvent::InvoicePaid(invoice) = BillingEvent::from_envelope(&env).unwrap() else {
            panic!("expected InvoicePaid");
        };
        assert!(!invoice.has_subscription());
        assert_eq!(invoice.first_product_id(), None);
    }

    #[test]
    fn decodes_subscription_deleted() {
        let env = envelope(
            "customer.subscription.deleted",
            json!({ "id": "sub_9", "customer": "cus_9", "status": "canceled" }),
        );

        let event = BillingEvent::from_envelope(&env).unwrap();

        assert_eq!(event.event_type(), "customer.subscription.deleted");
        let BillingEvent::SubscriptionDeleted(sub) = event else {
            panic!("expected SubscriptionDeleted");
        };
        assert_eq!(sub.customer_id(), "cus_9");
    }

    #[test]
    fn unknown_type_is_unhandled() {
        let env = envelope("charge.refunded", json!({ "anything": true }));

        let event = BillingEvent::from_envelope(&env).unwrap();

        assert_eq!(
            event,
            BillingEvent::Unhandled {
                event_type: "charge.refunded".to_string()
            }
        );
    }

    #[test]
    fn malformed_handled_object_is_decode_error() {
        let env = envelope("invoice.paid", json!({ "customer": 42 }));

        let result = BillingEvent::from_envelope(&env);

        assert!(matches!(result, Err(BillingError::Decode(_))));
    }

    #[test]
    fn malformed_envelope_is_decode_error() {
        let result = WebhookEnvelope::from_slice(b"{not json");
        assert!(matches!(result, Err(BillingError::Decode(_))));
    }
}
