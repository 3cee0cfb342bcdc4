//! Mock payment provider for testing.
//!
//! Provides a configurable in-memory implementation of `PaymentProvider` for
//! unit and integration tests. Supports:
//! - Seeded subscriptions, prices, products and payment intents
//! - Per-method and one-shot error injection
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::revenue::{PaymentSummary, RevenueWindow};
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, CreatePaymentIntentRequest,
    Customer, CustomerSession, PaymentError, PaymentIntent, PaymentProvider, PortalSession, Price,
    Product, Subscription,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_product(Product { id: "prod_1".into(), name: "Judo".into() });
/// mock.set_method_error("get_product", PaymentError::network("down"));
/// assert_eq!(mock.call_count("get_product"), 0);
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    customers: HashMap<String, Customer>,

    /// Subscriptions per customer, in listing order.
    subscriptions: HashMap<String, Vec<Subscription>>,

    prices: HashMap<String, Price>,
    products: HashMap<String, Product>,
    payment_intents: Vec<PaymentSummary>,

    /// Customer id to hand out on the next `create_customer` call.
    next_customer_id: Option<String>,

    /// Error to return on next call (consumed).
    next_error: Option<PaymentError>,

    /// Errors returned by a specific method until cleared.
    method_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,
    sequence: u64,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Fix the id returned by the next `create_customer` call.
    pub fn set_next_customer_id(&self, id: impl Into<String>) {
        self.inner.lock().unwrap().next_customer_id = Some(id.into());
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .entry(subscription.customer_id.clone())
            .or_default()
            .push(subscription);
    }

    pub fn add_price(&self, price: Price) {
        let id = price.id.clone();
        self.inner.lock().unwrap().prices.insert(id, price);
    }

    pub fn add_product(&self, product: Product) {
        let id = product.id.clone();
        self.inner.lock().unwrap().products.insert(id, product);
    }

    pub fn add_payment_intent(&self, payment: PaymentSummary) {
        self.inner.lock().unwrap().payment_intents.push(payment);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.method_errors.clear();
    }

    /// Subscriptions currently held for a customer (canceled ones removed).
    pub fn subscriptions_for(&self, customer_id: &str) -> Vec<Subscription> {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .get(customer_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn customer(&self, customer_id: &str) -> Option<Customer> {
        self.inner.lock().unwrap().customers.get(customer_id).cloned()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.inner.lock().unwrap().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.inner.lock().unwrap();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.inner.lock().unwrap();
        state.sequence += 1;
        format!("{}_mock_{}", prefix, state.sequence)
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.record_call(
            "create_customer",
            vec![request.member_id.to_string(), request.email.clone()],
        );
        self.check_error("create_customer")?;

        let fixed_id = self.inner.lock().unwrap().next_customer_id.take();
        let id = match fixed_id {
            Some(id) => id,
            None => self.next_id("cus"),
        };

        let customer = Customer {
            id,
            email: Some(request.email),
            name: Some(request.name),
        };

        self.inner
            .lock()
            .unwrap()
            .customers
            .insert(customer.id.clone(), customer.clone());

        Ok(customer)
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.record_call(
            "create_checkout_session",
            vec![request.customer_id.clone(), request.price_id.clone()],
        );
        self.check_error("create_checkout_session")?;

        let id = self.next_id("cs");
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/{}", id),
            id,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        self.record_call(
            "create_portal_session",
            vec![customer_id.to_string(), return_url.to_string()],
        );
        self.check_error("create_portal_session")?;

        let id = self.next_id("bps");
        Ok(PortalSession {
            url: format!("https://billing.stripe.test/p/session/{}", id),
            id,
        })
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, PaymentError> {
        self.record_call("list_subscriptions", vec![customer_id.to_string()]);
        self.check_error("list_subscriptions")?;

        Ok(self.subscriptions_for(customer_id))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError> {
        self.record_call("cancel_subscription", vec![subscription_id.to_string()]);
        self.check_error("cancel_subscription")?;

        let mut state = self.inner.lock().unwrap();
        for subs in state.subscriptions.values_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == subscription_id) {
                let mut canceled = subs.remove(pos);
                canceled.status = "canceled".to_string();
                return Ok(canceled);
            }
        }

        Err(PaymentError::not_found("Subscription"))
    }

    async fn create_customer_session(
        &self,
        customer_id: &str,
    ) -> Result<CustomerSession, PaymentError> {
        self.record_call("create_customer_session", vec![customer_id.to_string()]);
        self.check_error("create_customer_session")?;

        Ok(CustomerSession {
            client_secret: format!("cuss_secret_{}", customer_id),
        })
    }

    async fn get_price(&self, price_id: &str) -> Result<Price, PaymentError> {
        self.record_call("get_price", vec![price_id.to_string()]);
        self.check_error("get_price")?;

        self.inner
            .lock()
            .unwrap()
            .prices
            .get(price_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Price"))
    }

    async fn get_product(&self, product_id: &str) -> Result<Product, PaymentError> {
        self.record_call("get_product", vec![product_id.to_string()]);
        self.check_error("get_product")?;

        self.inner
            .lock()
            .unwrap()
            .products
            .get(product_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Product"))
    }

    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        self.record_call(
            "create_payment_intent",
            vec![
                request.amount.to_string(),
                request.currency.clone(),
                request.plan.clone(),
            ],
        );
        self.check_error("create_payment_intent")?;

        let id = self.next_id("pi");
        Ok(PaymentIntent {
            client_secret: format!("{}_secret_test", id),
            id,
            amount: request.amount,
            currency: request.currency,
            status: "requires_payment_method".to_string(),
        })
    }

    async fn list_payment_intents(
        &self,
        window: RevenueWindow,
    ) -> Result<Vec<PaymentSummary>, PaymentError> {
        self.record_call(
            "list_payment_intents",
            vec![window.start.to_rfc3339(), window.end.to_rfc3339()],
        );
        self.check_error("list_payment_intents")?;

        Ok(self
            .inner
            .lock()
            .unwrap()
            .payment_intents
            .iter()
            .filter(|p| p.created >= window.start && p.created <= window.end)
            .cloned()
            .collect())
    }
}
