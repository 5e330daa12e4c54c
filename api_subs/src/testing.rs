//! In-memory `StripeApi` for tests.
//!
//! Keeps customers, subscriptions, catalog and payment methods in a mutex
//! and counts every call per operation, so tests can assert how many
//! requests a service would have sent to Stripe.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use common::error::{AppError, Res};

use crate::{
    api::StripeApi,
    dtos::{
        catalog::{PriceFilters, ProductFilters},
        checkout::CreateCheckoutParams,
        customer::CreateCustomerParams,
        pay::{CreateSetupIntentParams, PaymentMethodFilters},
        sub::{CreateSubscriptionParams, SubscriptionFilters, UpdateSubscriptionParams},
    },
    models::{
        catalog::{Price, Product, Recurring},
        customer::{BillingPortalSession, CheckoutSession, Customer},
        pay::{Card, PaymentMethod, SetupIntent},
        sub::Subscription,
    },
};

const PERIOD_DAYS: i64 = 30;

#[derive(Default)]
struct MockState {
    next_id: u64,
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
    customers: HashMap<String, Customer>,
    subscriptions: Vec<Subscription>,
    prices: Vec<Price>,
    products: Vec<Product>,
    payment_methods: Vec<PaymentMethod>,
    checkouts: Vec<CreateCheckoutParams>,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_mock_{}", prefix, self.next_id)
    }

    fn subscription_mut(&mut self, id: &str) -> Res<&mut Subscription> {
        self.subscriptions
            .iter_mut()
            .find(|sub| sub.id == id)
            .ok_or_else(|| AppError::NotFound(format!("No such subscription: '{}'", id)))
    }

    fn customer_mut(&mut self, id: &str) -> Res<&mut Customer> {
        self.customers
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("No such customer: '{}'", id)))
    }
}

pub struct MockStripeApi {
    state: Mutex<MockState>,
    concurrency_limit: usize,
}

impl Default for MockStripeApi {
    fn default() -> Self {
        MockStripeApi {
            state: Mutex::new(MockState::default()),
            concurrency_limit: 4,
        }
    }
}

impl MockStripeApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn with_price(self, price: Price) -> Self {
        self.add_price(price);
        self
    }

    #[must_use]
    pub fn with_product(self, product: Product) -> Self {
        self.add_product(product);
        self
    }

    pub fn add_price(&self, price: Price) {
        self.state().prices.push(price);
    }

    pub fn add_product(&self, product: Product) {
        self.state().products.push(product);
    }

    pub fn add_customer(&self, customer: Customer) {
        self.state().customers.insert(customer.id.clone(), customer);
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        self.state().subscriptions.push(subscription);
    }

    pub fn add_payment_method(&self, payment_method: PaymentMethod) {
        self.state().payment_methods.push(payment_method);
    }

    /// Makes every later call of `operation` fail.
    pub fn fail_on(&self, operation: &'static str) {
        self.state().failing.insert(operation);
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }

    pub fn customer(&self, id: &str) -> Option<Customer> {
        self.state().customers.get(id).cloned()
    }

    pub fn subscription(&self, id: &str) -> Option<Subscription> {
        self.state()
            .subscriptions
            .iter()
            .find(|sub| sub.id == id)
            .cloned()
    }

    pub fn payment_method(&self, id: &str) -> Option<PaymentMethod> {
        self.state()
            .payment_methods
            .iter()
            .find(|pm| pm.id == id)
            .cloned()
    }

    pub fn last_checkout(&self) -> Option<CreateCheckoutParams> {
        self.state().checkouts.last().cloned()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn call(&self, operation: &'static str) -> Res<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        *state.calls.entry(operation).or_insert(0) += 1;
        if state.failing.contains(operation) {
            return Err(AppError::Internal(format!("{} failed", operation)));
        }
        Ok(state)
    }
}

impl StripeApi for MockStripeApi {
    fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    async fn create_customer(&self, params: &CreateCustomerParams) -> Res<Customer> {
        let mut state = self.call("create_customer")?;
        let customer = Customer {
            id: state.next_id("cus"),
            email: Some(params.email.clone()),
            name: params.name.clone(),
            default_payment_method: None,
        };
        state.customers.insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn retrieve_customer(&self, customer_id: &str) -> Res<Customer> {
        let mut state = self.call("retrieve_customer")?;
        state.customer_mut(customer_id).map(|customer| customer.clone())
    }

    async fn delete_customer(&self, customer_id: &str) -> Res<()> {
        let mut state = self.call("delete_customer")?;
        state
            .customers
            .remove(customer_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("No such customer: '{}'", customer_id)))
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Res<Customer> {
        let mut state = self.call("set_default_payment_method")?;
        let customer = state.customer_mut(customer_id)?;
        customer.default_payment_method = Some(payment_method_id.to_string());
        Ok(customer.clone())
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
        filters: &SubscriptionFilters,
    ) -> Res<Vec<Subscription>> {
        let state = self.call("list_subscriptions")?;
        let status = filters.status.unwrap_or_default();
        let limit = filters.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(state
            .subscriptions
            .iter()
            .filter(|sub| sub.customer == customer_id && status.includes(&sub.status))
            .filter(|sub| filters.price.is_none() || sub.price_id == filters.price)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Res<Subscription> {
        let mut state = self.call("retrieve_subscription")?;
        state.subscription_mut(subscription_id).map(|sub| sub.clone())
    }

    async fn create_subscription(&self, params: &CreateSubscriptionParams) -> Res<Subscription> {
        let mut state = self.call("create_subscription")?;
        let product_id = state
            .prices
            .iter()
            .find(|price| price.id == params.price_id)
            .ok_or_else(|| AppError::NotFound(format!("No such price: '{}'", params.price_id)))?
            .product
            .clone();
        let period_end = chrono::Utc::now() + chrono::Duration::days(PERIOD_DAYS);
        let sub = Subscription {
            id: state.next_id("sub"),
            customer: params.customer_id.clone(),
            status: "active".to_string(),
            price_id: Some(params.price_id.clone()),
            product_id,
            cancel_at: None,
            current_period_end: period_end.timestamp(),
            default_payment_method: params.default_payment_method.clone(),
        };
        state.subscriptions.push(sub.clone());
        Ok(sub)
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        params: &UpdateSubscriptionParams,
    ) -> Res<Subscription> {
        let mut state = self.call("update_subscription")?;
        let sub = state.subscription_mut(subscription_id)?;
        if let Some(pm) = &params.default_payment_method {
            sub.default_payment_method = Some(pm.clone());
        }
        Ok(sub.clone())
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Res<Subscription> {
        let mut state = self.call("cancel_subscription")?;
        let sub = state.subscription_mut(subscription_id)?;
        sub.status = "canceled".to_string();
        Ok(sub.clone())
    }

    async fn list_prices(&self, filters: &PriceFilters) -> Res<Vec<Price>> {
        let state = self.call("list_prices")?;
        let limit = filters.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(state
            .prices
            .iter()
            .filter(|price| price.active)
            .filter(|price| filters.product.is_none() || price.product == filters.product)
            .filter(|price| filters.currency.is_none() || price.currency == filters.currency)
            .filter(|price| filters.price_type.is_none() || price.price_type == filters.price_type)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn retrieve_price(&self, price_id: &str) -> Res<Price> {
        let state = self.call("retrieve_price")?;
        state
            .prices
            .iter()
            .find(|price| price.id == price_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No such price: '{}'", price_id)))
    }

    async fn list_products(&self, filters: &ProductFilters) -> Res<Vec<Product>> {
        let state = self.call("list_products")?;
        let limit = filters.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(state
            .products
            .iter()
            .filter(|product| product.active)
            .filter(|product| {
                filters
                    .ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&product.id))
            })
            .filter(|product| filters.shippable.is_none() || product.shippable == filters.shippable)
            .filter(|product| filters.url.is_none() || product.url == filters.url)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn retrieve_product(&self, product_id: &str) -> Res<Product> {
        let state = self.call("retrieve_product")?;
        state
            .products
            .iter()
            .find(|product| product.id == product_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No such product: '{}'", product_id)))
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
        payment_method_type: &str,
        filters: &PaymentMethodFilters,
    ) -> Res<Vec<PaymentMethod>> {
        let state = self.call("list_payment_methods")?;
        let limit = filters.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(state
            .payment_methods
            .iter()
            .filter(|pm| {
                pm.customer.as_deref() == Some(customer_id)
                    && pm.payment_method_type == payment_method_type
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn retrieve_payment_method(&self, payment_method_id: &str) -> Res<PaymentMethod> {
        let state = self.call("retrieve_payment_method")?;
        state
            .payment_methods
            .iter()
            .find(|pm| pm.id == payment_method_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("No such payment method: '{}'", payment_method_id))
            })
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> Res<PaymentMethod> {
        let mut state = self.call("detach_payment_method")?;
        let pm = state
            .payment_methods
            .iter_mut()
            .find(|pm| pm.id == payment_method_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("No such payment method: '{}'", payment_method_id))
            })?;
        pm.customer = None;
        Ok(pm.clone())
    }

    async fn create_setup_intent(&self, params: &CreateSetupIntentParams) -> Res<SetupIntent> {
        let mut state = self.call("create_setup_intent")?;
        let id = state.next_id("seti");
        Ok(SetupIntent {
            client_secret: Some(format!("{}_secret", id)),
            id,
            customer: Some(params.customer_id.clone()),
            payment_method_types: params.payment_method_types.clone(),
            status: "requires_payment_method".to_string(),
            metadata: params.metadata.clone(),
        })
    }

    async fn create_checkout_session(&self, params: &CreateCheckoutParams) -> Res<CheckoutSession> {
        let mut state = self.call("create_checkout_session")?;
        let id = state.next_id("cs");
        let setup_intent = (params.mode == crate::dtos::checkout::CheckoutMode::Setup)
            .then(|| state.next_id("seti"));
        state.checkouts.push(params.clone());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{}", id)),
            id,
            mode: params.mode.as_str().to_string(),
            customer: Some(params.customer_id.clone()),
            client_reference_id: params.client_reference_id.clone(),
            setup_intent,
            success_url: params.success_url.clone(),
            cancel_url: params.cancel_url.clone(),
        })
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: Option<&str>,
    ) -> Res<BillingPortalSession> {
        let mut state = self.call("create_billing_portal_session")?;
        state.customer_mut(customer_id)?;
        let id = state.next_id("bps");
        Ok(BillingPortalSession {
            url: format!("https://billing.stripe.com/p/session/{}", id),
            id,
            return_url: return_url.map(str::to_string),
        })
    }
}

/// An active recurring monthly price in usd.
pub fn test_price(id: &str, product_id: &str, unit_amount: i64) -> Price {
    Price {
        id: id.to_string(),
        product: Some(product_id.to_string()),
        active: true,
        currency: Some("usd".to_string()),
        unit_amount: Some(unit_amount),
        unit_amount_decimal: Some(unit_amount.to_string()),
        recurring: Some(Recurring {
            interval: "month".to_string(),
            interval_count: 1,
        }),
        price_type: Some("recurring".to_string()),
        nickname: None,
        metadata: HashMap::new(),
    }
}

pub fn test_product(id: &str, name: &str) -> Product {
    Product {
        id: id.to_string(),
        active: true,
        name: Some(name.to_string()),
        description: None,
        images: Vec::new(),
        shippable: None,
        unit_label: None,
        url: None,
        metadata: HashMap::new(),
    }
}

pub fn test_card(id: &str, customer_id: &str) -> PaymentMethod {
    PaymentMethod {
        id: id.to_string(),
        payment_method_type: "card".to_string(),
        customer: Some(customer_id.to_string()),
        card: Some(Card {
            brand: "visa".to_string(),
            last4: "4242".to_string(),
            exp_month: 12,
            exp_year: 2034,
        }),
        created: 1_700_000_000,
        default: false,
    }
}

pub fn test_customer(id: &str, email: &str) -> Customer {
    Customer {
        id: id.to_string(),
        email: Some(email.to_string()),
        name: Some(email.to_string()),
        default_payment_method: None,
    }
}

/// An active subscription on `price`, ending its period in a month.
pub fn test_subscription(id: &str, customer_id: &str, price: &Price) -> Subscription {
    Subscription {
        id: id.to_string(),
        customer: customer_id.to_string(),
        status: "active".to_string(),
        price_id: Some(price.id.clone()),
        product_id: price.product.clone(),
        cancel_at: None,
        current_period_end: (chrono::Utc::now() + chrono::Duration::days(PERIOD_DAYS)).timestamp(),
        default_payment_method: None,
    }
}
