//! Remote calls the services are built from.
//!
//! Every method is one request to Stripe. Implementations return the
//! minimized models, so no caller ever sees a field outside the allowlists.

use common::{env_config::DEFAULT_MAX_CONCURRENT_REQUESTS, error::Res};

use crate::{
    dtos::{
        catalog::{PriceFilters, ProductFilters},
        checkout::CreateCheckoutParams,
        customer::CreateCustomerParams,
        pay::{CreateSetupIntentParams, PaymentMethodFilters},
        sub::{CreateSubscriptionParams, SubscriptionFilters, UpdateSubscriptionParams},
    },
    models::{
        catalog::{Price, Product},
        customer::{BillingPortalSession, CheckoutSession, Customer},
        pay::{PaymentMethod, SetupIntent},
        sub::Subscription,
    },
};

#[allow(async_fn_in_trait)]
pub trait StripeApi: Send + Sync {
    /// Upper bound of requests one fan-out keeps in flight.
    fn concurrency_limit(&self) -> usize {
        DEFAULT_MAX_CONCURRENT_REQUESTS
    }

    // customers
    async fn create_customer(&self, params: &CreateCustomerParams) -> Res<Customer>;
    async fn retrieve_customer(&self, customer_id: &str) -> Res<Customer>;
    async fn delete_customer(&self, customer_id: &str) -> Res<()>;
    /// Sets the customer's invoice default payment method.
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Res<Customer>;

    // subscriptions
    async fn list_subscriptions(
        &self,
        customer_id: &str,
        filters: &SubscriptionFilters,
    ) -> Res<Vec<Subscription>>;
    async fn retrieve_subscription(&self, subscription_id: &str) -> Res<Subscription>;
    async fn create_subscription(&self, params: &CreateSubscriptionParams) -> Res<Subscription>;
    async fn update_subscription(
        &self,
        subscription_id: &str,
        params: &UpdateSubscriptionParams,
    ) -> Res<Subscription>;
    async fn cancel_subscription(&self, subscription_id: &str) -> Res<Subscription>;

    // catalog
    async fn list_prices(&self, filters: &PriceFilters) -> Res<Vec<Price>>;
    async fn retrieve_price(&self, price_id: &str) -> Res<Price>;
    async fn list_products(&self, filters: &ProductFilters) -> Res<Vec<Product>>;
    async fn retrieve_product(&self, product_id: &str) -> Res<Product>;

    // payment methods
    /// Stripe only lists one payment method type per request.
    async fn list_payment_methods(
        &self,
        customer_id: &str,
        payment_method_type: &str,
        filters: &PaymentMethodFilters,
    ) -> Res<Vec<PaymentMethod>>;
    async fn retrieve_payment_method(&self, payment_method_id: &str) -> Res<PaymentMethod>;
    async fn detach_payment_method(&self, payment_method_id: &str) -> Res<PaymentMethod>;
    async fn create_setup_intent(&self, params: &CreateSetupIntentParams) -> Res<SetupIntent>;

    // sessions
    async fn create_checkout_session(&self, params: &CreateCheckoutParams) -> Res<CheckoutSession>;
    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: Option<&str>,
    ) -> Res<BillingPortalSession>;
}
