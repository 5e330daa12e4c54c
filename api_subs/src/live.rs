use common::{
    env_config::{Config, DEFAULT_MAX_CONCURRENT_REQUESTS},
    error::{AppError, Res},
    stripe::create_client_from_config,
};
use log::debug;
use stripe::{
    CancelSubscription, CheckoutSessionBillingAddressCollection, Client, CreateBillingPortalSession,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionPaymentMethodTypes,
    CreateCheckoutSessionSetupIntentData, CreateCustomer, CreateSetupIntent, CreateSubscription,
    CreateSubscriptionItems, Currency, CustomerId, CustomerInvoiceSettings, IdOrCreate,
    ListPaymentMethods, ListPrices, ListProducts, ListSubscriptions, PaymentMethodId,
    PaymentMethodTypeFilter, PriceId, PriceType, ProductId, SubscriptionId,
    SubscriptionStatusFilter, UpdateCustomer, UpdateSubscription,
};

use crate::{
    api::StripeApi,
    dtos::{
        catalog::{PriceFilters, ProductFilters},
        checkout::CreateCheckoutParams,
        customer::CreateCustomerParams,
        pay::{CreateSetupIntentParams, PaymentMethodFilters},
        sub::{CreateSubscriptionParams, SubscriptionFilters, UpdateSubscriptionParams},
    },
    misc::convert::{parse_enum, parse_id},
    models::{
        catalog::{Price, Product},
        customer::{BillingPortalSession, CheckoutSession, Customer},
        pay::{PaymentMethod, SetupIntent},
        sub::Subscription,
    },
};

/// `StripeApi` backed by the Stripe HTTP API.
#[derive(Clone)]
pub struct LiveStripeApi {
    client: Client,
    concurrency_limit: usize,
}

impl LiveStripeApi {
    pub fn new(client: Client) -> Self {
        LiveStripeApi {
            client,
            concurrency_limit: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        LiveStripeApi {
            client: create_client_from_config(config),
            concurrency_limit: config.max_concurrent_requests.max(1),
        }
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl StripeApi for LiveStripeApi {
    fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    async fn create_customer(&self, params: &CreateCustomerParams) -> Res<Customer> {
        let create = CreateCustomer {
            email: Some(params.email.as_str()),
            name: params.name.as_deref(),
            metadata: Some(params.metadata.clone()),
            ..Default::default()
        };
        let customer = stripe::Customer::create(&self.client, create)
            .await
            .map_err(AppError::from)?;
        Ok(Customer::from(&customer))
    }

    async fn retrieve_customer(&self, customer_id: &str) -> Res<Customer> {
        let id = parse_id::<CustomerId>(customer_id)?;
        let customer = stripe::Customer::retrieve(&self.client, &id, &[])
            .await
            .map_err(AppError::from)?;
        Ok(Customer::from(&customer))
    }

    async fn delete_customer(&self, customer_id: &str) -> Res<()> {
        let id = parse_id::<CustomerId>(customer_id)?;
        stripe::Customer::delete(&self.client, &id)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Res<Customer> {
        let id = parse_id::<CustomerId>(customer_id)?;
        let mut params = UpdateCustomer::new();
        params.invoice_settings = Some(CustomerInvoiceSettings {
            default_payment_method: Some(payment_method_id.to_string()),
            ..Default::default()
        });
        let customer = stripe::Customer::update(&self.client, &id, params)
            .await
            .map_err(AppError::from)?;
        Ok(Customer::from(&customer))
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
        filters: &SubscriptionFilters,
    ) -> Res<Vec<Subscription>> {
        let status = filters.status.unwrap_or_default();
        let params = ListSubscriptions {
            customer: Some(parse_id::<CustomerId>(customer_id)?),
            status: Some(parse_enum::<SubscriptionStatusFilter>(
                status.as_str(),
                "subscription status",
            )?),
            price: filters.price.as_deref().map(parse_id::<PriceId>).transpose()?,
            limit: filters.limit,
            ..Default::default()
        };
        debug!(
            "Listing {} subscriptions of customer {}",
            status.as_str(),
            customer_id
        );
        let list = stripe::Subscription::list(&self.client, &params)
            .await
            .map_err(AppError::from)?;
        Ok(list.data.iter().map(Subscription::from).collect())
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Res<Subscription> {
        let id = parse_id::<SubscriptionId>(subscription_id)?;
        let sub = stripe::Subscription::retrieve(&self.client, &id, &[])
            .await
            .map_err(AppError::from)?;
        Ok(Subscription::from(&sub))
    }

    async fn create_subscription(&self, params: &CreateSubscriptionParams) -> Res<Subscription> {
        let mut create = CreateSubscription::new(parse_id::<CustomerId>(&params.customer_id)?);
        create.items = Some(vec![CreateSubscriptionItems {
            price: Some(params.price_id.clone()),
            ..Default::default()
        }]);
        create.default_payment_method = params.default_payment_method.as_deref();
        let sub = stripe::Subscription::create(&self.client, create)
            .await
            .map_err(AppError::from)?;
        Ok(Subscription::from(&sub))
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        params: &UpdateSubscriptionParams,
    ) -> Res<Subscription> {
        let id = parse_id::<SubscriptionId>(subscription_id)?;
        let mut update = UpdateSubscription::new();
        update.default_payment_method = params.default_payment_method.as_deref();
        let sub = stripe::Subscription::update(&self.client, &id, update)
            .await
            .map_err(AppError::from)?;
        Ok(Subscription::from(&sub))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Res<Subscription> {
        let id = parse_id::<SubscriptionId>(subscription_id)?;
        let sub = stripe::Subscription::cancel(&self.client, &id, CancelSubscription::default())
            .await
            .map_err(AppError::from)?;
        Ok(Subscription::from(&sub))
    }

    async fn list_prices(&self, filters: &PriceFilters) -> Res<Vec<Price>> {
        let mut params = ListPrices::new();
        params.active = Some(true);
        params.currency = filters
            .currency
            .as_deref()
            .map(|currency| parse_enum::<Currency>(currency, "currency"))
            .transpose()?;
        params.product = filters.product.as_deref().map(IdOrCreate::Id);
        params.type_ = filters
            .price_type
            .as_deref()
            .map(|price_type| parse_enum::<PriceType>(price_type, "price type"))
            .transpose()?;
        params.limit = filters.limit;
        let list = stripe::Price::list(&self.client, &params)
            .await
            .map_err(AppError::from)?;
        Ok(list.data.iter().map(Price::from).collect())
    }

    async fn retrieve_price(&self, price_id: &str) -> Res<Price> {
        let id = parse_id::<PriceId>(price_id)?;
        let price = stripe::Price::retrieve(&self.client, &id, &[])
            .await
            .map_err(AppError::from)?;
        Ok(Price::from(&price))
    }

    async fn list_products(&self, filters: &ProductFilters) -> Res<Vec<Product>> {
        let mut params = ListProducts::new();
        params.active = Some(true);
        params.ids = filters.ids.clone();
        params.shippable = filters.shippable;
        params.url = filters.url.as_deref();
        params.limit = filters.limit;
        let list = stripe::Product::list(&self.client, &params)
            .await
            .map_err(AppError::from)?;
        Ok(list.data.iter().map(Product::from).collect())
    }

    async fn retrieve_product(&self, product_id: &str) -> Res<Product> {
        let id = parse_id::<ProductId>(product_id)?;
        let product = stripe::Product::retrieve(&self.client, &id, &[])
            .await
            .map_err(AppError::from)?;
        Ok(Product::from(&product))
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
        payment_method_type: &str,
        filters: &PaymentMethodFilters,
    ) -> Res<Vec<PaymentMethod>> {
        let mut params = ListPaymentMethods::new();
        params.customer = Some(parse_id::<CustomerId>(customer_id)?);
        params.type_ = Some(parse_enum::<PaymentMethodTypeFilter>(
            payment_method_type,
            "payment method type",
        )?);
        params.limit = filters.limit;
        debug!(
            "Listing {} payment methods of customer {}",
            payment_method_type, customer_id
        );
        let list = stripe::PaymentMethod::list(&self.client, &params)
            .await
            .map_err(AppError::from)?;
        Ok(list.data.iter().map(PaymentMethod::from).collect())
    }

    async fn retrieve_payment_method(&self, payment_method_id: &str) -> Res<PaymentMethod> {
        let id = parse_id::<PaymentMethodId>(payment_method_id)?;
        let pm = stripe::PaymentMethod::retrieve(&self.client, &id, &[])
            .await
            .map_err(AppError::from)?;
        Ok(PaymentMethod::from(&pm))
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> Res<PaymentMethod> {
        let id = parse_id::<PaymentMethodId>(payment_method_id)?;
        let pm = stripe::PaymentMethod::detach(&self.client, &id)
            .await
            .map_err(AppError::from)?;
        Ok(PaymentMethod::from(&pm))
    }

    async fn create_setup_intent(&self, params: &CreateSetupIntentParams) -> Res<SetupIntent> {
        let mut create = CreateSetupIntent::new();
        create.customer = Some(parse_id::<CustomerId>(&params.customer_id)?);
        create.payment_method_types = Some(params.payment_method_types.clone());
        create.metadata = Some(params.metadata.clone());
        let intent = stripe::SetupIntent::create(&self.client, create)
            .await
            .map_err(AppError::from)?;
        Ok(SetupIntent::from(&intent))
    }

    async fn create_checkout_session(&self, params: &CreateCheckoutParams) -> Res<CheckoutSession> {
        let payment_method_types = params
            .payment_method_types
            .iter()
            .map(|t| parse_enum::<CreateCheckoutSessionPaymentMethodTypes>(t, "payment method type"))
            .collect::<Res<Vec<_>>>()?;
        let line_items = params
            .line_items
            .iter()
            .map(|item| CreateCheckoutSessionLineItems {
                price: Some(item.price.clone()),
                quantity: Some(item.quantity),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let setup_intent_data = (!params.setup_intent_metadata.is_empty()).then(|| {
            CreateCheckoutSessionSetupIntentData {
                metadata: Some(params.setup_intent_metadata.clone()),
                ..Default::default()
            }
        });

        let create = CreateCheckoutSession {
            billing_address_collection: Some(CheckoutSessionBillingAddressCollection::Required),
            client_reference_id: params.client_reference_id.as_deref(),
            customer: Some(parse_id::<CustomerId>(&params.customer_id)?),
            line_items: (!line_items.is_empty()).then_some(line_items),
            mode: Some(params.mode.into()),
            payment_method_types: Some(payment_method_types),
            setup_intent_data,
            success_url: params.success_url.as_deref(),
            cancel_url: params.cancel_url.as_deref(),
            ..Default::default()
        };
        let session = stripe::CheckoutSession::create(&self.client, create)
            .await
            .map_err(AppError::from)?;
        Ok(CheckoutSession::from(&session))
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: Option<&str>,
    ) -> Res<BillingPortalSession> {
        let mut create = CreateBillingPortalSession::new(parse_id::<CustomerId>(customer_id)?);
        create.return_url = return_url;
        let session = stripe::BillingPortalSession::create(&self.client, create)
            .await
            .map_err(AppError::from)?;
        Ok(BillingPortalSession::from(&session))
    }
}
