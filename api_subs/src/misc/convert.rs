use std::{fmt::Display, str::FromStr};

use common::error::{AppError, Res};
use serde::de::DeserializeOwned;
use stripe::CheckoutSessionMode;

use crate::{
    dtos::checkout::CheckoutMode,
    models::{
        catalog::{Price, Product, Recurring},
        customer::{BillingPortalSession, CheckoutSession, Customer},
        pay::{Card, PaymentMethod, SetupIntent},
        sub::Subscription,
    },
};

/// Parses one of Stripe's string enums, e.g. `card` or `usd`.
pub(crate) fn parse_enum<T: DeserializeOwned>(value: &str, what: &str) -> Res<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", what, value)))
}

pub(crate) fn parse_id<T>(id: &str) -> Res<T>
where
    T: FromStr,
    T::Err: Display,
{
    id.parse::<T>()
        .map_err(|e| AppError::BadRequest(format!("Invalid id {}: {}", id, e)))
}

impl From<CheckoutMode> for CheckoutSessionMode {
    fn from(mode: CheckoutMode) -> Self {
        match mode {
            CheckoutMode::Payment => CheckoutSessionMode::Payment,
            CheckoutMode::Setup => CheckoutSessionMode::Setup,
            CheckoutMode::Subscription => CheckoutSessionMode::Subscription,
        }
    }
}

impl From<&stripe::Subscription> for Subscription {
    fn from(sub: &stripe::Subscription) -> Self {
        let price = sub.items.data.first().and_then(|item| item.price.as_ref());
        Subscription {
            id: sub.id.to_string(),
            customer: sub.customer.id().to_string(),
            status: sub.status.to_string(),
            price_id: price.map(|price| price.id.to_string()),
            product_id: price
                .and_then(|price| price.product.as_ref())
                .map(|product| product.id().to_string()),
            cancel_at: sub.cancel_at,
            current_period_end: sub.current_period_end,
            default_payment_method: sub
                .default_payment_method
                .as_ref()
                .map(|pm| pm.id().to_string()),
        }
    }
}

impl From<&stripe::Price> for Price {
    fn from(price: &stripe::Price) -> Self {
        Price {
            id: price.id.to_string(),
            product: price.product.as_ref().map(|product| product.id().to_string()),
            active: price.active.unwrap_or_default(),
            currency: price.currency.map(|currency| currency.to_string()),
            unit_amount: price.unit_amount,
            unit_amount_decimal: price.unit_amount_decimal.clone(),
            recurring: price.recurring.as_ref().map(|recurring| Recurring {
                interval: recurring.interval.to_string(),
                interval_count: recurring.interval_count,
            }),
            price_type: price.type_.map(|type_| type_.to_string()),
            nickname: price.nickname.clone(),
            metadata: price.metadata.clone().unwrap_or_default(),
        }
    }
}

impl From<&stripe::Product> for Product {
    fn from(product: &stripe::Product) -> Self {
        Product {
            id: product.id.to_string(),
            active: product.active.unwrap_or_default(),
            name: product.name.clone(),
            description: product.description.clone(),
            images: product.images.clone().unwrap_or_default(),
            shippable: product.shippable,
            unit_label: product.unit_label.clone(),
            url: product.url.clone(),
            metadata: product.metadata.clone().unwrap_or_default(),
        }
    }
}

impl From<&stripe::PaymentMethod> for PaymentMethod {
    fn from(pm: &stripe::PaymentMethod) -> Self {
        PaymentMethod {
            id: pm.id.to_string(),
            payment_method_type: pm.type_.to_string(),
            customer: pm.customer.as_ref().map(|customer| customer.id().to_string()),
            card: pm.card.as_ref().map(|card| Card {
                brand: card.brand.clone(),
                last4: card.last4.clone(),
                exp_month: card.exp_month,
                exp_year: card.exp_year,
            }),
            created: pm.created,
            default: false,
        }
    }
}

impl From<&stripe::Customer> for Customer {
    fn from(customer: &stripe::Customer) -> Self {
        Customer {
            id: customer.id.to_string(),
            email: customer.email.clone(),
            name: customer.name.clone(),
            default_payment_method: customer
                .invoice_settings
                .as_ref()
                .and_then(|settings| settings.default_payment_method.as_ref())
                .map(|pm| pm.id().to_string()),
        }
    }
}

impl From<&stripe::SetupIntent> for SetupIntent {
    fn from(intent: &stripe::SetupIntent) -> Self {
        SetupIntent {
            id: intent.id.to_string(),
            customer: intent.customer.as_ref().map(|customer| customer.id().to_string()),
            client_secret: intent.client_secret.clone(),
            payment_method_types: intent.payment_method_types.clone(),
            status: intent.status.to_string(),
            metadata: intent.metadata.clone().unwrap_or_default(),
        }
    }
}

impl From<&stripe::CheckoutSession> for CheckoutSession {
    fn from(session: &stripe::CheckoutSession) -> Self {
        CheckoutSession {
            id: session.id.to_string(),
            url: session.url.clone(),
            mode: session.mode.to_string(),
            customer: session.customer.as_ref().map(|customer| customer.id().to_string()),
            client_reference_id: session.client_reference_id.clone(),
            setup_intent: session.setup_intent.as_ref().map(|intent| intent.id().to_string()),
            success_url: session.success_url.clone(),
            cancel_url: session.cancel_url.clone(),
        }
    }
}

impl From<&stripe::BillingPortalSession> for BillingPortalSession {
    fn from(session: &stripe::BillingPortalSession) -> Self {
        BillingPortalSession {
            id: session.id.to_string(),
            url: session.url.clone(),
            return_url: session.return_url.clone(),
        }
    }
}
