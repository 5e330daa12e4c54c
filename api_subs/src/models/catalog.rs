use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::sub::SubscriptionInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurring {
    pub interval: String,
    pub interval_count: u64,
}

/// A Stripe price projected onto the fields callers may see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    /// Cleared when the price is listed under its product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    pub active: bool,
    pub currency: Option<String>,
    pub unit_amount: Option<i64>,
    pub unit_amount_decimal: Option<String>,
    pub recurring: Option<Recurring>,
    #[serde(rename = "type")]
    pub price_type: Option<String>,
    pub nickname: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A Stripe product projected onto the fields callers may see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub active: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub shippable: Option<bool>,
    pub unit_label: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceWithSubscriptionInfo {
    #[serde(flatten)]
    pub price: Price,
    pub subscription_info: SubscriptionInfo,
}

impl PriceWithSubscriptionInfo {
    pub fn unsubscribed(price: Price) -> Self {
        PriceWithSubscriptionInfo {
            price,
            subscription_info: SubscriptionInfo::not_subscribed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductWithPrices {
    #[serde(flatten)]
    pub product: Product,
    pub prices: Vec<PriceWithSubscriptionInfo>,
    pub subscription_info: SubscriptionInfo,
}

impl ProductWithPrices {
    pub fn new(product: Product) -> Self {
        ProductWithPrices {
            product,
            prices: Vec::new(),
            subscription_info: SubscriptionInfo::not_subscribed(),
        }
    }

    /// Appends a price of this product, without its product reference.
    ///
    /// The product takes the info of the first subscribed price it receives.
    pub fn push_price(&mut self, mut price: PriceWithSubscriptionInfo) {
        price.price.product = None;
        if price.subscription_info.subscribed && !self.subscription_info.subscribed {
            self.subscription_info = price.subscription_info.clone();
        }
        self.prices.push(price);
    }
}
