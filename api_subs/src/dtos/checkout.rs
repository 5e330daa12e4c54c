use std::collections::HashMap;

use common::env_config::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Payment,
    Setup,
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Setup => "setup",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub price: String,
    pub quantity: u64,
}

impl LineItem {
    pub fn new(price: impl Into<String>, quantity: u64) -> Self {
        LineItem {
            price: price.into(),
            quantity,
        }
    }
}

/// Where Stripe Checkout sends the user back to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSettings {
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

impl CheckoutSettings {
    pub fn from_config(config: &Config) -> Self {
        CheckoutSettings {
            success_url: config.checkout_success_url.clone(),
            cancel_url: config.checkout_cancel_url.clone(),
        }
    }

    pub fn with_success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    pub fn with_cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutParams {
    pub customer_id: String,
    pub client_reference_id: Option<String>,
    pub mode: CheckoutMode,
    pub line_items: Vec<LineItem>,
    pub payment_method_types: Vec<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    /// Metadata of the setup intent created by a `setup` session.
    pub setup_intent_metadata: HashMap<String, String>,
}
