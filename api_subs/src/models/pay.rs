use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub brand: String,
    pub last4: String,
    pub exp_month: i64,
    pub exp_year: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub payment_method_type: String,
    pub customer: Option<String>,
    pub card: Option<Card>,
    pub created: i64,
    /// Whether this is the customer's invoice default; set by listings.
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    pub customer: Option<String>,
    pub client_secret: Option<String>,
    pub payment_method_types: Vec<String>,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
