use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMethodFilters {
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSetupIntentParams {
    pub customer_id: String,
    pub payment_method_types: Vec<String>,
    pub metadata: HashMap<String, String>,
}
