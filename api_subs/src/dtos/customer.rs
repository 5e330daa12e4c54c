use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerParams {
    pub email: String,
    pub name: Option<String>,
    pub metadata: HashMap<String, String>,
}
