use serde::{Deserialize, Serialize};

/// Filters for price listings. Listings only ever return active prices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceFilters {
    pub product: Option<String>,
    /// Lowercase ISO code, e.g. `usd`.
    pub currency: Option<String>,
    /// `one_time` or `recurring`.
    pub price_type: Option<String>,
    pub limit: Option<u64>,
}

impl PriceFilters {
    pub fn for_product(product_id: impl Into<String>) -> Self {
        PriceFilters {
            product: Some(product_id.into()),
            ..Default::default()
        }
    }
}

/// Filters for product listings. Listings only ever return active products.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilters {
    pub ids: Option<Vec<String>>,
    pub shippable: Option<bool>,
    pub url: Option<String>,
    pub limit: Option<u64>,
}
