use serde::{Deserialize, Serialize};

/// A customer's subscription, reduced to what the lookups need.
///
/// Price and product come from the subscription's first item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    pub price_id: Option<String>,
    pub product_id: Option<String>,
    pub cancel_at: Option<i64>,
    pub current_period_end: i64,
    pub default_payment_method: Option<String>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Flat view of one active subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribedTo {
    pub sub_id: String,
    pub product_id: Option<String>,
    pub price_id: Option<String>,
    pub cancel_at: Option<i64>,
    pub current_period_end: Option<i64>,
}

impl From<&Subscription> for SubscribedTo {
    fn from(sub: &Subscription) -> Self {
        SubscribedTo {
            sub_id: sub.id.clone(),
            product_id: sub.product_id.clone(),
            price_id: sub.price_id.clone(),
            cancel_at: sub.cancel_at,
            current_period_end: Some(sub.current_period_end),
        }
    }
}

impl SubscribedTo {
    pub fn matches(&self, product_id: Option<&str>, price_id: Option<&str>) -> bool {
        let product_match = product_id.is_some() && self.product_id.as_deref() == product_id;
        let price_match = price_id.is_some() && self.price_id.as_deref() == price_id;
        product_match || price_match
    }
}

/// Subscription status attached to a price or product.
///
/// `subscribed` is true exactly when `sub_id` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub subscribed: bool,
    pub sub_id: Option<String>,
    pub cancel_at: Option<i64>,
    pub current_period_end: Option<i64>,
}

impl SubscriptionInfo {
    pub fn not_subscribed() -> Self {
        Self::default()
    }
}

impl From<&SubscribedTo> for SubscriptionInfo {
    fn from(sub: &SubscribedTo) -> Self {
        SubscriptionInfo {
            subscribed: true,
            sub_id: Some(sub.sub_id.clone()),
            cancel_at: sub.cancel_at,
            current_period_end: sub.current_period_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribed_to() -> SubscribedTo {
        SubscribedTo {
            sub_id: "sub_1".to_string(),
            product_id: Some("prod_1".to_string()),
            price_id: Some("price_1".to_string()),
            cancel_at: None,
            current_period_end: Some(1_700_000_000),
        }
    }

    #[test]
    fn test_matches_on_either_discriminator() {
        let sub = subscribed_to();
        assert!(sub.matches(Some("prod_1"), None));
        assert!(sub.matches(None, Some("price_1")));
        assert!(sub.matches(Some("prod_other"), Some("price_1")));
        assert!(!sub.matches(Some("prod_other"), None));
        assert!(!sub.matches(None, None));
    }

    #[test]
    fn test_info_from_subscribed_to() {
        let info = SubscriptionInfo::from(&subscribed_to());
        assert!(info.subscribed);
        assert_eq!(info.sub_id.as_deref(), Some("sub_1"));
        assert_eq!(info.current_period_end, Some(1_700_000_000));
        assert_eq!(SubscriptionInfo::not_subscribed().sub_id, None);
    }
}
