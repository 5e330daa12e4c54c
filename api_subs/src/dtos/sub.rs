use serde::{Deserialize, Serialize};

/// Subscription status a listing is scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Active,
    #[default]
    All,
    Canceled,
    Ended,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Paused,
    Trialing,
    Unpaid,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Active => "active",
            StatusFilter::All => "all",
            StatusFilter::Canceled => "canceled",
            StatusFilter::Ended => "ended",
            StatusFilter::Incomplete => "incomplete",
            StatusFilter::IncompleteExpired => "incomplete_expired",
            StatusFilter::PastDue => "past_due",
            StatusFilter::Paused => "paused",
            StatusFilter::Trialing => "trialing",
            StatusFilter::Unpaid => "unpaid",
        }
    }

    /// Whether a subscription in `status` is part of this listing.
    pub fn includes(&self, status: &str) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Ended => status == "canceled" || status == "incomplete_expired",
            other => other.as_str() == status,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionFilters {
    /// Defaults to `all` when not set.
    pub status: Option<StatusFilter>,
    pub price: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionParams {
    pub customer_id: String,
    pub price_id: String,
    pub default_payment_method: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubscriptionParams {
    pub default_payment_method: Option<String>,
}
