pub mod api;
pub mod live;

pub mod services {
    pub mod cache;
    pub mod catalog;
    pub mod checkout;
    pub mod customer;
    pub mod guard;
    pub mod pay;
    pub mod sub;
}

pub mod dtos {
    pub mod catalog;
    pub mod checkout;
    pub mod customer;
    pub mod pay;
    pub mod sub;
}

pub mod models {
    pub mod catalog;
    pub mod customer;
    pub mod pay;
    pub mod sub;
}

mod misc {
    pub(crate) mod convert;
}

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::StripeApi;
pub use live::LiveStripeApi;
pub use services::cache::SubscriptionCache;
