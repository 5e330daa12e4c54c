use std::time::Duration;

use api_subs::SubscriptionCache;
use common::{env_config::Config, error::Res};

pub mod memory;
pub mod redis;

pub use crate::memory::InMemoryCache;
pub use crate::redis::RedisCache;

/// The cache picked by configuration: Redis when `REDIS_URL` is set,
/// otherwise in memory.
pub enum Backend {
    Memory(InMemoryCache),
    Redis(RedisCache),
}

impl Backend {
    pub fn from_config(config: &Config) -> Res<Self> {
        match &config.redis_url {
            Some(url) => {
                log::info!("Caching subscription checks in Redis");
                Ok(Backend::Redis(RedisCache::connect(url)?))
            }
            None => {
                log::info!("Caching subscription checks in memory");
                Ok(Backend::Memory(InMemoryCache::new()))
            }
        }
    }
}

impl SubscriptionCache for Backend {
    async fn get(&self, key: &str) -> Res<Option<bool>> {
        match self {
            Backend::Memory(cache) => cache.get(key).await,
            Backend::Redis(cache) => cache.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: bool, timeout: Option<Duration>) -> Res<()> {
        match self {
            Backend::Memory(cache) => cache.set(key, value, timeout).await,
            Backend::Redis(cache) => cache.set(key, value, timeout).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use api_subs::{
        services::cache::{cache_key, is_subscribed_with_cache},
        testing::{MockStripeApi, test_price, test_product, test_subscription},
    };
    use common::{error::AppError, user::User};

    use super::*;

    /// Counts every access to the wrapped cache.
    #[derive(Default)]
    struct CountingCache {
        inner: InMemoryCache,
        accesses: AtomicUsize,
    }

    impl SubscriptionCache for CountingCache {
        async fn get(&self, key: &str) -> Res<Option<bool>> {
            self.accesses.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: bool, timeout: Option<Duration>) -> Res<()> {
            self.accesses.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value, timeout).await
        }
    }

    fn client() -> MockStripeApi {
        MockStripeApi::new()
            .with_product(test_product("prod_1", "Gold"))
            .with_price(test_price("price_1", "prod_1", 1000))
            .with_product(test_product("prod_2", "Silver"))
            .with_price(test_price("price_2", "prod_2", 500))
    }

    fn subscriber(client: &MockStripeApi) -> User {
        client.add_subscription(test_subscription(
            "sub_1",
            "cus_1",
            &test_price("price_1", "prod_1", 1000),
        ));
        User::new(1, "testuser@example.com").with_customer_id("cus_1")
    }

    #[tokio::test]
    async fn test_positive_result_is_cached() {
        let client = client();
        let user = subscriber(&client);
        let cache = InMemoryCache::new();

        for _ in 0..2 {
            let subscribed = is_subscribed_with_cache(&client, &cache, Some(&user), Some("prod_1"), None)
                .await
                .unwrap();
            assert!(subscribed);
        }

        assert_eq!(client.call_count("list_subscriptions"), 1);
        assert_eq!(
            cache.get(&cache_key("1", Some("prod_1"))).await.unwrap(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_negative_result_is_never_cached() {
        let client = client();
        let user = subscriber(&client);
        let cache = InMemoryCache::new();

        for _ in 0..2 {
            let subscribed = is_subscribed_with_cache(&client, &cache, Some(&user), Some("prod_2"), None)
                .await
                .unwrap();
            assert!(!subscribed);
        }

        assert_eq!(client.call_count("list_subscriptions"), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entry_is_recomputed() {
        let client = client();
        let user = subscriber(&client);
        let cache = InMemoryCache::new();
        let timeout = Some(Duration::from_millis(20));

        is_subscribed_with_cache(&client, &cache, Some(&user), Some("prod_1"), timeout)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        is_subscribed_with_cache(&client, &cache, Some(&user), Some("prod_1"), timeout)
            .await
            .unwrap();

        assert_eq!(client.call_count("list_subscriptions"), 2);
    }

    #[tokio::test]
    async fn test_similar_user_ids_do_not_share_entries() {
        let client = client();
        client.add_subscription(test_subscription(
            "sub_1",
            "cus_a",
            &test_price("price_1", "prod_1", 1000),
        ));
        let subscriber = User::new("jos\u{e9} 7", "jose@example.com").with_customer_id("cus_a");
        let other = User::new("jos7", "jos@example.com").with_customer_id("cus_b");
        let cache = InMemoryCache::new();

        let subscribed = is_subscribed_with_cache(&client, &cache, Some(&subscriber), Some("prod_1"), None)
            .await
            .unwrap();
        assert!(subscribed);
        let subscribed = is_subscribed_with_cache(&client, &cache, Some(&other), Some("prod_1"), None)
            .await
            .unwrap();
        assert!(!subscribed);
        assert_eq!(client.call_count("list_subscriptions"), 2);
    }

    #[tokio::test]
    async fn test_user_without_customer_skips_cache_and_stripe() {
        let client = client();
        let cache = CountingCache::default();
        let user = User::new(1, "testuser@example.com");

        let subscribed = is_subscribed_with_cache(&client, &cache, Some(&user), Some("prod_1"), None)
            .await
            .unwrap();
        assert!(!subscribed);
        let subscribed = is_subscribed_with_cache::<_, _, User>(&client, &cache, None, Some("prod_1"), None)
            .await
            .unwrap();
        assert!(!subscribed);

        assert_eq!(cache.accesses.load(Ordering::SeqCst), 0);
        assert_eq!(client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_product_is_an_error() {
        let client = client();
        let user = subscriber(&client);
        let cache = InMemoryCache::new();

        let err = is_subscribed_with_cache(&client, &cache, Some(&user), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MissingArgument(_)));
        assert_eq!(client.total_calls(), 0);
    }

    #[test]
    fn test_backend_defaults_to_memory() {
        let config = Config::new("sk_test_123");
        assert!(matches!(
            Backend::from_config(&config).unwrap(),
            Backend::Memory(_)
        ));
    }
}
