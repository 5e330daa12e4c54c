use std::time::Duration;

use common::{env_config::DEFAULT_CACHE_TIMEOUT_SECS, error::Res, user::StripeUser};
use log::debug;

use super::sub::is_subscribed;
use crate::api::StripeApi;

pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(DEFAULT_CACHE_TIMEOUT_SECS);

/// Longest key some backends (memcached) accept.
pub const MAX_KEY_LEN: usize = 250;

const KEY_PREFIX: &str = "is_subscribed_";
const USER_ID_CHARS: usize = 80;

/// Key/value store the subscription checks are memoized in.
#[allow(async_fn_in_trait)]
pub trait SubscriptionCache: Send + Sync {
    async fn get(&self, key: &str) -> Res<Option<bool>>;

    /// Stores `value`, forever when `timeout` is `None`.
    async fn set(&self, key: &str, value: bool, timeout: Option<Duration>) -> Res<()>;
}

/// Cache key of "is `user_id` subscribed to `product_id`".
///
/// Keeps the last 80 characters of the user id. Characters that are not
/// printable ascii are percent-escaped rather than dropped, and so is `_` in
/// the user part, so distinct (user, product) pairs never share a key. When
/// the key would exceed `MAX_KEY_LEN` the user part loses its leading escape
/// units; the product id is kept whole.
pub fn cache_key(user_id: &str, product_id: Option<&str>) -> String {
    let skip = user_id.chars().count().saturating_sub(USER_ID_CHARS);
    let mut user_units = user_id
        .chars()
        .skip(skip)
        .map(|c| escape(c, &['%', '_']))
        .collect::<Vec<_>>();
    let product_part = product_id
        .unwrap_or_default()
        .chars()
        .map(|c| escape(c, &['%']))
        .collect::<String>();

    let budget = MAX_KEY_LEN.saturating_sub(KEY_PREFIX.len() + 1 + product_part.len());
    let mut user_len = user_units.iter().map(String::len).sum::<usize>();
    let mut dropped = 0;
    while user_len > budget && dropped < user_units.len() {
        user_len -= user_units[dropped].len();
        dropped += 1;
    }
    user_units.drain(..dropped);

    let mut key = format!("{}{}_{}", KEY_PREFIX, user_units.concat(), product_part);
    // escaped keys are ascii, any byte index is a char boundary
    key.truncate(MAX_KEY_LEN);
    key
}

fn escape(c: char, reserved: &[char]) -> String {
    if c.is_ascii_graphic() && !reserved.contains(&c) {
        return c.to_string();
    }
    let mut buf = [0; 4];
    c.encode_utf8(&mut buf)
        .bytes()
        .map(|b| format!("%{:02X}", b))
        .collect()
}

/// `is_subscribed` memoized in `cache`.
///
/// Only positive answers are stored, so a user who just subscribed is never
/// reported as unsubscribed from the cache.
pub async fn is_subscribed_with_cache<C, K, U>(
    client: &C,
    cache: &K,
    user: Option<&U>,
    product_id: Option<&str>,
    timeout: Option<Duration>,
) -> Res<bool>
where
    C: StripeApi,
    K: SubscriptionCache,
    U: StripeUser,
{
    let Some(user) = user.filter(|u| u.stripe_customer_id().is_some()) else {
        return Ok(false);
    };

    let key = cache_key(&user.id(), product_id);
    if let Some(subscribed) = cache.get(&key).await? {
        debug!("Cache hit for {}", key);
        return Ok(subscribed);
    }

    debug!("Cache miss for {}", key);
    let subscribed = is_subscribed(client, Some(user), product_id, None).await?;
    if subscribed {
        cache
            .set(&key, true, Some(timeout.unwrap_or(DEFAULT_CACHE_TIMEOUT)))
            .await?;
    }
    Ok(subscribed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_keeps_tail_of_long_user_ids() {
        let user_id = format!("{}{}", "a".repeat(100), "b".repeat(80));
        let key = cache_key(&user_id, Some("prod_1"));
        assert_eq!(key, format!("is_subscribed_{}_prod_1", "b".repeat(80)));
    }

    #[test]
    fn test_key_escapes_instead_of_dropping() {
        let key = cache_key("user 1\n", Some("prod 1"));
        assert_eq!(key, "is_subscribed_user%201%0A_prod%201");
        assert_ne!(
            cache_key("jos\u{e9} 7", Some("prod_1")),
            cache_key("jos7", Some("prod_1"))
        );
        assert_ne!(cache_key("a%207", Some("prod_1")), cache_key("a 7", Some("prod_1")));
    }

    #[test]
    fn test_key_separator_is_unambiguous() {
        assert_ne!(cache_key("a_b", Some("c")), cache_key("a", Some("b_c")));
        assert_eq!(cache_key("a_b", Some("prod_1")), "is_subscribed_a%5Fb_prod_1");
    }

    #[test]
    fn test_key_is_bounded_and_keeps_product() {
        let user_id = "\u{e9}".repeat(80);
        let key = cache_key(&user_id, Some("prod_1"));
        assert!(key.len() <= MAX_KEY_LEN);
        assert!(key.ends_with("_prod_1"));
        assert!(key.starts_with("is_subscribed_%C3%A9"));

        let key = cache_key("42", Some(&"p".repeat(400)));
        assert_eq!(key.len(), MAX_KEY_LEN);
        assert!(key.starts_with("is_subscribed__"));
    }
}
