use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::error::{AppError, Res};

/// Default upper bound of Stripe calls in flight for one fan-out.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Default lifetime of a cached "is subscribed" answer.
pub const DEFAULT_CACHE_TIMEOUT_SECS: u64 = 3600;

#[derive(Clone, Debug)]
/// Configuration struct for the subscriptions library.
///
/// Holds the Stripe credentials, the default checkout and billing portal
/// redirect urls, the fan-out concurrency bound, the cache backend and
/// the logging preferences. It is built once at startup and passed
/// explicitly to whatever needs it.
pub struct Config {
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Whether to register this library's app info with the Stripe client.
    pub set_app_info: bool,
    /// Url Stripe Checkout redirects to after success.
    pub checkout_success_url: Option<String>,
    /// Url Stripe Checkout redirects to when the user cancels.
    pub checkout_cancel_url: Option<String>,
    /// Url the billing portal links back to.
    pub portal_return_url: Option<String>,
    /// Maximum number of Stripe calls issued concurrently by one fan-out.
    pub max_concurrent_requests: usize,
    /// The URL of Redis server used as subscription cache, if any.
    pub redis_url: Option<String>,
    /// Expiry of cached subscription checks.
    pub cache_timeout: Duration,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Optional file the logger also writes to.
    pub log_file: Option<String>,
    /// Log level name (error, warn, info, debug, trace).
    pub log_level: String,
}

impl Config {
    /// Creates a configuration with defaults for everything but the api key.
    pub fn new(stripe_secret_key: impl Into<String>) -> Self {
        Config {
            stripe_secret_key: stripe_secret_key.into(),
            set_app_info: true,
            checkout_success_url: None,
            checkout_cancel_url: None,
            portal_return_url: None,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            redis_url: None,
            cache_timeout: Duration::from_secs(DEFAULT_CACHE_TIMEOUT_SECS),
            console_logging_enabled: true,
            log_file: None,
            log_level: "info".to_string(),
        }
    }

    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `STRIPE_SECRET_KEY`: Stripe secret (or restricted) key
    ///
    /// Optional (with defaults):
    /// - `STRIPE_SET_APP_INFO`: register app info on the client (default: true)
    /// - `STRIPE_CHECKOUT_SUCCESS_URL`, `STRIPE_CHECKOUT_CANCEL_URL`: checkout redirects
    /// - `STRIPE_PORTAL_RETURN_URL`: billing portal return url
    /// - `STRIPE_MAX_CONCURRENT_REQUESTS`: fan-out bound (default: 8)
    /// - `REDIS_URL`: use Redis as subscription cache
    /// - `SUBSCRIPTION_CACHE_TIMEOUT_SECS`: cache expiry (default: 3600)
    /// - `ENABLE_CONSOLE_LOGGING`: whether to enable console logging (default: true)
    /// - `LOG_FILE`: additional log file
    /// - `LOG_LEVEL`: log level (default: info)
    pub fn from_env() -> Res<Arc<Self>> {
        dotenvy::dotenv().ok();

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY")
            .map_err(|_| AppError::Config("STRIPE_SECRET_KEY must be set".to_string()))?;

        let mut config = Config::new(stripe_secret_key);
        config.set_app_info = parse_bool("STRIPE_SET_APP_INFO", true);
        config.checkout_success_url = env::var("STRIPE_CHECKOUT_SUCCESS_URL").ok();
        config.checkout_cancel_url = env::var("STRIPE_CHECKOUT_CANCEL_URL").ok();
        config.portal_return_url = env::var("STRIPE_PORTAL_RETURN_URL").ok();
        config.max_concurrent_requests =
            parse_var("STRIPE_MAX_CONCURRENT_REQUESTS", DEFAULT_MAX_CONCURRENT_REQUESTS)?.max(1);
        config.redis_url = env::var("REDIS_URL").ok();
        config.cache_timeout = Duration::from_secs(parse_var(
            "SUBSCRIPTION_CACHE_TIMEOUT_SECS",
            DEFAULT_CACHE_TIMEOUT_SECS,
        )?);
        config.console_logging_enabled = parse_bool("ENABLE_CONSOLE_LOGGING", true);
        config.log_file = env::var("LOG_FILE").ok();
        config.log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Arc::new(config))
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Res<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number", name))),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("sk_test_123");
        assert_eq!(config.stripe_secret_key, "sk_test_123");
        assert!(config.set_app_info);
        assert_eq!(config.max_concurrent_requests, DEFAULT_MAX_CONCURRENT_REQUESTS);
        assert_eq!(config.cache_timeout, Duration::from_secs(3600));
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: usize = parse_var("SUBSCRIPTIONS_TEST_UNSET_VARIABLE", 5).unwrap();
        assert_eq!(value, 5);
    }
}
