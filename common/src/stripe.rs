use stripe::Client;

use crate::env_config::Config;

pub const APP_NAME: &str = "stripe-subscriptions";
pub const APP_URL: &str = "https://github.com/primal100/stripe-subscriptions";

pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}

/// Builds the Stripe client described by `config`, tagging requests with
/// this library's app info unless disabled.
pub fn create_client_from_config(config: &Config) -> Client {
    let client = create_client(&config.stripe_secret_key);
    if config.set_app_info {
        client.with_app_info(
            APP_NAME.to_string(),
            Some(env!("CARGO_PKG_VERSION").to_string()),
            Some(APP_URL.to_string()),
        )
    } else {
        client
    }
}
