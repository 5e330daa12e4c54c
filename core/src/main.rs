use std::{env, process::ExitCode};

use api_subs::{
    LiveStripeApi,
    dtos::catalog::{PriceFilters, ProductFilters},
    services::{cache::is_subscribed_with_cache, catalog::get_subscription_products_and_prices},
};
use common::{env_config::Config, error::Res, user::User};
use logger::LogConfig;

/// Prints the active catalog as JSON, annotated with the subscriptions of
/// `STRIPE_CUSTOMER_ID` when set. With `STRIPE_PRODUCT_ID` also set, checks
/// that subscription through the configured cache.
#[tokio::main]
async fn main() -> ExitCode {
    // get env vars
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // init logger
    if let Err(e) = logger::setup(&LogConfig::from_config(&config)) {
        eprintln!("Failed to set up logger: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> Res<()> {
    let client = LiveStripeApi::from_config(config);
    let user = env::var("STRIPE_CUSTOMER_ID")
        .ok()
        .map(|customer_id| User::new("cli", "cli@localhost").with_customer_id(customer_id));

    let catalog = get_subscription_products_and_prices(
        &client,
        user.as_ref(),
        &ProductFilters::default(),
        &PriceFilters::default(),
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&catalog)?);

    if let Ok(product_id) = env::var("STRIPE_PRODUCT_ID") {
        let cache = cache::Backend::from_config(config)?;
        let subscribed = is_subscribed_with_cache(
            &client,
            &cache,
            user.as_ref(),
            Some(&product_id),
            Some(config.cache_timeout),
        )
        .await?;
        log::info!("Subscribed to {}: {}", product_id, subscribed);
    }
    Ok(())
}
