use std::collections::HashMap;

use common::{error::Res, user::StripeUser};

use super::sub::{is_subscribed_and_cancelled_time, list_products_prices_subscribed_to};
use crate::{
    api::StripeApi,
    dtos::{
        catalog::{PriceFilters, ProductFilters},
        sub::SubscriptionFilters,
    },
    models::{
        catalog::{Price, PriceWithSubscriptionInfo, Product, ProductWithPrices},
        sub::{SubscribedTo, SubscriptionInfo},
    },
};

/// Gets the active prices matching `filters`.
pub async fn get_active_prices<C: StripeApi>(client: &C, filters: &PriceFilters) -> Res<Vec<Price>> {
    client.list_prices(filters).await
}

/// Gets the active products matching `filters`.
pub async fn get_active_products<C: StripeApi>(
    client: &C,
    filters: &ProductFilters,
) -> Res<Vec<Product>> {
    client.list_products(filters).await
}

fn with_subscription_info(
    prices: Vec<Price>,
    subscribed: &[SubscribedTo],
) -> Vec<PriceWithSubscriptionInfo> {
    prices
        .into_iter()
        .map(|price| {
            let subscription_info = subscribed
                .iter()
                .find(|sub| sub.price_id.as_deref() == Some(price.id.as_str()))
                .map(SubscriptionInfo::from)
                .unwrap_or_default();
            PriceWithSubscriptionInfo {
                price,
                subscription_info,
            }
        })
        .collect()
}

/// Gets the active prices, each annotated with the user's subscription to it.
/// Prices and subscriptions are requested concurrently.
pub async fn get_subscription_prices<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    filters: &PriceFilters,
) -> Res<Vec<PriceWithSubscriptionInfo>> {
    let sub_filters = SubscriptionFilters::default();
    let (prices, subscribed) = tokio::join!(
        get_active_prices(client, filters),
        list_products_prices_subscribed_to(client, user, &sub_filters)
    );
    Ok(with_subscription_info(prices?, &subscribed?))
}

pub async fn retrieve_price<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    price_id: &str,
) -> Res<PriceWithSubscriptionInfo> {
    let (price, subscription_info) = tokio::join!(
        client.retrieve_price(price_id),
        is_subscribed_and_cancelled_time(client, user, None, Some(price_id))
    );
    Ok(PriceWithSubscriptionInfo {
        price: price?,
        subscription_info: subscription_info?,
    })
}

fn group_prices(
    products: Vec<Product>,
    prices: Vec<PriceWithSubscriptionInfo>,
) -> Vec<ProductWithPrices> {
    let mut products = products
        .into_iter()
        .map(ProductWithPrices::new)
        .collect::<Vec<_>>();
    let index = products
        .iter()
        .enumerate()
        .map(|(i, p)| (p.product.id.clone(), i))
        .collect::<HashMap<_, _>>();

    for price in prices {
        let position = price
            .price
            .product
            .as_ref()
            .and_then(|product_id| index.get(product_id).copied());
        if let Some(i) = position {
            products[i].push_price(price);
        }
    }
    products
}

/// Gets the active products with their prices and the user's subscriptions.
///
/// A product reports the subscription of its first subscribed price.
pub async fn get_subscription_products_and_prices<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    filters: &ProductFilters,
    price_filters: &PriceFilters,
) -> Res<Vec<ProductWithPrices>> {
    let (products, prices) = tokio::join!(
        get_active_products(client, filters),
        get_subscription_prices(client, user, price_filters)
    );
    Ok(group_prices(products?, prices?))
}

pub async fn retrieve_product<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    product_id: &str,
    price_filters: &PriceFilters,
) -> Res<ProductWithPrices> {
    let price_filters = PriceFilters {
        product: Some(product_id.to_string()),
        ..price_filters.clone()
    };
    let (product, prices) = tokio::join!(
        client.retrieve_product(product_id),
        get_subscription_prices(client, user, &price_filters)
    );

    let mut product = ProductWithPrices::new(product?);
    for price in prices? {
        product.push_price(price);
    }
    Ok(product)
}

#[cfg(test)]
mod tests {
    use common::{error::AppError, user::User};

    use super::*;
    use crate::testing::{MockStripeApi, test_price, test_product, test_subscription};

    fn catalog() -> MockStripeApi {
        MockStripeApi::new()
            .with_product(test_product("prod_gold", "Gold"))
            .with_price(test_price("price_gold_monthly", "prod_gold", 1000))
            .with_price(test_price("price_gold_yearly", "prod_gold", 10000))
            .with_product(test_product("prod_silver", "Silver"))
            .with_price(test_price("price_silver", "prod_silver", 500))
    }

    fn subscriber(client: &MockStripeApi) -> User {
        let mut sub = test_subscription(
            "sub_1",
            "cus_1",
            &test_price("price_gold_yearly", "prod_gold", 10000),
        );
        sub.cancel_at = Some(1_900_000_000);
        client.add_subscription(sub);
        User::new(1, "testuser@example.com").with_customer_id("cus_1")
    }

    #[tokio::test]
    async fn test_prices_carry_subscription_info_of_matching_subscription() {
        let client = catalog();
        let user = subscriber(&client);
        let period_end = client.subscription("sub_1").unwrap().current_period_end;

        let prices = get_subscription_prices(&client, Some(&user), &PriceFilters::default())
            .await
            .unwrap();

        assert_eq!(prices.len(), 3);
        for price in &prices {
            let info = &price.subscription_info;
            if price.price.id == "price_gold_yearly" {
                assert!(info.subscribed);
                assert_eq!(info.sub_id.as_deref(), Some("sub_1"));
                assert_eq!(info.cancel_at, Some(1_900_000_000));
                assert_eq!(info.current_period_end, Some(period_end));
            } else {
                assert_eq!(info, &SubscriptionInfo::not_subscribed());
            }
        }
        assert_eq!(client.call_count("list_prices"), 1);
        assert_eq!(client.call_count("list_subscriptions"), 1);
    }

    #[tokio::test]
    async fn test_anonymous_prices_skip_subscription_lookup() {
        let client = catalog();

        let prices = get_subscription_prices::<_, User>(&client, None, &PriceFilters::default())
            .await
            .unwrap();

        assert!(prices.iter().all(|p| !p.subscription_info.subscribed));
        assert_eq!(client.call_count("list_subscriptions"), 0);
    }

    #[tokio::test]
    async fn test_prices_filtered_by_product() {
        let client = catalog();

        let prices = get_active_prices(&client, &PriceFilters::for_product("prod_silver"))
            .await
            .unwrap();

        let ids = prices.iter().map(|p| p.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["price_silver"]);
    }

    #[tokio::test]
    async fn test_retrieve_price() {
        let client = catalog();
        let user = subscriber(&client);

        let price = retrieve_price(&client, Some(&user), "price_gold_yearly").await.unwrap();
        assert!(price.subscription_info.subscribed);
        assert_eq!(price.price.product.as_deref(), Some("prod_gold"));

        let price = retrieve_price(&client, Some(&user), "price_silver").await.unwrap();
        assert!(!price.subscription_info.subscribed);
    }

    #[tokio::test]
    async fn test_products_group_their_prices() {
        let client = catalog().with_product(test_product("prod_empty", "Empty"));
        let user = subscriber(&client);

        let products = get_subscription_products_and_prices(
            &client,
            Some(&user),
            &ProductFilters::default(),
            &PriceFilters::default(),
        )
        .await
        .unwrap();

        assert_eq!(products.len(), 3);
        let gold = &products[0];
        assert_eq!(gold.product.id, "prod_gold");
        assert_eq!(gold.prices.len(), 2);
        assert!(gold.prices.iter().all(|p| p.price.product.is_none()));
        assert!(gold.subscription_info.subscribed);
        assert_eq!(gold.subscription_info.sub_id.as_deref(), Some("sub_1"));

        let silver = &products[1];
        assert_eq!(silver.prices.len(), 1);
        assert!(!silver.subscription_info.subscribed);

        let empty = &products[2];
        assert!(empty.prices.is_empty());
        assert_eq!(empty.subscription_info, SubscriptionInfo::not_subscribed());
    }

    #[tokio::test]
    async fn test_product_info_comes_from_first_subscribed_price() {
        let client = catalog();
        let user = subscriber(&client);
        client.add_subscription(test_subscription(
            "sub_2",
            "cus_1",
            &test_price("price_gold_monthly", "prod_gold", 1000),
        ));

        let product = retrieve_product(&client, Some(&user), "prod_gold", &PriceFilters::default())
            .await
            .unwrap();

        assert_eq!(product.prices.len(), 2);
        assert_eq!(product.prices[0].price.id, "price_gold_monthly");
        assert_eq!(product.subscription_info.sub_id.as_deref(), Some("sub_2"));
    }

    #[tokio::test]
    async fn test_failed_branch_is_reported_after_join() {
        let client = catalog();
        let user = subscriber(&client);
        client.fail_on("list_products");

        let err = get_subscription_products_and_prices(
            &client,
            Some(&user),
            &ProductFilters::default(),
            &PriceFilters::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(client.call_count("list_prices"), 1);
        assert_eq!(client.call_count("list_subscriptions"), 1);
    }

    #[test]
    fn test_price_serializes_without_stripped_product() {
        let mut price = PriceWithSubscriptionInfo::unsubscribed(test_price("price_1", "prod_1", 100));
        let json = serde_json::to_value(&price).unwrap();
        assert_eq!(json["product"], "prod_1");
        assert_eq!(json["type"], "recurring");
        assert_eq!(json["subscription_info"]["subscribed"], false);

        price.price.product = None;
        let json = serde_json::to_value(&price).unwrap();
        assert!(json.get("product").is_none());
    }
}
