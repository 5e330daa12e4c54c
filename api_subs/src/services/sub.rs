use common::{
    error::{AppError, Res},
    user::{StripeUser, customer_id_of},
};
use futures::{StreamExt, stream};
use log::{debug, info};

use super::guard::{allow_if_owned_by_user, require_customer_id};
use crate::{
    api::StripeApi,
    dtos::sub::{
        CreateSubscriptionParams, StatusFilter, SubscriptionFilters, UpdateSubscriptionParams,
    },
    models::sub::{SubscribedTo, Subscription, SubscriptionInfo},
};

/// Lists the user's subscriptions in any status unless `filters` say otherwise.
/// A user without customer id has no subscriptions; nothing is requested.
pub async fn list_subscriptions<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    filters: &SubscriptionFilters,
) -> Res<Vec<Subscription>> {
    let Some(customer_id) = customer_id_of(user) else {
        return Ok(Vec::new());
    };
    client.list_subscriptions(customer_id, filters).await
}

/// Lists the user's active subscriptions.
pub async fn list_active_subscriptions<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    filters: &SubscriptionFilters,
) -> Res<Vec<Subscription>> {
    let filters = SubscriptionFilters {
        status: Some(StatusFilter::Active),
        ..filters.clone()
    };
    list_subscriptions(client, user, &filters).await
}

/// Flattens the user's active subscriptions, in the order Stripe lists them.
pub async fn list_products_prices_subscribed_to<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    filters: &SubscriptionFilters,
) -> Res<Vec<SubscribedTo>> {
    let subs = list_active_subscriptions(client, user, filters).await?;
    Ok(subs.iter().map(SubscribedTo::from).collect())
}

/// Finds the first active subscription to the product or price.
///
/// At least one of `product_id` and `price_id` is required.
pub async fn is_subscribed_and_cancelled_time<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    product_id: Option<&str>,
    price_id: Option<&str>,
) -> Res<SubscriptionInfo> {
    if product_id.is_none() && price_id.is_none() {
        return Err(AppError::MissingArgument(
            "product_id or price_id".to_string(),
        ));
    }

    let subscribed =
        list_products_prices_subscribed_to(client, user, &SubscriptionFilters::default()).await?;
    Ok(subscribed
        .iter()
        .find(|sub| sub.matches(product_id, price_id))
        .map(SubscriptionInfo::from)
        .unwrap_or_default())
}

pub async fn is_subscribed<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    product_id: Option<&str>,
    price_id: Option<&str>,
) -> Res<bool> {
    let info = is_subscribed_and_cancelled_time(client, user, product_id, price_id).await?;
    Ok(info.sub_id.is_some())
}

/// Subscribes the user to a price.
/// With `set_as_default`, the payment method also becomes the customer's
/// invoice default.
pub async fn create_subscription<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    price_id: &str,
    set_as_default: bool,
    default_payment_method: Option<&str>,
) -> Res<Subscription> {
    let customer_id = require_customer_id(user)?;
    if set_as_default && default_payment_method.is_none() {
        return Err(AppError::DefaultPaymentMethodRequired);
    }

    let params = CreateSubscriptionParams {
        customer_id: customer_id.to_string(),
        price_id: price_id.to_string(),
        default_payment_method: default_payment_method.map(str::to_string),
    };
    // Customer first, so a failed update leaves no subscription behind.
    if let Some(pm) = default_payment_method.filter(|_| set_as_default) {
        client.set_default_payment_method(customer_id, pm).await?;
    }
    let sub = client.create_subscription(&params).await?;

    info!(
        "Customer {} subscribed to price {} with {}",
        customer_id, price_id, sub.id
    );
    Ok(sub)
}

/// Cancels one of the user's subscriptions immediately.
pub async fn cancel_subscription<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    subscription_id: &str,
) -> Res<Subscription> {
    allow_if_owned_by_user::<Subscription, _, _>(client, user, subscription_id, "cancel").await?;
    let sub = client.cancel_subscription(subscription_id).await?;
    info!("Cancelled subscription {}", sub.id);
    Ok(sub)
}

/// Cancels every active subscription of the user to the product.
/// Returns whether anything was cancelled.
pub async fn cancel_subscription_for_product<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    product_id: &str,
) -> Res<bool> {
    let subs = list_active_subscriptions(client, user, &SubscriptionFilters::default()).await?;
    let to_cancel = subs
        .iter()
        .filter(|sub| sub.product_id.as_deref() == Some(product_id))
        .map(|sub| sub.id.as_str())
        .collect::<Vec<_>>();
    if to_cancel.is_empty() {
        return Ok(false);
    }

    let results = stream::iter(to_cancel)
        .map(|id| client.cancel_subscription(id))
        .buffered(client.concurrency_limit().max(1))
        .collect::<Vec<_>>()
        .await;
    let cancelled = results.into_iter().collect::<Res<Vec<_>>>()?;
    info!(
        "Cancelled {} subscription(s) to product {}",
        cancelled.len(),
        product_id
    );
    Ok(true)
}

/// Changes the default payment method of one of the user's subscriptions.
pub async fn modify_subscription<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    subscription_id: &str,
    set_as_default: bool,
    default_payment_method: Option<&str>,
) -> Res<Subscription> {
    let customer_id = require_customer_id(user)?;
    if set_as_default && default_payment_method.is_none() {
        return Err(AppError::DefaultPaymentMethodRequired);
    }
    allow_if_owned_by_user::<Subscription, _, _>(client, user, subscription_id, "modify").await?;

    let params = UpdateSubscriptionParams {
        default_payment_method: default_payment_method.map(str::to_string),
    };
    if let Some(pm) = default_payment_method.filter(|_| set_as_default) {
        client.set_default_payment_method(customer_id, pm).await?;
    }
    client.update_subscription(subscription_id, &params).await
}

/// Makes the payment method the default of the customer and of each of the
/// user's active subscriptions.
pub async fn update_default_payment_method_all_subscriptions<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    payment_method_id: &str,
) -> Res<Vec<Subscription>> {
    let customer_id = require_customer_id(user)?;
    let sub_filters = SubscriptionFilters::default();
    let (customer, subs) = tokio::join!(
        client.set_default_payment_method(customer_id, payment_method_id),
        list_active_subscriptions(client, user, &sub_filters)
    );
    customer?;
    let subs = subs?;
    debug!(
        "Setting {} as default of {} subscription(s)",
        payment_method_id,
        subs.len()
    );

    let params = UpdateSubscriptionParams {
        default_payment_method: Some(payment_method_id.to_string()),
    };
    let params = &params;
    let results = stream::iter(subs.iter())
        .map(|sub| client.update_subscription(&sub.id, params))
        .buffered(client.concurrency_limit().max(1))
        .collect::<Vec<_>>()
        .await;
    results.into_iter().collect()
}
