use common::{error::Res, user::StripeUser};
use log::debug;

use super::guard::require_customer_id;
use crate::{
    api::StripeApi,
    dtos::checkout::{CheckoutMode, CheckoutSettings, CreateCheckoutParams, LineItem},
    models::customer::{BillingPortalSession, CheckoutSession},
};

const DEFAULT_PAYMENT_METHOD_TYPES: &[&str] = &["card"];

fn checkout_params<U: StripeUser>(
    settings: &CheckoutSettings,
    user: Option<&U>,
    mode: CheckoutMode,
    line_items: Vec<LineItem>,
    payment_method_types: &[&str],
) -> Res<CreateCheckoutParams> {
    let customer_id = require_customer_id(user)?;
    let payment_method_types = if payment_method_types.is_empty() {
        DEFAULT_PAYMENT_METHOD_TYPES
    } else {
        payment_method_types
    };

    Ok(CreateCheckoutParams {
        customer_id: customer_id.to_string(),
        client_reference_id: user.map(|u| u.id()),
        mode,
        line_items,
        payment_method_types: payment_method_types.iter().map(|t| t.to_string()).collect(),
        success_url: settings.success_url.clone(),
        cancel_url: settings.cancel_url.clone(),
        setup_intent_metadata: Default::default(),
    })
}

/// Creates a Checkout session for the user's customer.
/// Billing address collection is always required; payment method types
/// default to `card`.
pub async fn create_checkout<C: StripeApi, U: StripeUser>(
    client: &C,
    settings: &CheckoutSettings,
    user: Option<&U>,
    mode: CheckoutMode,
    line_items: Vec<LineItem>,
    payment_method_types: &[&str],
) -> Res<CheckoutSession> {
    let params = checkout_params(settings, user, mode, line_items, payment_method_types)?;
    debug!(
        "Creating {} checkout for customer {}",
        mode.as_str(),
        params.customer_id
    );
    client.create_checkout_session(&params).await
}

/// Checkout for a subscription to one unit of `price_id`.
pub async fn create_subscription_checkout<C: StripeApi, U: StripeUser>(
    client: &C,
    settings: &CheckoutSettings,
    user: Option<&U>,
    price_id: &str,
    payment_method_types: &[&str],
) -> Res<CheckoutSession> {
    create_checkout(
        client,
        settings,
        user,
        CheckoutMode::Subscription,
        vec![LineItem::new(price_id, 1)],
        payment_method_types,
    )
    .await
}

/// Checkout collecting a payment method.
/// With `subscription_id`, the setup intent's metadata names the
/// subscription the method is meant for.
pub async fn create_setup_checkout<C: StripeApi, U: StripeUser>(
    client: &C,
    settings: &CheckoutSettings,
    user: Option<&U>,
    subscription_id: Option<&str>,
    payment_method_types: &[&str],
) -> Res<CheckoutSession> {
    let mut params = checkout_params(
        settings,
        user,
        CheckoutMode::Setup,
        Vec::new(),
        payment_method_types,
    )?;
    if let Some(subscription_id) = subscription_id {
        params
            .setup_intent_metadata
            .insert("subscription_id".to_string(), subscription_id.to_string());
    }
    client.create_checkout_session(&params).await
}

pub async fn create_billing_portal_session<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    return_url: Option<&str>,
) -> Res<BillingPortalSession> {
    let customer_id = require_customer_id(user)?;
    client.create_billing_portal_session(customer_id, return_url).await
}
