use std::collections::HashMap;

use common::{error::Res, user::StripeUser};
use log::info;

use super::guard::require_customer_id;
use crate::{api::StripeApi, dtos::customer::CreateCustomerParams, models::customer::Customer};

/// Creates the Stripe customer of `user` and stores its id on the user.
///
/// The user id is saved in the customer's metadata under `id`. Persisting
/// the user afterwards is up to the caller.
pub async fn create_customer<C: StripeApi, U: StripeUser>(
    client: &C,
    user: &mut U,
    metadata: Option<HashMap<String, String>>,
) -> Res<Customer> {
    let mut metadata = metadata.unwrap_or_default();
    metadata.insert("id".to_string(), user.id());
    let params = CreateCustomerParams {
        email: user.email().to_string(),
        name: Some(user.display_name()),
        metadata,
    };

    let customer = client.create_customer(&params).await?;
    info!("Created customer {} for user {}", customer.id, user.id());
    user.set_stripe_customer_id(Some(customer.id.clone()));
    Ok(customer)
}

/// Deletes the user's Stripe customer and clears the id from the user.
pub async fn delete_customer<C: StripeApi, U: StripeUser>(client: &C, user: &mut U) -> Res<()> {
    let customer_id = require_customer_id(Some(&*user))?.to_string();
    client.delete_customer(&customer_id).await?;
    info!("Deleted customer {} of user {}", customer_id, user.id());
    user.set_stripe_customer_id(None);
    Ok(())
}
