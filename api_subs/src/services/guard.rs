use common::{
    error::{AppError, Res},
    user::{StripeUser, customer_id_of},
};

use crate::{
    api::StripeApi,
    models::{pay::PaymentMethod, sub::Subscription},
};

/// A Stripe resource that belongs to a single customer.
#[allow(async_fn_in_trait)]
pub trait OwnedResource: Sized {
    /// Name used in ownership errors.
    const RESOURCE: &'static str;

    async fn retrieve<C: StripeApi>(client: &C, id: &str) -> Res<Self>;

    fn owner(&self) -> Option<&str>;
}

impl OwnedResource for Subscription {
    const RESOURCE: &'static str = "subscription";

    async fn retrieve<C: StripeApi>(client: &C, id: &str) -> Res<Self> {
        client.retrieve_subscription(id).await
    }

    fn owner(&self) -> Option<&str> {
        Some(self.customer.as_str())
    }
}

impl OwnedResource for PaymentMethod {
    const RESOURCE: &'static str = "payment_method";

    async fn retrieve<C: StripeApi>(client: &C, id: &str) -> Res<Self> {
        client.retrieve_payment_method(id).await
    }

    fn owner(&self) -> Option<&str> {
        self.customer.as_deref()
    }
}

/// Returns the user's customer id, failing when there is none.
pub fn require_customer_id<U: StripeUser>(user: Option<&U>) -> Res<&str> {
    customer_id_of(user).ok_or(AppError::CustomerIdRequired)
}

/// Fetches the resource and returns it only if it belongs to the user.
///
/// An absent user, an absent customer id and a resource without owner all
/// count as not owned.
pub async fn verify_ownership<R, C, U>(
    client: &C,
    user: Option<&U>,
    resource_id: &str,
    action: &str,
) -> Res<R>
where
    R: OwnedResource,
    C: StripeApi,
    U: StripeUser,
{
    let resource = R::retrieve(client, resource_id).await?;
    let customer_id = customer_id_of(user);
    if customer_id.is_some() && resource.owner() == customer_id {
        return Ok(resource);
    }

    let user_id = user.map(|u| u.id());
    log::warn!(
        "User {} tried to {} {} {} owned by {}",
        user_id.as_deref().unwrap_or("<anonymous>"),
        action,
        R::RESOURCE,
        resource_id,
        resource.owner().unwrap_or("nobody")
    );
    Err(AppError::wrong_customer(
        user_id,
        action,
        R::RESOURCE,
        resource_id,
    ))
}

/// Like `verify_ownership`, but fails before any request when the user has
/// no customer id.
pub async fn allow_if_owned_by_user<R, C, U>(
    client: &C,
    user: Option<&U>,
    resource_id: &str,
    action: &str,
) -> Res<R>
where
    R: OwnedResource,
    C: StripeApi,
    U: StripeUser,
{
    require_customer_id(user)?;
    verify_ownership(client, user, resource_id, action).await
}
