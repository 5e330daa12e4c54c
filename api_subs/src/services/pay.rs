use std::collections::HashMap;

use common::{
    error::Res,
    user::{StripeUser, customer_id_of},
};
use futures::{StreamExt, stream};
use log::{debug, info};

use super::guard::{allow_if_owned_by_user, require_customer_id};
use crate::{
    api::StripeApi,
    dtos::pay::{CreateSetupIntentParams, PaymentMethodFilters},
    models::pay::{PaymentMethod, SetupIntent},
};

/// Payment methods fetched by `list_payment_methods`.
///
/// Everything is fetched up front; iterating never calls Stripe, and a
/// clone replays the remaining methods.
#[derive(Debug, Clone, Default)]
pub struct PaymentMethods {
    inner: std::vec::IntoIter<PaymentMethod>,
}

impl PaymentMethods {
    fn new(methods: Vec<PaymentMethod>) -> Self {
        PaymentMethods {
            inner: methods.into_iter(),
        }
    }
}

impl Iterator for PaymentMethods {
    type Item = PaymentMethod;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for PaymentMethods {}

/// Lists the user's payment methods of each of `types`, flagging the
/// customer's default.
///
/// Stripe lists one type per request, so the lists are requested
/// concurrently along with the customer. Methods come out grouped by type,
/// in the order of `types`.
pub async fn list_payment_methods<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    types: &[&str],
    filters: &PaymentMethodFilters,
) -> Res<PaymentMethods> {
    let Some(customer_id) = customer_id_of(user) else {
        return Ok(PaymentMethods::default());
    };
    if types.is_empty() {
        return Ok(PaymentMethods::default());
    }

    let lists = stream::iter(types.iter().copied())
        .map(|pm_type| client.list_payment_methods(customer_id, pm_type, filters))
        .buffered(client.concurrency_limit().max(1))
        .collect::<Vec<_>>();
    let (customer, lists) = tokio::join!(client.retrieve_customer(customer_id), lists);
    let default_id = customer?.default_payment_method;

    let mut methods = Vec::new();
    for list in lists {
        for mut pm in list? {
            pm.default = default_id.as_deref() == Some(pm.id.as_str());
            methods.push(pm);
        }
    }
    debug!(
        "Customer {} has {} payment method(s) of types {:?}",
        customer_id,
        methods.len(),
        types
    );
    Ok(PaymentMethods::new(methods))
}

/// Detaches every payment method `list_payment_methods` would return.
pub async fn detach_all_payment_methods<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    types: &[&str],
    filters: &PaymentMethodFilters,
) -> Res<Vec<PaymentMethod>> {
    let methods = list_payment_methods(client, user, types, filters).await?;
    let results = stream::iter(methods)
        .map(|pm| async move { client.detach_payment_method(&pm.id).await })
        .buffered(client.concurrency_limit().max(1))
        .collect::<Vec<_>>()
        .await;
    let detached = results.into_iter().collect::<Res<Vec<_>>>()?;
    info!("Detached {} payment method(s)", detached.len());
    Ok(detached)
}

/// Detaches one of the user's payment methods.
pub async fn detach_payment_method<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    payment_method_id: &str,
) -> Res<PaymentMethod> {
    allow_if_owned_by_user::<PaymentMethod, _, _>(client, user, payment_method_id, "detach")
        .await?;
    let pm = client.detach_payment_method(payment_method_id).await?;
    info!("Detached payment method {}", pm.id);
    Ok(pm)
}

/// Creates a setup intent to collect a new payment method for the user.
pub async fn create_setup_intent<C: StripeApi, U: StripeUser>(
    client: &C,
    user: Option<&U>,
    payment_method_types: &[&str],
    metadata: Option<HashMap<String, String>>,
) -> Res<SetupIntent> {
    let customer_id = require_customer_id(user)?;
    let params = CreateSetupIntentParams {
        customer_id: customer_id.to_string(),
        payment_method_types: payment_method_types.iter().map(|t| t.to_string()).collect(),
        metadata: metadata.unwrap_or_default(),
    };
    client.create_setup_intent(&params).await
}

#[cfg(test)]
mod tests {
    use common::{error::AppError, user::User};

    use super::*;
    use crate::testing::{MockStripeApi, test_card, test_customer};

    fn wallet() -> MockStripeApi {
        let client = MockStripeApi::new().with_concurrency_limit(2);
        let mut customer = test_customer("cus_1", "testuser@example.com");
        customer.default_payment_method = Some("pm_card_2".to_string());
        client.add_customer(customer);
        client.add_payment_method(test_card("pm_card_1", "cus_1"));
        let mut sepa = test_card("pm_sepa_1", "cus_1");
        sepa.payment_method_type = "sepa_debit".to_string();
        sepa.card = None;
        client.add_payment_method(sepa);
        client.add_payment_method(test_card("pm_card_2", "cus_1"));
        client.add_payment_method(test_card("pm_card_other", "cus_2"));
        client
    }

    fn user() -> User {
        User::new(1, "testuser@example.com").with_customer_id("cus_1")
    }

    #[tokio::test]
    async fn test_no_customer_or_no_types_makes_no_calls() {
        let client = wallet();
        let anonymous = User::new(2, "anon@example.com");

        let methods = list_payment_methods(&client, Some(&anonymous), &["card"], &PaymentMethodFilters::default())
            .await
            .unwrap();
        assert_eq!(methods.count(), 0);

        let methods = list_payment_methods(&client, Some(&user()), &[], &PaymentMethodFilters::default())
            .await
            .unwrap();
        assert_eq!(methods.count(), 0);
        assert_eq!(client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_one_list_per_type_in_type_order() {
        let client = wallet();

        let methods = list_payment_methods(
            &client,
            Some(&user()),
            &["sepa_debit", "card"],
            &PaymentMethodFilters::default(),
        )
        .await
        .unwrap();

        let ids = methods.clone().map(|pm| pm.id).collect::<Vec<_>>();
        assert_eq!(ids, vec!["pm_sepa_1", "pm_card_1", "pm_card_2"]);
        let defaults = methods.filter(|pm| pm.default).map(|pm| pm.id).collect::<Vec<_>>();
        assert_eq!(defaults, vec!["pm_card_2"]);
        assert_eq!(client.call_count("list_payment_methods"), 2);
        assert_eq!(client.call_count("retrieve_customer"), 1);
    }

    #[tokio::test]
    async fn test_replaying_issues_no_calls() {
        let client = wallet();
        let methods = list_payment_methods(&client, Some(&user()), &["card"], &PaymentMethodFilters::default())
            .await
            .unwrap();
        let calls = client.total_calls();

        let first = methods.clone().collect::<Vec<_>>();
        let second = methods.collect::<Vec<_>>();

        assert_eq!(first, second);
        assert_eq!(client.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_detach_all() {
        let client = wallet();

        let detached = detach_all_payment_methods(&client, Some(&user()), &["card"], &PaymentMethodFilters::default())
            .await
            .unwrap();

        assert_eq!(detached.len(), 2);
        assert!(detached.iter().all(|pm| pm.customer.is_none()));
        assert_eq!(client.call_count("detach_payment_method"), 2);
        assert!(client.payment_method("pm_sepa_1").unwrap().customer.is_some());
        assert!(client.payment_method("pm_card_other").unwrap().customer.is_some());
    }

    #[tokio::test]
    async fn test_detach_is_guarded() {
        let client = wallet();

        let err = detach_payment_method(&client, Some(&user()), "pm_card_other")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongCustomer { .. }));
        assert_eq!(client.call_count("detach_payment_method"), 0);

        let pm = detach_payment_method(&client, Some(&user()), "pm_card_1").await.unwrap();
        assert_eq!(pm.customer, None);
    }

    #[tokio::test]
    async fn test_setup_intent_requires_customer() {
        let client = wallet();
        let anonymous = User::new(2, "anon@example.com");

        let err = create_setup_intent(&client, Some(&anonymous), &["card"], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CustomerIdRequired));

        let intent = create_setup_intent(&client, Some(&user()), &["card"], None)
            .await
            .unwrap();
        assert_eq!(intent.customer.as_deref(), Some("cus_1"));
        assert_eq!(intent.payment_method_types, vec!["card".to_string()]);
    }
}
