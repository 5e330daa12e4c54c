use std::fmt;

use serde::{Deserialize, Serialize};

/// What the library needs to know about an application user.
///
/// The application owns the user and persists it; this library only reads the
/// identifier and email, and sets or clears the Stripe customer id in memory
/// when a customer is created or deleted.
pub trait StripeUser {
    /// Stable identifier, rendered as a string.
    fn id(&self) -> String;

    fn email(&self) -> &str;

    /// Name sent to Stripe when creating the customer.
    fn display_name(&self) -> String {
        self.email().to_string()
    }

    fn stripe_customer_id(&self) -> Option<&str>;

    fn set_stripe_customer_id(&mut self, customer_id: Option<String>);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub stripe_customer_id: Option<String>,
}

impl User {
    pub fn new(id: impl fmt::Display, email: impl Into<String>) -> Self {
        User {
            id: id.to_string(),
            email: email.into(),
            stripe_customer_id: None,
        }
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.stripe_customer_id = Some(customer_id.into());
        self
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.email)
    }
}

impl StripeUser for User {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn display_name(&self) -> String {
        self.to_string()
    }

    fn stripe_customer_id(&self) -> Option<&str> {
        self.stripe_customer_id.as_deref().filter(|id| !id.is_empty())
    }

    fn set_stripe_customer_id(&mut self, customer_id: Option<String>) {
        self.stripe_customer_id = customer_id;
    }
}

/// Customer id of an optional user, treating an empty id as absent.
pub fn customer_id_of<U: StripeUser>(user: Option<&U>) -> Option<&str> {
    user.and_then(|u| u.stripe_customer_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_customer_id_is_absent() {
        let user = User::new(1, "testuser@example.com").with_customer_id("");
        assert_eq!(user.stripe_customer_id(), None);
        assert_eq!(customer_id_of(Some(&user)), None);
        assert_eq!(customer_id_of::<User>(None), None);
    }

    #[test]
    fn test_set_customer_id() {
        let mut user = User::new(1, "testuser@example.com");
        user.set_stripe_customer_id(Some("cus_123".to_string()));
        assert_eq!(customer_id_of(Some(&user)), Some("cus_123"));
        assert_eq!(user.display_name(), "testuser@example.com");
    }
}
