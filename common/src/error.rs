use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Stripe error: {0}")]
    Stripe(#[from] stripe::StripeError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // === APPLICATION ERRORS ===
    #[error(
        "It is required to first create this customer in Stripe using create_customer, and save changes to the stripe_customer_id field"
    )]
    CustomerIdRequired,

    #[error("User {user_id} is not allowed to {action} {resource} {resource_id}")]
    WrongCustomer {
        user_id: String,
        action: String,
        resource: String,
        resource_id: String,
    },

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("set_as_default_payment_method is true but default_payment_method was not provided")]
    DefaultPaymentMethodRequired,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error was raised locally, before any call reached Stripe.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AppError::CustomerIdRequired
                | AppError::MissingArgument(_)
                | AppError::DefaultPaymentMethodRequired
                | AppError::BadRequest(_)
        )
    }

    pub fn wrong_customer(
        user_id: Option<String>,
        action: &str,
        resource: &str,
        resource_id: &str,
    ) -> Self {
        AppError::WrongCustomer {
            user_id: user_id.unwrap_or_else(|| "<anonymous>".to_string()),
            action: action.to_string(),
            resource: resource.to_string(),
            resource_id: resource_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_customer_message_carries_context() {
        let err = AppError::wrong_customer(Some("42".to_string()), "detach", "payment_method", "pm_1");
        assert_eq!(
            err.to_string(),
            "User 42 is not allowed to detach payment_method pm_1"
        );
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_anonymous_user_in_wrong_customer() {
        let err = AppError::wrong_customer(None, "cancel", "subscription", "sub_1");
        assert!(err.to_string().starts_with("User <anonymous>"));
    }

    #[test]
    fn test_precondition_errors() {
        assert!(AppError::CustomerIdRequired.is_precondition());
        assert!(AppError::MissingArgument("product_id".into()).is_precondition());
        assert!(AppError::DefaultPaymentMethodRequired.is_precondition());
        assert!(!AppError::Internal("boom".into()).is_precondition());
    }
}
