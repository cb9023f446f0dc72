//! Errors surfaced by the checkout coordinator.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::validation::ValidationError;

pub const INVALID_CPF_MESSAGE: &str = "Invalid CPF. Check the number and try again.";
pub const INVALID_NAME_MESSAGE: &str = "Please enter your full name.";
pub const TRANSPORT_MESSAGE: &str =
    "Could not reach the payment service. Please try again in a moment.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Why a submission did not reach `AwaitingPayment`.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("gateway rejected the transaction ({status}): {message}")]
    GatewayRejection { status: u16, message: String },

    #[error("could not reach the payment service: {0}")]
    Transport(String),

    #[error("gateway returned an unusable transaction: {0}")]
    InvalidTransaction(String),

    #[error("a transaction is already being created")]
    Busy,

    #[error("checkout was cancelled before the transaction was created")]
    Cancelled,
}

impl CheckoutError {
    /// The single message shown to the customer for this failure.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Validation(e) if e.field == "cpf" => INVALID_CPF_MESSAGE.to_string(),
            CheckoutError::Validation(_) => INVALID_NAME_MESSAGE.to_string(),
            CheckoutError::GatewayRejection { message, .. } => message.clone(),
            CheckoutError::Transport(_) => TRANSPORT_MESSAGE.to_string(),
            CheckoutError::InvalidTransaction(_)
            | CheckoutError::Busy
            | CheckoutError::Cancelled => UNEXPECTED_MESSAGE.to_string(),
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Rejected { status, message } => {
                CheckoutError::GatewayRejection { status, message }
            }
            GatewayError::Unavailable(status) => {
                CheckoutError::Transport(format!("HTTP {}", status))
            }
            GatewayError::Transport(e) => CheckoutError::Transport(e.to_string()),
            GatewayError::InvalidUrl(e) => CheckoutError::Transport(e),
            GatewayError::InvalidResponse(e) => CheckoutError::InvalidTransaction(e),
        }
    }
}
