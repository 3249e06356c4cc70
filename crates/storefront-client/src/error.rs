//! Client error types.

use rust_decimal::Decimal;

/// Errors that can occur when using the storefront client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response without a more specific variant.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The game does not exist.
    #[error("game not found: {message}")]
    GameNotFound {
        /// Server message.
        message: String,
    },

    /// The user has no account.
    #[error("account not found: {message}")]
    AccountNotFound {
        /// Server message.
        message: String,
    },

    /// The user already owns the game.
    #[error("already owned: {message}")]
    AlreadyOwned {
        /// Server message.
        message: String,
    },

    /// The DLC's base game must be purchased first.
    #[error("base game required: {message}")]
    BaseGameRequired {
        /// Server message.
        message: String,
    },

    /// Insufficient funds.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: Decimal,
        /// Required amount.
        required: Decimal,
    },

    /// The transaction was rolled back; the request may be retried.
    #[error("transaction failed: {message}")]
    TransactionFailed {
        /// Server message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Check if repeating the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransactionFailed { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
