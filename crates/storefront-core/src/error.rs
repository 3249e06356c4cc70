//! Error types for storefront domain rules.

use rust_decimal::Decimal;

use crate::ids::IdError;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Violations of domain invariants detected without touching storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A monetary amount was negative, zero where a positive value is required,
    /// or otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A catalog record breaks a catalog invariant.
    #[error("invalid game: {0}")]
    InvalidGame(String),

    /// A debit would take the balance below zero.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: Decimal,
        /// Amount that was requested.
        required: Decimal,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
