//! Purchase outcome errors.

use rust_decimal::Decimal;

use storefront_core::{GameId, UserId};
use storefront_store::StoreError;

/// Why a purchase did not complete.
///
/// Every variant except `TransactionFailed` is a business rejection raised
/// before anything was written. `TransactionFailed` is raised only after the
/// unit of work has been rolled back, so retrying it is always safe.
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// The game does not exist in the catalog.
    #[error("game not found: {game_id}")]
    GameNotFound {
        /// The requested game.
        game_id: GameId,
    },

    /// The purchasing user has no account.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The purchasing user.
        user_id: UserId,
    },

    /// The user already owns the game.
    #[error("game already owned: {game_id}")]
    AlreadyOwned {
        /// The requested game.
        game_id: GameId,
    },

    /// The game is a DLC and the user does not own its base game.
    #[error("base game required: {base_game_id}")]
    BaseGameRequired {
        /// The base game that must be owned first.
        base_game_id: GameId,
    },

    /// The balance does not cover the effective price.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: Decimal,
        /// Effective price of the game.
        required: Decimal,
    },

    /// Storage failed; nothing was committed.
    #[error("purchase transaction failed: {source}")]
    TransactionFailed {
        /// The underlying storage error.
        #[source]
        source: StoreError,
    },
}

impl PurchaseError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::GameNotFound { .. } => "game_not_found",
            Self::AccountNotFound { .. } => "account_not_found",
            Self::AlreadyOwned { .. } => "already_owned",
            Self::BaseGameRequired { .. } => "base_game_required",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::TransactionFailed { .. } => "transaction_failed",
        }
    }

    /// Check if the caller may retry the same purchase.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionFailed { .. })
    }
}

impl From<StoreError> for PurchaseError {
    fn from(source: StoreError) -> Self {
        Self::TransactionFailed { source }
    }
}
