//! Library (ownership) and wishlist records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{GameId, OwnershipId, UserId};

/// A permanent entitlement of a user to a game.
///
/// At most one record exists per `(user_id, game_id)`; stores enforce this
/// with a uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    /// Surrogate identifier.
    pub id: OwnershipId,

    /// The owner.
    pub user_id: UserId,

    /// The owned game.
    pub game_id: GameId,

    /// When the game was acquired.
    pub acquired_at: DateTime<Utc>,
}

impl OwnershipRecord {
    /// Create a record acquired now.
    #[must_use]
    pub fn new(user_id: UserId, game_id: GameId) -> Self {
        Self {
            id: OwnershipId::generate(),
            user_id,
            game_id,
            acquired_at: Utc::now(),
        }
    }
}

/// A user's marker that they want a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    /// The user.
    pub user_id: UserId,

    /// The wanted game.
    pub game_id: GameId,

    /// When the game was wishlisted.
    pub added_at: DateTime<Utc>,
}

impl WishlistEntry {
    /// Create an entry added now.
    #[must_use]
    pub fn new(user_id: UserId, game_id: GameId) -> Self {
        Self {
            user_id,
            game_id,
            added_at: Utc::now(),
        }
    }
}

/// Outcome of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// The library entry created by the purchase.
    pub ownership_id: OwnershipId,

    /// The purchased game.
    pub game_id: GameId,

    /// Amount debited. Zero for free acquisitions.
    pub charged: Decimal,

    /// Balance after the purchase committed.
    pub new_balance: Decimal,

    /// Whether a wishlist entry for the game was removed.
    pub wishlist_entry_removed: bool,
}
