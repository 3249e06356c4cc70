//! Game purchases.
//!
//! [`PurchaseEngine::purchase`] turns a `(user, game)` pair into a permanent
//! library entry. For a paid game it also debits the wallet and appends a
//! ledger entry, and it removes the game from the user's wishlist. All of
//! these writes are made in one unit of work.

pub mod badges;
pub mod engine;
pub mod error;

pub use badges::{BadgeError, BadgeEvaluator, NoopBadgeEvaluator, WebhookBadgeEvaluator};
pub use engine::{PurchaseEngine, DEFAULT_PURCHASE_TIMEOUT};
pub use error::PurchaseError;
