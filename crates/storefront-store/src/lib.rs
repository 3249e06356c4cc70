//! Storage layer for the storefront purchase engine.
//!
//! This crate provides durable storage for wallets, the game catalog, the
//! library (ownership records), wishlists and the payment ledger.
//!
//! # Architecture
//!
//! Reads that need no isolation go through [`Store`] directly. Everything
//! that moves money or grants ownership goes through a [`UnitOfWork`]
//! obtained from [`Store::begin`]: its writes become visible together on
//! [`UnitOfWork::commit`] or not at all.
//!
//! Two backends are provided:
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`, with row locks on the account and a
//!   unique index on `(user_id, game_id)` in the library.
//! - [`MemoryStore`]: in-process, serializable, for tests and local runs.
//!
//! # Example
//!
//! ```no_run
//! use storefront_store::{MemoryStore, Store, UnitOfWork, Wallet};
//! use storefront_core::{Account, Game, UserId, Decimal};
//!
//! # async fn example() -> storefront_store::Result<()> {
//! let store = MemoryStore::new();
//!
//! let user_id = UserId::generate();
//! store.create_account(&Account::with_balance(user_id, Decimal::from(1000))).await?;
//!
//! let game = Game::new("Hollow Depths", Decimal::from(800));
//! store.put_game(&game).await?;
//!
//! let mut uow = store.begin().await?;
//! let account = uow.load_account(&user_id).await?;
//! assert!(account.is_some());
//! uow.rollback().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::{IsolationLevel, PgStore};

use async_trait::async_trait;
use storefront_core::{
    Account, Game, GameId, LedgerEntry, OwnershipRecord, UserId, WishlistEntry,
};

/// Read-only access to catalog metadata.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Get a game by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_game(&self, game_id: &GameId) -> Result<Option<Game>>;
}

/// Transaction-scoped access to a user's wallet balance.
///
/// The balance is only changed by loading the account, modifying the loaded
/// value and saving it back within the same unit of work.
#[async_trait]
pub trait Wallet: Send {
    /// Load the account and lock it for the rest of the unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn load_account(&mut self, user_id: &UserId) -> Result<Option<Account>>;

    /// Persist the balance of an account loaded by this unit of work.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account does not exist.
    /// - `StoreError::Constraint` if the balance is negative.
    async fn save_balance(&mut self, account: &Account) -> Result<()>;
}

/// Transaction-scoped access to the library.
#[async_trait]
pub trait OwnershipStore: Send {
    /// Check whether the user owns the game.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn owns(&mut self, user_id: &UserId, game_id: &GameId) -> Result<bool>;

    /// Insert a library entry.
    ///
    /// This is the authoritative arbiter of "first purchase wins".
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` with entity `"ownership"` if the
    /// user already owns the game, including when a concurrent unit of work
    /// committed that record first.
    async fn insert_ownership(&mut self, record: &OwnershipRecord) -> Result<()>;
}

/// Transaction-scoped access to wishlists.
#[async_trait]
pub trait WishlistStore: Send {
    /// Check whether the game is on the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn has_wishlist_entry(&mut self, user_id: &UserId, game_id: &GameId) -> Result<bool>;

    /// Remove the wishlist entry if present. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails. A missing entry is
    /// not an error.
    async fn remove_wishlist_entry(&mut self, user_id: &UserId, game_id: &GameId)
        -> Result<bool>;
}

/// Transaction-scoped append access to the payment ledger.
#[async_trait]
pub trait LedgerStore: Send {
    /// Append an entry. Entries are never updated or deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()>;
}

/// An atomic unit of work over wallets, library, wishlists and ledger.
///
/// Dropping a unit of work without committing discards all of its writes.
#[async_trait]
pub trait UnitOfWork: Wallet + OwnershipStore + WishlistStore + LedgerStore {
    /// Make every write of this unit of work visible at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing was applied in that case.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every write of this unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend could not confirm the rollback.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (PostgreSQL, in-memory).
#[async_trait]
pub trait Store: Catalog {
    /// Open a unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a transaction.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Check whether the user owns the game, outside any unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn owns(&self, user_id: &UserId, game_id: &GameId) -> Result<bool>;

    /// Check whether the game is on the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn wishlist_contains(&self, user_id: &UserId, game_id: &GameId) -> Result<bool>;

    /// List a user's library, oldest acquisition first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_library(&self, user_id: &UserId) -> Result<Vec<OwnershipRecord>>;

    /// List ledger entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_ledger(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    // =========================================================================
    // Provisioning Operations
    // =========================================================================

    /// Insert or replace a catalog game.
    ///
    /// # Errors
    ///
    /// - `StoreError::Constraint` if the game is invalid or its base game is
    ///   missing or itself a DLC.
    async fn put_game(&self, game: &Game) -> Result<()>;

    /// Create an account.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyExists` if the account exists.
    /// - `StoreError::Constraint` if the opening balance is negative.
    async fn create_account(&self, account: &Account) -> Result<()>;

    /// Add a game to a user's wishlist. Adding twice is a no-op.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account or game does not exist.
    async fn add_wishlist_entry(&self, entry: &WishlistEntry) -> Result<()>;

    /// Grant ownership without a payment.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyExists` if the user already owns the game.
    /// - `StoreError::NotFound` if the account or game does not exist.
    async fn grant_ownership(&self, record: &OwnershipRecord) -> Result<()>;
}
