//! The purchase transaction engine.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use storefront_core::{
    DomainError, Game, GameId, LedgerEntry, OwnershipRecord, PurchaseReceipt, UserId,
};
use storefront_store::schema::entity;
use storefront_store::{
    Catalog, LedgerStore, OwnershipStore, Store, StoreError, UnitOfWork, Wallet, WishlistStore,
};

use super::badges::{self, BadgeEvaluator};
use super::error::PurchaseError;
use crate::unit_of_work::{abandon, commit_detached};

/// Default limit for staging a purchase inside its unit of work.
pub const DEFAULT_PURCHASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Converts a purchase request into a committed library entry.
///
/// A purchase runs in two phases. Preconditions are first checked against
/// committed state and short-circuit without opening a unit of work. The
/// unit of work then locks the account, re-checks every precondition
/// against its own view and performs the balance, library, wishlist and
/// ledger writes, which commit together or not at all.
#[derive(Clone)]
pub struct PurchaseEngine {
    store: Arc<dyn Store>,
    badges: Arc<dyn BadgeEvaluator>,
    timeout: Duration,
}

impl PurchaseEngine {
    /// Create an engine over `store` that notifies `badges` after commits.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, badges: Arc<dyn BadgeEvaluator>) -> Self {
        Self {
            store,
            badges,
            timeout: DEFAULT_PURCHASE_TIMEOUT,
        }
    }

    /// Limit how long the unit of work may take before it is rolled back.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Purchase `game_id` for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns the first failed precondition, or `TransactionFailed` after a
    /// full rollback if storage fails. No error leaves partial writes behind.
    pub async fn purchase(
        &self,
        user_id: UserId,
        game_id: GameId,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        let result = self.execute(user_id, game_id).await;

        match &result {
            Ok(receipt) => {
                tracing::info!(
                    user_id = %user_id,
                    game_id = %game_id,
                    ownership_id = %receipt.ownership_id,
                    charged = %receipt.charged,
                    new_balance = %receipt.new_balance,
                    wishlist_entry_removed = receipt.wishlist_entry_removed,
                    "Purchase committed"
                );
                badges::spawn_evaluation(Arc::clone(&self.badges), user_id);
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    user_id = %user_id,
                    game_id = %game_id,
                    error = %e,
                    "Purchase transaction failed"
                );
            }
            Err(e) => {
                tracing::debug!(
                    user_id = %user_id,
                    game_id = %game_id,
                    code = e.code(),
                    "Purchase rejected"
                );
            }
        }

        result
    }

    async fn execute(
        &self,
        user_id: UserId,
        game_id: GameId,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        let game = self.check_preconditions(user_id, game_id).await?;

        let mut uow = self.store.begin().await?;
        let staged = tokio::time::timeout(self.timeout, stage(&mut *uow, user_id, &game)).await;

        let receipt = match staged {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                abandon(uow, self.timeout, e.code()).await;
                return Err(e);
            }
            Err(_) => {
                abandon(uow, self.timeout, "timeout").await;
                return Err(StoreError::TimedOut(self.timeout).into());
            }
        };

        commit_detached(uow).await?;
        Ok(receipt)
    }

    /// Check the preconditions in order against committed state.
    async fn check_preconditions(
        &self,
        user_id: UserId,
        game_id: GameId,
    ) -> Result<Game, PurchaseError> {
        let game = self
            .store
            .get_game(&game_id)
            .await?
            .ok_or(PurchaseError::GameNotFound { game_id })?;

        if self.store.owns(&user_id, &game_id).await? {
            return Err(PurchaseError::AlreadyOwned { game_id });
        }

        let price = game.effective_price();

        if let Some(base_game_id) = game.required_base_game() {
            if !self.store.owns(&user_id, &base_game_id).await? {
                return Err(PurchaseError::BaseGameRequired { base_game_id });
            }
        }

        if !game.is_free() {
            let account = self
                .store
                .get_account(&user_id)
                .await?
                .ok_or(PurchaseError::AccountNotFound { user_id })?;

            if !account.has_sufficient_funds(price) {
                return Err(PurchaseError::InsufficientFunds {
                    balance: account.balance,
                    required: price,
                });
            }
        }

        Ok(game)
    }
}

impl std::fmt::Debug for PurchaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseEngine")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Perform the purchase writes inside `uow`.
///
/// The account is loaded first so its row lock orders this unit of work
/// against the user's other purchases before anything is re-checked.
async fn stage(
    uow: &mut dyn UnitOfWork,
    user_id: UserId,
    game: &Game,
) -> Result<PurchaseReceipt, PurchaseError> {
    let price = game.effective_price();

    let mut account = uow
        .load_account(&user_id)
        .await?
        .ok_or(PurchaseError::AccountNotFound { user_id })?;

    if uow.owns(&user_id, &game.id).await? {
        return Err(PurchaseError::AlreadyOwned { game_id: game.id });
    }

    if let Some(base_game_id) = game.required_base_game() {
        if !uow.owns(&user_id, &base_game_id).await? {
            return Err(PurchaseError::BaseGameRequired { base_game_id });
        }
    }

    let charged = if game.is_free() {
        Decimal::ZERO
    } else {
        account.debit(price).map_err(|e| debit_error(e, price))?;
        uow.save_balance(&account).await?;
        price
    };

    let record = OwnershipRecord::new(user_id, game.id);
    match uow.insert_ownership(&record).await {
        Err(e) if e.is_already_exists(entity::OWNERSHIP) => {
            return Err(PurchaseError::AlreadyOwned { game_id: game.id });
        }
        result => result?,
    }

    let wishlist_entry_removed = uow.remove_wishlist_entry(&user_id, &game.id).await?;

    if !game.is_free() {
        let entry = LedgerEntry::purchase(user_id, game.id, price, &game.name);
        uow.append_ledger_entry(&entry).await?;
    }

    Ok(PurchaseReceipt {
        ownership_id: record.id,
        game_id: game.id,
        charged,
        new_balance: account.balance,
        wishlist_entry_removed,
    })
}

fn debit_error(err: DomainError, price: Decimal) -> PurchaseError {
    match err {
        DomainError::InsufficientFunds { balance, required } => {
            PurchaseError::InsufficientFunds { balance, required }
        }
        other => StoreError::InvalidData(format!("cannot debit {price}: {other}")).into(),
    }
}
