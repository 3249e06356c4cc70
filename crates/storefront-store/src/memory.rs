//! In-memory storage implementation.
//!
//! All state sits behind a single async mutex. A unit of work holds the
//! lock for its whole lifetime, so units of work are fully serialized. It
//! writes in place and records how to undo each write; the undo log is
//! replayed in reverse on rollback or when the unit of work is dropped
//! without committing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use storefront_core::{
    Account, Game, GameId, LedgerEntry, LedgerEntryId, OwnershipRecord, UserId, WishlistEntry,
};

use crate::error::{Result, StoreError};
use crate::schema::entity;
use crate::{
    Catalog, LedgerStore, OwnershipStore, Store, UnitOfWork, Wallet, WishlistStore,
};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<UserId, Account>,
    games: HashMap<GameId, Game>,
    library: HashMap<(UserId, GameId), OwnershipRecord>,
    wishlist: HashMap<(UserId, GameId), WishlistEntry>,
    ledger: HashMap<UserId, Vec<LedgerEntry>>,
    ledger_ids: HashSet<LedgerEntryId>,
}

impl State {
    fn require_account(&self, user_id: &UserId) -> Result<()> {
        if self.accounts.contains_key(user_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: entity::ACCOUNT,
                id: user_id.to_string(),
            })
        }
    }

    fn require_game(&self, game_id: &GameId) -> Result<()> {
        if self.games.contains_key(game_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: entity::GAME,
                id: game_id.to_string(),
            })
        }
    }

    fn insert_ownership(&mut self, record: &OwnershipRecord) -> Result<()> {
        self.require_account(&record.user_id)?;
        self.require_game(&record.game_id)?;

        let key = (record.user_id, record.game_id);
        if self.library.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                entity: entity::OWNERSHIP,
                id: format!("{}/{}", record.user_id, record.game_id),
            });
        }
        self.library.insert(key, record.clone());
        Ok(())
    }

    fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.require_account(&entry.user_id)?;
        if let Some(game_id) = &entry.game_id {
            self.require_game(game_id)?;
        }
        if !self.ledger_ids.insert(entry.id) {
            return Err(StoreError::AlreadyExists {
                entity: entity::LEDGER_ENTRY,
                id: entry.id.to_string(),
            });
        }
        self.ledger
            .entry(entry.user_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn undo(&mut self, change: Change) {
        match change {
            Change::Balance(previous) => {
                self.accounts.insert(previous.user_id, previous);
            }
            Change::OwnershipInserted(key) => {
                self.library.remove(&key);
            }
            Change::WishlistRemoved(entry) => {
                self.wishlist.insert((entry.user_id, entry.game_id), entry);
            }
            Change::LedgerAppended(user_id) => {
                if let Some(entry) = self.ledger.get_mut(&user_id).and_then(Vec::pop) {
                    self.ledger_ids.remove(&entry.id);
                }
            }
        }
    }
}

/// A write made by a unit of work, with what is needed to revert it.
#[derive(Debug)]
enum Change {
    Balance(Account),
    OwnershipInserted((UserId, GameId)),
    WishlistRemoved(WishlistEntry),
    LedgerAppended(UserId),
}

/// In-process storage backend.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Unit of work over a [`MemoryStore`].
struct MemoryUnitOfWork {
    state: OwnedMutexGuard<State>,
    changes: Vec<Change>,
}

impl MemoryUnitOfWork {
    fn revert(&mut self) {
        while let Some(change) = self.changes.pop() {
            self.state.undo(change);
        }
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        self.revert();
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn get_game(&self, game_id: &GameId) -> Result<Option<Game>> {
        Ok(self.state.lock().await.games.get(game_id).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let state = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            state,
            changes: Vec::new(),
        }))
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(user_id).cloned())
    }

    async fn owns(&self, user_id: &UserId, game_id: &GameId) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .await
            .library
            .contains_key(&(*user_id, *game_id)))
    }

    async fn wishlist_contains(&self, user_id: &UserId, game_id: &GameId) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .await
            .wishlist
            .contains_key(&(*user_id, *game_id)))
    }

    async fn list_library(&self, user_id: &UserId) -> Result<Vec<OwnershipRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<_> = state
            .library
            .values()
            .filter(|r| r.user_id == *user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.acquired_at);
        Ok(records)
    }

    async fn list_ledger(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        let Some(entries) = state.ledger.get(user_id) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<_> = entries.iter().collect();
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(entries
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    // =========================================================================
    // Provisioning Operations
    // =========================================================================

    async fn put_game(&self, game: &Game) -> Result<()> {
        game.validate()
            .map_err(|e| StoreError::Constraint(e.to_string()))?;

        let mut state = self.state.lock().await;
        if let Some(base_id) = game.required_base_game() {
            match state.games.get(&base_id) {
                Some(base) if !base.is_dlc => {}
                Some(_) => {
                    return Err(StoreError::Constraint(format!(
                        "base game {base_id} of {} is itself a DLC",
                        game.id
                    )))
                }
                None => {
                    return Err(StoreError::Constraint(format!(
                        "base game {base_id} of {} does not exist",
                        game.id
                    )))
                }
            }
        }
        if game.is_dlc
            && state
                .games
                .values()
                .any(|g| g.base_game_id == Some(game.id))
        {
            return Err(StoreError::Constraint(format!(
                "{} is the base game of existing DLC and cannot become a DLC",
                game.id
            )));
        }
        state.games.insert(game.id, game.clone());
        Ok(())
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        if account.balance < Decimal::ZERO {
            return Err(StoreError::Constraint(format!(
                "opening balance {} is negative",
                account.balance
            )));
        }

        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&account.user_id) {
            return Err(StoreError::AlreadyExists {
                entity: entity::ACCOUNT,
                id: account.user_id.to_string(),
            });
        }
        state.accounts.insert(account.user_id, account.clone());
        Ok(())
    }

    async fn add_wishlist_entry(&self, entry: &WishlistEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        state.require_account(&entry.user_id)?;
        state.require_game(&entry.game_id)?;
        state
            .wishlist
            .entry((entry.user_id, entry.game_id))
            .or_insert_with(|| entry.clone());
        Ok(())
    }

    async fn grant_ownership(&self, record: &OwnershipRecord) -> Result<()> {
        self.state.lock().await.insert_ownership(record)
    }
}

#[async_trait]
impl Wallet for MemoryUnitOfWork {
    async fn load_account(&mut self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self.state.accounts.get(user_id).cloned())
    }

    async fn save_balance(&mut self, account: &Account) -> Result<()> {
        if account.balance < Decimal::ZERO {
            return Err(StoreError::Constraint(format!(
                "balance of {} would become {}",
                account.user_id, account.balance
            )));
        }

        let stored = self
            .state
            .accounts
            .get_mut(&account.user_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: entity::ACCOUNT,
                id: account.user_id.to_string(),
            })?;
        let previous = stored.clone();
        stored.balance = account.balance;
        stored.updated_at = Utc::now();
        self.changes.push(Change::Balance(previous));
        Ok(())
    }
}

#[async_trait]
impl OwnershipStore for MemoryUnitOfWork {
    async fn owns(&mut self, user_id: &UserId, game_id: &GameId) -> Result<bool> {
        Ok(self.state.library.contains_key(&(*user_id, *game_id)))
    }

    async fn insert_ownership(&mut self, record: &OwnershipRecord) -> Result<()> {
        self.state.insert_ownership(record)?;
        self.changes
            .push(Change::OwnershipInserted((record.user_id, record.game_id)));
        Ok(())
    }
}

#[async_trait]
impl WishlistStore for MemoryUnitOfWork {
    async fn has_wishlist_entry(&mut self, user_id: &UserId, game_id: &GameId) -> Result<bool> {
        Ok(self.state.wishlist.contains_key(&(*user_id, *game_id)))
    }

    async fn remove_wishlist_entry(
        &mut self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> Result<bool> {
        match self.state.wishlist.remove(&(*user_id, *game_id)) {
            Some(entry) => {
                self.changes.push(Change::WishlistRemoved(entry));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryUnitOfWork {
    async fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.state.append_ledger_entry(entry)?;
        self.changes.push(Change::LedgerAppended(entry.user_id));
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let mut uow = self;
        uow.changes.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut uow = self;
        uow.revert();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn seeded_store() -> (MemoryStore, UserId, Game) {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store
            .create_account(&Account::with_balance(user_id, dec!(1000)))
            .await
            .unwrap();
        let game = Game::new("Hollow Depths", dec!(800));
        store.put_game(&game).await.unwrap();
        (store, user_id, game)
    }

    #[tokio::test]
    async fn account_create_and_read() {
        let (store, user_id, _) = seeded_store().await;

        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.balance, dec!(1000));

        let duplicate = store.create_account(&Account::new(user_id)).await;
        assert!(matches!(
            duplicate,
            Err(StoreError::AlreadyExists { entity: "account", .. })
        ));
    }

    #[tokio::test]
    async fn committed_writes_become_visible_together() {
        let (store, user_id, game) = seeded_store().await;

        let mut uow = store.begin().await.unwrap();
        let mut account = uow.load_account(&user_id).await.unwrap().unwrap();
        account.debit(dec!(800)).unwrap();
        uow.save_balance(&account).await.unwrap();
        uow.insert_ownership(&OwnershipRecord::new(user_id, game.id))
            .await
            .unwrap();
        uow.append_ledger_entry(&LedgerEntry::purchase(user_id, game.id, dec!(800), &game.name))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(
            store.get_account(&user_id).await.unwrap().unwrap().balance,
            dec!(200)
        );
        assert!(store.owns(&user_id, &game.id).await.unwrap());
        assert_eq!(store.list_ledger(&user_id, 10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rollback_discards_everything() {
        let (store, user_id, game) = seeded_store().await;
        store
            .add_wishlist_entry(&WishlistEntry::new(user_id, game.id))
            .await
            .unwrap();

        let mut uow = store.begin().await.unwrap();
        let mut account = uow.load_account(&user_id).await.unwrap().unwrap();
        account.debit(dec!(800)).unwrap();
        uow.save_balance(&account).await.unwrap();
        uow.insert_ownership(&OwnershipRecord::new(user_id, game.id))
            .await
            .unwrap();
        assert!(uow.remove_wishlist_entry(&user_id, &game.id).await.unwrap());
        uow.rollback().await.unwrap();

        assert_eq!(
            store.get_account(&user_id).await.unwrap().unwrap().balance,
            dec!(1000)
        );
        assert!(!store.owns(&user_id, &game.id).await.unwrap());
        assert!(store.wishlist_contains(&user_id, &game.id).await.unwrap());
    }

    #[tokio::test]
    async fn dropped_unit_of_work_discards_writes() {
        let (store, user_id, game) = seeded_store().await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_ownership(&OwnershipRecord::new(user_id, game.id))
                .await
                .unwrap();
        }

        assert!(!store.owns(&user_id, &game.id).await.unwrap());
    }

    #[tokio::test]
    async fn ownership_is_unique_per_user_and_game() {
        let (store, user_id, game) = seeded_store().await;
        store
            .grant_ownership(&OwnershipRecord::new(user_id, game.id))
            .await
            .unwrap();

        let mut uow = store.begin().await.unwrap();
        let err = uow
            .insert_ownership(&OwnershipRecord::new(user_id, game.id))
            .await
            .unwrap_err();
        assert!(err.is_already_exists(entity::OWNERSHIP));
    }

    #[tokio::test]
    async fn negative_balance_is_rejected() {
        let (store, user_id, _) = seeded_store().await;

        let mut uow = store.begin().await.unwrap();
        let mut account = uow.load_account(&user_id).await.unwrap().unwrap();
        account.balance = dec!(-1);
        let err = uow.save_balance(&account).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn removing_missing_wishlist_entry_is_not_an_error() {
        let (store, user_id, game) = seeded_store().await;

        let mut uow = store.begin().await.unwrap();
        assert!(!uow.has_wishlist_entry(&user_id, &game.id).await.unwrap());
        assert!(!uow.remove_wishlist_entry(&user_id, &game.id).await.unwrap());
    }

    #[tokio::test]
    async fn dlc_requires_existing_base_game() {
        let store = MemoryStore::new();
        let missing_base = GameId::generate();
        let dlc = Game::dlc("Expansion", dec!(5), missing_base);
        assert!(matches!(
            store.put_game(&dlc).await,
            Err(StoreError::Constraint(_))
        ));

        let base = Game::new("Base", dec!(10));
        store.put_game(&base).await.unwrap();
        let dlc = Game::dlc("Expansion", dec!(5), base.id);
        store.put_game(&dlc).await.unwrap();

        let nested = Game::dlc("Expansion of expansion", dec!(1), dlc.id);
        assert!(matches!(
            store.put_game(&nested).await,
            Err(StoreError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn ledger_lists_newest_first_with_pagination() {
        let (store, user_id, game) = seeded_store().await;

        let mut uow = store.begin().await.unwrap();
        let first = LedgerEntry::top_up(user_id, dec!(10), Some("first".into())).unwrap();
        uow.append_ledger_entry(&first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = LedgerEntry::purchase(user_id, game.id, dec!(800), &game.name);
        uow.append_ledger_entry(&second).await.unwrap();
        uow.commit().await.unwrap();

        let all = store.list_ledger(&user_id, 10, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        let page2 = store.list_ledger(&user_id, 1, 1).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].id, first.id);
    }

    #[tokio::test]
    async fn rolled_back_ledger_entry_can_be_appended_again() {
        let (store, user_id, _) = seeded_store().await;
        let entry = LedgerEntry::top_up(user_id, dec!(10), None).unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.append_ledger_entry(&entry).await.unwrap();
        let err = uow.append_ledger_entry(&entry).await.unwrap_err();
        assert!(err.is_already_exists(entity::LEDGER_ENTRY));
        uow.rollback().await.unwrap();
        assert!(store.list_ledger(&user_id, 10, 0).await.unwrap().is_empty());

        let mut uow = store.begin().await.unwrap();
        uow.append_ledger_entry(&entry).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let err = uow.append_ledger_entry(&entry).await.unwrap_err();
        assert!(err.is_already_exists(entity::LEDGER_ENTRY));
        drop(uow);

        assert_eq!(store.list_ledger(&user_id, 10, 0).await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn rollback_leaves_other_users_untouched() {
        let (store, user_id, game) = seeded_store().await;
        let other = UserId::generate();
        store
            .create_account(&Account::with_balance(other, dec!(5)))
            .await
            .unwrap();

        let mut uow = store.begin().await.unwrap();
        let mut account = uow.load_account(&other).await.unwrap().unwrap();
        account.credit(dec!(5)).unwrap();
        uow.save_balance(&account).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let mut account = uow.load_account(&user_id).await.unwrap().unwrap();
        account.debit(dec!(800)).unwrap();
        uow.save_balance(&account).await.unwrap();
        uow.insert_ownership(&OwnershipRecord::new(user_id, game.id))
            .await
            .unwrap();
        uow.append_ledger_entry(&LedgerEntry::purchase(user_id, game.id, dec!(800), &game.name))
            .await
            .unwrap();
        drop(uow);

        assert_eq!(
            store.get_account(&user_id).await.unwrap().unwrap().balance,
            dec!(1000)
        );
        assert_eq!(
            store.get_account(&other).await.unwrap().unwrap().balance,
            dec!(10)
        );
        assert!(store.list_ledger(&user_id, 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn base_game_with_dlc_cannot_become_dlc() {
        let (store, _, base) = seeded_store().await;
        let other = Game::new("Neon Drift", dec!(20));
        store.put_game(&other).await.unwrap();
        store
            .put_game(&Game::dlc("Hollow Depths: Abyss", dec!(10), base.id))
            .await
            .unwrap();

        let mut demoted = base.clone();
        demoted.is_dlc = true;
        demoted.base_game_id = Some(other.id);
        assert!(matches!(
            store.put_game(&demoted).await,
            Err(StoreError::Constraint(_))
        ));
        assert!(!store.get_game(&base.id).await.unwrap().unwrap().is_dlc);

        let mut renamed = base.clone();
        renamed.name = "Hollow Depths: Remastered".into();
        store.put_game(&renamed).await.unwrap();
    }
}
