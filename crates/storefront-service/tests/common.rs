//! Common test utilities for storefront integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use storefront_core::{
    Account, Game, GameId, LedgerEntry, OwnershipRecord, UserId, WishlistEntry,
};
use storefront_service::{
    create_router, AppState, BadgeError, BadgeEvaluator, NoopBadgeEvaluator, PurchaseEngine,
    ServiceConfig,
};
use storefront_store::{
    Catalog, LedgerStore, MemoryStore, OwnershipStore, Result as StoreResult, Store, StoreError,
    UnitOfWork, Wallet, WishlistStore,
};

// ============================================================================
// HTTP Harness
// ============================================================================

/// Test harness containing everything needed for HTTP integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing store, for seeding and inspecting state.
    pub store: Arc<MemoryStore>,
    /// A test user with an account.
    pub test_user_id: UserId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh store and a test account.
    pub async fn new(balance: Decimal) -> Self {
        let store = Arc::new(MemoryStore::new());
        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            service_api_key: Some(service_api_key.clone()),
            ..ServiceConfig::default()
        };

        let state =
            AppState::with_badge_evaluator(store.clone(), config, Arc::new(NoopBadgeEvaluator));
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        let test_user_id = UserId::generate();
        store
            .create_account(&Account::with_balance(test_user_id, balance))
            .await
            .expect("Failed to create test account");

        Self {
            server,
            store,
            test_user_id,
            service_api_key,
        }
    }

    /// Add a game to the catalog.
    pub async fn add_game(&self, game: Game) -> Game {
        self.store.put_game(&game).await.expect("Failed to add game");
        game
    }
}

// ============================================================================
// Engine Fixtures
// ============================================================================

/// A funded user and a store to buy from.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub user_id: UserId,
}

impl Fixture {
    /// Create a store with one account holding `balance`.
    pub async fn new(balance: Decimal) -> Self {
        let store = Arc::new(MemoryStore::new());
        let user_id = UserId::generate();
        store
            .create_account(&Account::with_balance(user_id, balance))
            .await
            .expect("Failed to create account");
        Self { store, user_id }
    }

    /// Engine over the fixture store with a no-op badge evaluator.
    pub fn engine(&self) -> PurchaseEngine {
        PurchaseEngine::new(self.store.clone(), Arc::new(NoopBadgeEvaluator))
    }

    /// Add a game to the catalog.
    pub async fn add_game(&self, game: Game) -> Game {
        self.store.put_game(&game).await.expect("Failed to add game");
        game
    }

    /// Put a game on the user's wishlist.
    pub async fn wishlist(&self, game_id: GameId) {
        self.store
            .add_wishlist_entry(&WishlistEntry::new(self.user_id, game_id))
            .await
            .expect("Failed to add wishlist entry");
    }

    /// Grant a game without payment.
    pub async fn grant(&self, game_id: GameId) {
        self.store
            .grant_ownership(&OwnershipRecord::new(self.user_id, game_id))
            .await
            .expect("Failed to grant ownership");
    }

    /// Capture everything a purchase may touch for this user.
    pub async fn snapshot(&self, game_id: GameId) -> Snapshot {
        let account = self
            .store
            .get_account(&self.user_id)
            .await
            .expect("Failed to read account")
            .expect("Account missing");
        Snapshot {
            balance: account.balance,
            library: self.store.list_library(&self.user_id).await.expect("library"),
            wishlisted: self
                .store
                .wishlist_contains(&self.user_id, &game_id)
                .await
                .expect("wishlist"),
            ledger: self
                .store
                .list_ledger(&self.user_id, 1000, 0)
                .await
                .expect("ledger"),
        }
    }
}

/// Observable state of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub balance: Decimal,
    pub library: Vec<OwnershipRecord>,
    pub wishlisted: bool,
    pub ledger: Vec<LedgerEntry>,
}

// ============================================================================
// Badge Evaluators
// ============================================================================

/// Badge evaluator that reports each call on a channel.
pub struct RecordingBadgeEvaluator {
    calls: mpsc::UnboundedSender<UserId>,
    fail: bool,
}

impl RecordingBadgeEvaluator {
    /// Create an evaluator that succeeds.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<UserId>) {
        Self::build(false)
    }

    /// Create an evaluator that records the call and then fails.
    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<UserId>) {
        Self::build(true)
    }

    fn build(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<UserId>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { calls, fail }), rx)
    }
}

#[async_trait]
impl BadgeEvaluator for RecordingBadgeEvaluator {
    async fn evaluate_and_award(&self, user_id: UserId) -> Result<(), BadgeError> {
        let _ = self.calls.send(user_id);
        if self.fail {
            return Err(BadgeError::Evaluation("badge rules unavailable".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Fault Injection
// ============================================================================

/// A failure to inject into units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Appending to the ledger fails.
    LedgerAppend,
    /// Appending to the ledger never finishes.
    LedgerAppendHangs,
    /// Commit fails without applying anything.
    Commit,
    /// Every ownership check answers "not owned", as if a concurrent
    /// purchase committed right after it was read.
    StaleOwnershipCheck,
}

/// A [`MemoryStore`] wrapper that injects one [`Fault`].
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>, fault: Fault) -> Arc<Self> {
        Arc::new(Self { inner, fault })
    }
}

#[async_trait]
impl Catalog for FaultyStore {
    async fn get_game(&self, game_id: &GameId) -> StoreResult<Option<Game>> {
        self.inner.get_game(game_id).await
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyUnitOfWork {
            inner,
            fault: self.fault,
        }))
    }

    async fn get_account(&self, user_id: &UserId) -> StoreResult<Option<Account>> {
        self.inner.get_account(user_id).await
    }

    async fn owns(&self, user_id: &UserId, game_id: &GameId) -> StoreResult<bool> {
        if self.fault == Fault::StaleOwnershipCheck {
            return Ok(false);
        }
        Store::owns(self.inner.as_ref(), user_id, game_id).await
    }

    async fn wishlist_contains(&self, user_id: &UserId, game_id: &GameId) -> StoreResult<bool> {
        self.inner.wishlist_contains(user_id, game_id).await
    }

    async fn list_library(&self, user_id: &UserId) -> StoreResult<Vec<OwnershipRecord>> {
        self.inner.list_library(user_id).await
    }

    async fn list_ledger(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<LedgerEntry>> {
        self.inner.list_ledger(user_id, limit, offset).await
    }

    async fn put_game(&self, game: &Game) -> StoreResult<()> {
        self.inner.put_game(game).await
    }

    async fn create_account(&self, account: &Account) -> StoreResult<()> {
        self.inner.create_account(account).await
    }

    async fn add_wishlist_entry(&self, entry: &WishlistEntry) -> StoreResult<()> {
        self.inner.add_wishlist_entry(entry).await
    }

    async fn grant_ownership(&self, record: &OwnershipRecord) -> StoreResult<()> {
        self.inner.grant_ownership(record).await
    }
}

struct FaultyUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    fault: Fault,
}

#[async_trait]
impl Wallet for FaultyUnitOfWork {
    async fn load_account(&mut self, user_id: &UserId) -> StoreResult<Option<Account>> {
        self.inner.load_account(user_id).await
    }

    async fn save_balance(&mut self, account: &Account) -> StoreResult<()> {
        self.inner.save_balance(account).await
    }
}

#[async_trait]
impl OwnershipStore for FaultyUnitOfWork {
    async fn owns(&mut self, user_id: &UserId, game_id: &GameId) -> StoreResult<bool> {
        if self.fault == Fault::StaleOwnershipCheck {
            return Ok(false);
        }
        self.inner.owns(user_id, game_id).await
    }

    async fn insert_ownership(&mut self, record: &OwnershipRecord) -> StoreResult<()> {
        self.inner.insert_ownership(record).await
    }
}

#[async_trait]
impl WishlistStore for FaultyUnitOfWork {
    async fn has_wishlist_entry(&mut self, user_id: &UserId, game_id: &GameId) -> StoreResult<bool> {
        self.inner.has_wishlist_entry(user_id, game_id).await
    }

    async fn remove_wishlist_entry(
        &mut self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> StoreResult<bool> {
        self.inner.remove_wishlist_entry(user_id, game_id).await
    }
}

#[async_trait]
impl LedgerStore for FaultyUnitOfWork {
    async fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        match self.fault {
            Fault::LedgerAppend => Err(StoreError::Database("ledger disk full".into())),
            Fault::LedgerAppendHangs => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                self.inner.append_ledger_entry(entry).await
            }
            _ => self.inner.append_ledger_entry(entry).await,
        }
    }
}

#[async_trait]
impl UnitOfWork for FaultyUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.fault == Fault::Commit {
            return Err(StoreError::Database("connection reset during commit".into()));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.rollback().await
    }
}
