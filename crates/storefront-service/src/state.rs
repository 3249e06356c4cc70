//! Application state.

use std::sync::Arc;

use storefront_store::Store;

use crate::config::ServiceConfig;
use crate::purchase::{BadgeEvaluator, NoopBadgeEvaluator, PurchaseEngine, WebhookBadgeEvaluator};
use crate::wallet::WalletService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend, for read-side queries.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// The purchase engine.
    pub purchases: PurchaseEngine,

    /// Wallet top-ups.
    pub wallet: WalletService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Badge evaluation goes to `BADGE_WEBHOOK_URL` when configured.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let badges: Arc<dyn BadgeEvaluator> = match config.badge_webhook_url.as_deref() {
            Some(url) => match WebhookBadgeEvaluator::new(url) {
                Ok(evaluator) => {
                    tracing::info!(badge_url = %url, "Badge webhook enabled");
                    Arc::new(evaluator)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create badge webhook client");
                    Arc::new(NoopBadgeEvaluator)
                }
            },
            None => {
                tracing::warn!("Badge webhook not configured - badges will not be evaluated");
                Arc::new(NoopBadgeEvaluator)
            }
        };

        Self::with_badge_evaluator(store, config, badges)
    }

    /// Create a new application state with an explicit badge evaluator.
    #[must_use]
    pub fn with_badge_evaluator(
        store: Arc<dyn Store>,
        config: ServiceConfig,
        badges: Arc<dyn BadgeEvaluator>,
    ) -> Self {
        let timeout = config.purchase_timeout();
        let purchases = PurchaseEngine::new(Arc::clone(&store), badges).with_timeout(timeout);
        let wallet = WalletService::new(Arc::clone(&store)).with_timeout(timeout);

        Self {
            store,
            config,
            purchases,
            wallet,
        }
    }
}
