//! Badge evaluation collaborator.
//!
//! Badge rules live outside the purchase engine. After a purchase commits,
//! the engine asks a [`BadgeEvaluator`] to re-evaluate the buyer on a
//! detached task; failures are logged and never reach the buyer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;

use storefront_core::UserId;

/// Timeout for badge webhook requests.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from badge evaluation.
#[derive(Debug, thiserror::Error)]
pub enum BadgeError {
    /// HTTP request failed.
    #[error("badge request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The badge service answered with a non-success status.
    #[error("badge service returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Evaluation failed for another reason.
    #[error("badge evaluation failed: {0}")]
    Evaluation(String),
}

/// Evaluates and awards badges for a user.
#[async_trait]
pub trait BadgeEvaluator: Send + Sync {
    /// Re-evaluate the user's badges.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation could not be completed.
    async fn evaluate_and_award(&self, user_id: UserId) -> Result<(), BadgeError>;
}

/// Evaluator that does nothing. Used when no badge service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBadgeEvaluator;

#[async_trait]
impl BadgeEvaluator for NoopBadgeEvaluator {
    async fn evaluate_and_award(&self, _user_id: UserId) -> Result<(), BadgeError> {
        Ok(())
    }
}

/// Body posted to the badge webhook.
#[derive(Debug, Serialize)]
struct BadgeRequest {
    user_id: UserId,
}

/// Evaluator that POSTs `{"user_id": ...}` to a badge service.
#[derive(Debug, Clone)]
pub struct WebhookBadgeEvaluator {
    client: Client,
    url: String,
}

impl WebhookBadgeEvaluator {
    /// Create an evaluator posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, BadgeError> {
        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl BadgeEvaluator for WebhookBadgeEvaluator {
    async fn evaluate_and_award(&self, user_id: UserId) -> Result<(), BadgeError> {
        let response = self
            .client
            .post(&self.url)
            .json(&BadgeRequest { user_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BadgeError::Status {
                status: status.as_u16(),
            });
        }

        tracing::debug!(user_id = %user_id, "Badge evaluation requested");
        Ok(())
    }
}

/// Run badge evaluation for `user_id` on a detached task.
///
/// The returned handle may be ignored; errors are logged by the task.
pub fn spawn_evaluation(evaluator: Arc<dyn BadgeEvaluator>, user_id: UserId) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = evaluator.evaluate_and_award(user_id).await {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Badge evaluation failed"
            );
        }
    })
}
