//! Storefront HTTP client implementation.

use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use std::time::Duration;

use storefront_core::{GameId, UserId};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BalanceResponse, LedgerPage, LibraryResponse, PurchaseReceipt,
    PurchaseRequest, TopUpRequest, TopUpResponse,
};

/// Storefront purchase service client.
///
/// Provides methods for buying games, topping up wallets, and reading
/// libraries and ledger history.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl StorefrontClient {
    /// Create a new storefront client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the purchase service (e.g., `"http://storefront:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new storefront client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base URL is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    /// Buy a game for a user.
    ///
    /// # Errors
    ///
    /// Returns a typed error for each business rejection, or
    /// [`ClientError::TransactionFailed`] when the service rolled back and the
    /// purchase may be retried.
    pub async fn purchase(
        &self,
        user_id: UserId,
        game_id: GameId,
    ) -> Result<PurchaseReceipt, ClientError> {
        let url = format!("{}/v1/purchases", self.base_url);
        let request = PurchaseRequest { user_id, game_id };

        let response = self.authorized(self.client.post(&url)).json(&request).send().await?;

        self.handle_response(response).await
    }

    /// Get a user's wallet balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn balance(&self, user_id: UserId) -> Result<BalanceResponse, ClientError> {
        let url = format!("{}/v1/users/{user_id}/balance", self.base_url);

        let response = self.authorized(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Add funds to a user's wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn top_up(
        &self,
        user_id: UserId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TopUpResponse, ClientError> {
        let url = format!("{}/v1/users/{user_id}/top-up", self.base_url);
        let request = TopUpRequest {
            amount,
            description,
        };

        let response = self.authorized(self.client.post(&url)).json(&request).send().await?;

        self.handle_response(response).await
    }

    /// List the games a user owns.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn library(&self, user_id: UserId) -> Result<LibraryResponse, ClientError> {
        let url = format!("{}/v1/users/{user_id}/library", self.base_url);

        let response = self.authorized(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Get one page of a user's ledger history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn ledger(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<LedgerPage, ClientError> {
        let url = format!("{}/v1/users/{user_id}/ledger", self.base_url);

        let response = self
            .authorized(self.client.get(&url))
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        let Ok(api_error) = error_body else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };

        let code = api_error.error.code.as_str();
        let message = api_error.error.message;
        tracing::debug!(status = status.as_u16(), code, "Storefront request rejected");

        match code {
            "game_not_found" => Err(ClientError::GameNotFound { message }),
            "account_not_found" => Err(ClientError::AccountNotFound { message }),
            "already_owned" => Err(ClientError::AlreadyOwned { message }),
            "base_game_required" => Err(ClientError::BaseGameRequired { message }),
            "transaction_failed" => Err(ClientError::TransactionFailed { message }),
            "insufficient_funds" => {
                let detail = |key: &str| {
                    api_error
                        .error
                        .details
                        .as_ref()
                        .and_then(|d| d.get(key))
                        .and_then(|v| serde_json::from_value::<Decimal>(v.clone()).ok())
                        .unwrap_or_default()
                };

                Err(ClientError::InsufficientFunds {
                    balance: detail("balance"),
                    required: detail("required"),
                })
            }
            _ => Err(ClientError::Api {
                code: code.to_string(),
                message,
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}
