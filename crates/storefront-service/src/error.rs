//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

use storefront_core::DomainError;
use storefront_store::StoreError;

use crate::purchase::PurchaseError;
use crate::wallet::WalletError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("{message}")]
    NotFound {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Conflict with the current state of the user's library.
    #[error("{message}")]
    Conflict {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Insufficient funds.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: Decimal,
        /// Required amount.
        required: Decimal,
    },

    /// A transaction failed and was rolled back; the request may be retried.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, *code, message.clone(), None)
            }
            Self::Conflict { code, message } => {
                (StatusCode::CONFLICT, *code, message.clone(), None)
            }
            Self::InsufficientFunds { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::TransactionFailed(msg) => {
                tracing::warn!(error = %msg, "Transaction failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "transaction_failed",
                    "The transaction could not be completed; it is safe to retry".to_string(),
                    Some(serde_json::json!({ "retryable": true })),
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        let code = err.code();
        match err {
            PurchaseError::GameNotFound { .. } | PurchaseError::AccountNotFound { .. } => {
                Self::NotFound {
                    code,
                    message: err.to_string(),
                }
            }
            PurchaseError::AlreadyOwned { .. } | PurchaseError::BaseGameRequired { .. } => {
                Self::Conflict {
                    code,
                    message: err.to_string(),
                }
            }
            PurchaseError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            PurchaseError::TransactionFailed { source } => {
                Self::TransactionFailed(source.to_string())
            }
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InvalidAmount(msg) => Self::BadRequest(msg),
            WalletError::AccountNotFound { .. } => Self::NotFound {
                code: "account_not_found",
                message: err.to_string(),
            },
            WalletError::TransactionFailed { source } => {
                Self::TransactionFailed(source.to_string())
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            DomainError::InvalidAmount(_)
            | DomainError::InvalidGame(_)
            | DomainError::InvalidId(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound {
                code: "not_found",
                message: err.to_string(),
            },
            StoreError::TimedOut(_) => Self::TransactionFailed(err.to_string()),
            StoreError::Database(_)
            | StoreError::AlreadyExists { .. }
            | StoreError::Constraint(_)
            | StoreError::InvalidData(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::GameId;

    #[test]
    fn purchase_errors_map_to_distinct_statuses() {
        let cases = [
            (
                PurchaseError::GameNotFound {
                    game_id: GameId::generate(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                PurchaseError::AlreadyOwned {
                    game_id: GameId::generate(),
                },
                StatusCode::CONFLICT,
            ),
            (
                PurchaseError::BaseGameRequired {
                    base_game_id: GameId::generate(),
                },
                StatusCode::CONFLICT,
            ),
            (
                PurchaseError::InsufficientFunds {
                    balance: Decimal::ONE_HUNDRED,
                    required: Decimal::ONE_THOUSAND,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                PurchaseError::from(StoreError::Database("gone".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn invalid_identifier_is_bad_request() {
        let err = ApiError::from(DomainError::InvalidId(storefront_core::IdError::InvalidUuid));
        assert!(matches!(&err, ApiError::BadRequest(msg) if msg.contains("invalid UUID")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
