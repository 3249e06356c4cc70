//! Authentication extractors.
//!
//! Every `/v1` route is called by the storefront's web layer, never by
//! players directly, so the only credential is a shared service API key.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Service authentication via API key.
///
/// Requires `X-API-Key` to match `SERVICE_API_KEY`. The optional
/// `X-Service-Name` header identifies the caller in logs.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let api_key = parts
                .headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            // No configured key means every request is rejected.
            let expected_key = state
                .config
                .service_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if api_key != expected_key {
                tracing::debug!("Rejected request with wrong service API key");
                return Err(ApiError::Unauthorized);
            }

            let service_name = parts
                .headers
                .get("x-service-name")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            Ok(ServiceAuth { service_name })
        })
    }
}
