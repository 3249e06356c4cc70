//! Service configuration.

use std::time::Duration;

use storefront_store::IsolationLevel;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection string. Without it the service keeps its state
    /// in memory.
    pub database_url: Option<String>,

    /// Maximum pooled database connections (default: 10).
    pub database_max_connections: u32,

    /// Isolation level for purchase and top-up transactions.
    pub database_isolation: IsolationLevel,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Badge service endpoint notified after each purchase (optional).
    pub badge_webhook_url: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Limit for a purchase or top-up unit of work, in milliseconds.
    pub purchase_timeout_ms: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            database_isolation: std::env::var("DATABASE_ISOLATION")
                .ok()
                .and_then(|s| match s.parse() {
                    Ok(level) => Some(level),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring DATABASE_ISOLATION");
                        None
                    }
                })
                .unwrap_or(defaults.database_isolation),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            badge_webhook_url: std::env::var("BADGE_WEBHOOK_URL").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            purchase_timeout_ms: parse_env("PURCHASE_TIMEOUT_MS")
                .unwrap_or(defaults.purchase_timeout_ms),
        }
    }

    /// Limit for a purchase or top-up unit of work.
    #[must_use]
    pub fn purchase_timeout(&self) -> Duration {
        Duration::from_millis(self.purchase_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            database_max_connections: 10,
            database_isolation: IsolationLevel::ReadCommitted,
            service_api_key: None,
            badge_webhook_url: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout_seconds: 30,
            purchase_timeout_ms: 10_000,
        }
    }
}
