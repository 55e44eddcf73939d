//! Client construction and configuration

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::executor::{Executor, HttpExecutor};
use crate::path::PathBuilder;
use crate::request::KeyRequest;
use crate::translate;
use crate::types::{KeyResponse, StatsKind, VersionInfo};

/// Configuration options for the client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server endpoint URL (default: http://127.0.0.1:2379)
    pub endpoint: String,
    /// API version prefix the keys namespace lives under (default: /v2)
    pub version_prefix: String,
    /// Read timeout in milliseconds, used by every request and by watches
    /// that do not set their own (default: 60000)
    pub read_timeout_ms: u64,
    /// Username for HTTP basic auth
    pub username: Option<String>,
    /// Password for HTTP basic auth; requires `username`
    pub password: Option<String>,
    /// Optional SSL certificate fingerprint (SHA-256 hex) for certificate pinning.
    /// Accepts hex with or without colons. Requires an https:// endpoint.
    pub ssl_fingerprint: Option<String>,
    /// Enable TLS verification (default: true).
    /// When false, any certificate is accepted (self-signed setups).
    pub reject_unauthorized: bool,
    /// Only speak HTTP/2 (default: false, HTTP/1.1 and HTTP/2 are both offered)
    pub http2_only: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:2379".to_string(),
            version_prefix: "/v2".to_string(),
            read_timeout_ms: 60_000,
            username: None,
            password: None,
            ssl_fingerprint: None,
            reject_unauthorized: true,
            http2_only: false,
        }
    }
}

impl ClientConfig {
    /// Read the configuration from `ETCD_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparsable numbers and booleans fall back to the
    /// default as well.
    pub fn from_env() -> std::result::Result<Self, String> {
        let defaults = Self::default();

        let endpoint = env::var("ETCD_ENDPOINT").unwrap_or(defaults.endpoint);
        let version_prefix = env::var("ETCD_VERSION_PREFIX").unwrap_or(defaults.version_prefix);
        let read_timeout_ms = env::var("ETCD_READ_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.read_timeout_ms);
        let username = env::var("ETCD_USERNAME").ok();
        let password = env::var("ETCD_PASSWORD").ok();
        let ssl_fingerprint = env::var("ETCD_SSL_FINGERPRINT").ok();
        let reject_unauthorized = env::var("ETCD_REJECT_UNAUTHORIZED")
            .ok()
            .and_then(|s| parse_bool(&s))
            .unwrap_or(defaults.reject_unauthorized);

        if password.is_some() && username.is_none() {
            return Err("ETCD_PASSWORD is set but ETCD_USERNAME is not".to_string());
        }

        Ok(ClientConfig {
            endpoint,
            version_prefix,
            read_timeout_ms,
            username,
            password,
            ssl_fingerprint,
            reject_unauthorized,
            http2_only: defaults.http2_only,
        })
    }

    /// The default read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Client for the keys API of an etcd v2 compatible store
///
/// Every operation issues exactly one request and waits for one response. The client holds
/// no mutable state; clones share the connection pool.
///
/// # Example
/// ```rust,no_run
/// use etcd_keys_client::{Client, ClientConfig};
///
/// # fn main() -> Result<(), etcd_keys_client::Error> {
/// // Plaintext
/// let client = Client::new("http://127.0.0.1:2379")?;
///
/// // HTTPS with certificate pinning and basic auth
/// let client = Client::with_config(ClientConfig {
///     endpoint: "https://etcd.internal:2379".to_string(),
///     username: Some("root".to_string()),
///     password: Some("secret".to_string()),
///     ssl_fingerprint: Some("AB:CD:EF:...".to_string()),
///     ..Default::default()
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client<E = HttpExecutor> {
    config: Arc<ClientConfig>,
    paths: PathBuilder,
    executor: E,
}

impl Client<HttpExecutor> {
    /// Create a client for the given endpoint with default settings
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_config(ClientConfig {
            endpoint: endpoint.to_string(),
            ..Default::default()
        })
    }

    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let executor = HttpExecutor::new(&config)?;
        info!(
            "etcd client for {} (prefix {}, read timeout {}ms)",
            config.endpoint, config.version_prefix, config.read_timeout_ms
        );
        Ok(Self::with_executor(config, executor))
    }

    /// Create a client configured from `ETCD_*` environment variables
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env().map_err(crate::Error::InvalidArgument)?;
        Self::with_config(config)
    }
}

impl<E> Client<E> {
    /// Create a client over any transport
    pub fn with_executor(config: ClientConfig, executor: E) -> Self {
        let paths = PathBuilder::new(&config.version_prefix);
        Self {
            config: Arc::new(config),
            paths,
            executor,
        }
    }

    /// Get the endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Get the API version prefix
    pub fn version_prefix(&self) -> &str {
        &self.config.version_prefix
    }

    /// Default read timeout
    pub fn read_timeout(&self) -> Duration {
        self.config.read_timeout()
    }

    /// The `<version-prefix>/keys` root
    pub fn key_endpoint(&self) -> &str {
        self.paths.key_endpoint()
    }

    /// The underlying transport
    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub(crate) fn paths(&self) -> &PathBuilder {
        &self.paths
    }
}

impl<E: Executor> Client<E> {
    /// Execute a key request and translate the response
    pub(crate) async fn dispatch(&self, request: KeyRequest) -> Result<KeyResponse> {
        let raw = self.executor.execute(request).await?;
        translate::key_response(raw)
    }

    /// Server and cluster version
    pub async fn version(&self) -> Result<VersionInfo> {
        let raw = self
            .executor
            .execute(KeyRequest::plain_get("/version".to_string()))
            .await?;
        translate::json(raw)
    }

    /// Statistics of the member this client talks to
    pub async fn stats(&self, kind: StatsKind) -> Result<serde_json::Value> {
        let path = format!("{}/stats/{}", self.config.version_prefix, kind.path_segment());
        let raw = self.executor.execute(KeyRequest::plain_get(path)).await?;
        translate::json(raw)
    }

    /// Check if the store is reachable and healthy
    ///
    /// # Returns
    /// true if `/health` answered with a success status
    pub async fn health_check(&self) -> Result<bool> {
        match self
            .executor
            .execute(KeyRequest::plain_get("/health".to_string()))
            .await
        {
            Ok(raw) => Ok(raw.status.is_success()),
            Err(e) => {
                debug!("health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
