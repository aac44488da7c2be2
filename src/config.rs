//! Client configuration

use std::fmt;

use url::Url;

use crate::error::{Error, Result};
use crate::namespace::encode_segment;

/// Default API root for Cloudflare's v4 REST API
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Configuration options for a Workers KV namespace client
#[derive(Clone)]
pub struct NamespaceConfig {
    /// Cloudflare account identifier
    pub account_id: String,
    /// Workers KV namespace identifier
    pub namespace_id: String,
    /// API token sent as a bearer credential
    pub api_key: String,
    /// API root URL (default: https://api.cloudflare.com/client/v4)
    pub api_base: String,
    /// Request timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Optional SSL certificate fingerprint (SHA-256 hex) for certificate pinning.
    /// Accepts hex with or without colons. Requires an https:// API base.
    pub ssl_fingerprint: Option<String>,
    /// Enable TLS verification (default: true).
    /// When false, any certificate is accepted.
    pub reject_unauthorized: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            namespace_id: String::new(),
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_ms: 30000,
            ssl_fingerprint: None,
            reject_unauthorized: true,
        }
    }
}

impl fmt::Debug for NamespaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceConfig")
            .field("account_id", &self.account_id)
            .field("namespace_id", &self.namespace_id)
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout_ms", &self.timeout_ms)
            .field("ssl_fingerprint", &self.ssl_fingerprint)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .finish()
    }
}

impl NamespaceConfig {
    /// Configuration for the given account, namespace and token with defaults elsewhere
    pub fn new(account_id: &str, namespace_id: &str, api_key: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            namespace_id: namespace_id.to_string(),
            api_key: api_key.to_string(),
            ..Default::default()
        }
    }

    /// Check the configuration before any client is built.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(Error::InvalidConfig("account_id must not be empty".to_string()));
        }
        if self.namespace_id.trim().is_empty() {
            return Err(Error::InvalidConfig("namespace_id must not be empty".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(Error::InvalidConfig("api_key must not be empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig("timeout_ms must be greater than zero".to_string()));
        }

        let api_base = Url::parse(&self.api_base)
            .map_err(|e| Error::InvalidUrl(format!("Invalid API base URL: {}", e)))?;
        match api_base.scheme() {
            "https" => {}
            "http" if self.ssl_fingerprint.is_some() => {
                return Err(Error::Tls(
                    "ssl_fingerprint requires an https:// API base".to_string(),
                ));
            }
            "http" => {}
            other => {
                return Err(Error::InvalidUrl(format!("Unsupported URL scheme: {}", other)));
            }
        }
        if api_base.query().is_some() || api_base.fragment().is_some() {
            return Err(Error::InvalidUrl(
                "API base must not carry a query or fragment".to_string(),
            ));
        }

        Ok(())
    }

    /// URL of the namespace all operations are issued against.
    pub fn base_url(&self) -> String {
        format!(
            "{}/accounts/{}/storage/kv/namespaces/{}",
            self.api_base.trim_end_matches('/'),
            encode_segment(&self.account_id),
            encode_segment(&self.namespace_id),
        )
    }
}
