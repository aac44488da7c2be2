//! One HTTP round trip against the API with a uniform status policy

use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http_body_util::{BodyExt, Full};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::config::NamespaceConfig;
use crate::error::{Error, Result};
use crate::tls::build_tls_config;

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;

/// API token that is zeroed when dropped.
struct ApiKey(String);

impl ApiKey {
    fn bearer(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::try_from(format!("Bearer {}", self.0))
            .map_err(|_| Error::InvalidConfig("api_key contains invalid header characters".to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl Drop for ApiKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Outcome of a round trip that was not a failure
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    /// 2xx or 304: the decoded response text
    Body(String),
    /// 404: the raw response text, for callers that treat absence as an error
    NotFound(String),
}

/// Pooled HTTP client carrying the credential and timeout for every call.
#[derive(Clone)]
pub(crate) struct Transport {
    http_client: HttpClient<HttpsConnector, Full<Bytes>>,
    api_key: Arc<ApiKey>,
    timeout_ms: u64,
}

impl Transport {
    /// Build the transport. Plain http:// bases are allowed for local endpoints.
    pub(crate) fn new(config: &NamespaceConfig) -> Result<Self> {
        let api_key = ApiKey(config.api_key.clone());
        // fail at construction rather than on the first call
        api_key.bearer()?;

        let tls_config =
            build_tls_config(config.ssl_fingerprint.as_deref(), config.reject_unauthorized)?;

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let http_client = HttpClient::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            http_client,
            api_key: Arc::new(api_key),
            timeout_ms: config.timeout_ms,
        })
    }

    /// Issue one request and classify the response by status.
    pub(crate) async fn call(&self, method: Method, url: &str, body: Option<Bytes>) -> Result<Reply> {
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::InvalidUrl(format!("Invalid request URL: {}", e)))?;
        let path = uri.path().to_string();

        let req = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(AUTHORIZATION, self.api_key.bearer()?)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(body.unwrap_or_default()))
            .map_err(|e| Error::InvalidRequest(format!("Failed to build request: {}", e)))?;

        debug!("Sending request: {} {}", method, path);

        let round_trip = async {
            let response = self
                .http_client
                .request(req)
                .await
                .map_err(|e| Error::Connection(format!("Request failed: {}", e)))?;
            let status = response.status();
            let body = read_body_to_string(response.into_body()).await?;
            Ok::<_, Error>((status, body))
        };

        let timeout = Duration::from_millis(self.timeout_ms);
        let (status, body) = tokio::time::timeout(timeout, round_trip)
            .await
            .map_err(|_| Error::Timeout(self.timeout_ms))??;

        debug!("Received {} for {} {}", status, method, path);

        match status {
            StatusCode::NOT_FOUND => Ok(Reply::NotFound(body)),
            code if code.is_success() || code == StatusCode::NOT_MODIFIED => Ok(Reply::Body(body)),
            code => {
                warn!("{} {} returned unexpected status {}", method, path, code);
                Err(Error::Transport {
                    status: code.as_u16(),
                    body,
                })
            }
        }
    }
}

/// Read a response body as text, replacing invalid UTF-8.
async fn read_body_to_string(body: Incoming) -> Result<String> {
    let collected = body
        .collect()
        .await
        .map_err(|e| Error::Connection(format!("Failed to read response body: {}", e)))?;
    Ok(String::from_utf8_lossy(&collected.to_bytes()).into_owned())
}
