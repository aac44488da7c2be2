//! Async client for a single Workers KV namespace

use std::sync::Arc;

use bytes::Bytes;
use hyper::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::IgnoredAny;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::config::NamespaceConfig;
use crate::error::{Error, Result};
use crate::transport::{Reply, Transport};
use crate::types::*;

/// Maximum number of entries accepted by one bulk write or bulk delete.
pub const MAX_BULK_ENTRIES: usize = 10_000;

/// Characters left unencoded in a single URI path segment (RFC 3986 pchar
/// minus `/`). Everything else, including `/`, `?`, `#`, `%`, spaces and
/// non-ASCII, is percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Percent-encode a value for use as one URI path segment.
pub(crate) fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Client for one Workers KV namespace
///
/// Every operation issues exactly one request. Nothing is cached or retried;
/// clones share the connection pool and nothing else.
///
/// # Example
/// ```rust,no_run
/// use workers_kv::Namespace;
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), workers_kv::Error> {
///     let ns = Namespace::new("account-id", "namespace-id", "api-token")?;
///
///     ns.write([("greeting", "hello")]).await?;
///     ns.write([("user:1", json!({"name": "alice"})), ("user:2", json!({"name": "bob"}))])
///         .await?;
///
///     if let Some(value) = ns.read("greeting").await? {
///         println!("greeting = {}", value.to_text());
///     }
///
///     for key in ns.list_keys().await? {
///         println!("{}", key);
///     }
///
///     ns.delete_many(["user:1", "user:2"]).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Namespace {
    config: Arc<NamespaceConfig>,
    base_url: Arc<str>,
    transport: Transport,
}

impl Namespace {
    /// Create a client for the namespace with default settings
    ///
    /// # Errors
    /// Returns an error if an identifier or the token is empty
    pub fn new(account_id: &str, namespace_id: &str, api_key: &str) -> Result<Self> {
        Self::with_config(NamespaceConfig::new(account_id, namespace_id, api_key))
    }

    /// Create a client with custom configuration
    pub fn with_config(mut config: NamespaceConfig) -> Result<Self> {
        config.validate()?;
        let transport = Transport::new(&config)?;
        // the transport owns the credential from here on
        config.api_key.zeroize();
        let base_url: Arc<str> = Arc::from(config.base_url());

        Ok(Self {
            config: Arc::new(config),
            base_url,
            transport,
        })
    }

    /// Account identifier
    pub fn account_id(&self) -> &str {
        &self.config.account_id
    }

    /// Namespace identifier
    pub fn namespace_id(&self) -> &str {
        &self.config.namespace_id
    }

    /// URL every request path is appended to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the names of all keys in the namespace, in the order the service returns them.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let keys = self.list_key_info().await?;
        Ok(keys.into_iter().map(|k| k.name).collect())
    }

    /// List all keys with their expiration and metadata
    pub async fn list_key_info(&self) -> Result<Vec<KeyInfo>> {
        let url = format!("{}/keys", self.base_url);
        let body = self.fetch(Method::GET, &url, None).await?;
        let envelope: Envelope<Vec<KeyInfo>> = serde_json::from_str(&body)?;
        check_envelope(&envelope).inspect_err(|e| warn!("Listing keys failed: {}", e))?;
        Ok(envelope.result.unwrap_or_default())
    }

    /// Read the value stored under `key`
    ///
    /// Returns `Ok(None)` when the key does not exist. A body that is not JSON
    /// comes back as [`StoredValue::Text`]; a JSON body comes back as
    /// [`StoredValue::Json`] unless it is an error object, which is returned
    /// as [`Error::Remote`] carrying the first reported message.
    pub async fn read(&self, key: &str) -> Result<Option<StoredValue>> {
        let url = self.value_url(key)?;
        match self.transport.call(Method::GET, &url, None).await {
            Ok(Reply::Body(body)) => decode_read_body(body).map(Some),
            Ok(Reply::NotFound(_)) => {
                debug!("Key not found: {}", key);
                Ok(None)
            }
            Err(e) => Err(first_error_only(promote_failure_envelope(e))),
        }
    }

    /// Write one or more key-value pairs
    ///
    /// A single pair is written with the single-key call; any other number of
    /// pairs goes through one bulk call, which rejects more than
    /// [`MAX_BULK_ENTRIES`] pairs before sending anything.
    pub async fn write<I, K, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: Into<Value>,
    {
        let mut pairs: Vec<(String, Value)> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.into()))
            .collect();

        if pairs.len() == 1 {
            if let Some((key, value)) = pairs.pop() {
                return self.write_one(&key, value).await;
            }
        }
        self.write_many(pairs).await
    }

    /// Write a single key with `PUT /values/{key}`
    pub async fn write_one(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let url = self.value_url(key)?;
        let value = value.into();
        let body = Bytes::from(value.to_wire().into_owned());
        self.send(Method::PUT, &url, Some(body)).await
    }

    /// Write many pairs with one `PUT /bulk`
    ///
    /// # Errors
    /// [`Error::LimitExceeded`] if more than [`MAX_BULK_ENTRIES`] pairs are given.
    pub async fn write_many<I, K, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: Into<Value>,
    {
        let pairs: Vec<(String, Value)> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.into()))
            .collect();
        check_batch_size(pairs.len())?;

        let entries: Vec<BulkWriteEntry<'_>> = pairs
            .iter()
            .map(|(key, value)| BulkWriteEntry {
                key,
                value: value.to_wire(),
            })
            .collect();
        let body = serde_json::to_vec(&entries)?;

        let url = format!("{}/bulk", self.base_url);
        self.send(Method::PUT, &url, Some(Bytes::from(body))).await
    }

    /// Delete a single key
    pub async fn delete_one(&self, key: &str) -> Result<()> {
        let url = self.value_url(key)?;
        self.send(Method::DELETE, &url, None).await
    }

    /// Delete many keys with one `DELETE /bulk`
    ///
    /// Keys are converted to strings before sending.
    ///
    /// # Errors
    /// [`Error::LimitExceeded`] if more than [`MAX_BULK_ENTRIES`] keys are given.
    pub async fn delete_many<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: ToString,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.to_string()).collect();
        check_batch_size(keys.len())?;

        let body = serde_json::to_vec(&keys)?;
        let url = format!("{}/bulk", self.base_url);
        self.send(Method::DELETE, &url, Some(Bytes::from(body))).await
    }

    fn value_url(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::InvalidRequest("Key cannot be empty".to_string()));
        }
        Ok(format!("{}/values/{}", self.base_url, encode_segment(key)))
    }

    /// Issue a call where absence is a failure and return the reply text.
    async fn fetch(&self, method: Method, url: &str, body: Option<Bytes>) -> Result<String> {
        match self.transport.call(method, url, body).await {
            Ok(Reply::Body(body)) => Ok(body),
            Ok(Reply::NotFound(body)) => Err(promote_failure_envelope(Error::Transport {
                status: 404,
                body,
            })),
            Err(e) => Err(promote_failure_envelope(e)),
        }
    }

    /// Issue a write/delete call and check the reply envelope.
    async fn send(&self, method: Method, url: &str, body: Option<Bytes>) -> Result<()> {
        let reply = self.fetch(method.clone(), url, body).await?;
        let envelope: Envelope<IgnoredAny> = serde_json::from_str(&reply)?;
        check_envelope(&envelope).inspect_err(|e| warn!("{} {} failed: {}", method, url, e))
    }
}

fn check_batch_size(len: usize) -> Result<()> {
    if len > MAX_BULK_ENTRIES {
        return Err(Error::LimitExceeded {
            limit: MAX_BULK_ENTRIES,
            actual: len,
        });
    }
    Ok(())
}

/// Turn a reply envelope into `Ok(())` or the error it reports.
pub(crate) fn check_envelope<T>(envelope: &Envelope<T>) -> Result<()> {
    match envelope.success {
        Some(true) => Ok(()),
        Some(false) => Err(Error::Remote {
            status: None,
            errors: envelope.errors.clone(),
        }),
        None if !envelope.errors.is_empty() => Err(Error::Remote {
            status: None,
            errors: envelope.errors.clone(),
        }),
        None => {
            let message = match &envelope.error {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "reply did not include a success flag".to_string(),
            };
            Err(Error::remote_message(None, message))
        }
    }
}

/// A failure status whose body is a failure envelope is a remote error;
/// anything else stays as it is.
fn promote_failure_envelope(err: Error) -> Error {
    match err {
        Error::Transport { status, body } => {
            match serde_json::from_str::<Envelope<IgnoredAny>>(&body) {
                Ok(envelope) if envelope.success == Some(false) => Error::Remote {
                    status: Some(status),
                    errors: envelope.errors,
                },
                _ => Error::Transport { status, body },
            }
        }
        other => other,
    }
}

fn first_error_only(err: Error) -> Error {
    match err {
        Error::Remote { status, mut errors } => {
            errors.truncate(1);
            Error::Remote { status, errors }
        }
        other => other,
    }
}

/// Interpret the body of a successful read.
///
/// Text that is not JSON is the stored value itself. JSON is the stored value
/// unless it is an object with an `errors` field.
pub(crate) fn decode_read_body(body: String) -> Result<StoredValue> {
    let decoded: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => {
            debug!("Read body is not JSON, returning it as text");
            return Ok(StoredValue::Text(body));
        }
    };

    match decoded.get("errors") {
        Some(errors) => Err(read_error(errors)),
        None => Ok(StoredValue::Json(decoded)),
    }
}

fn read_error(errors: &serde_json::Value) -> Error {
    let first = match errors {
        serde_json::Value::Array(items) => items.first(),
        other => Some(other),
    };
    match first {
        Some(serde_json::Value::Object(obj)) => {
            let message = match obj.get("message") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => serde_json::Value::Object(obj.clone()).to_string(),
            };
            Error::Remote {
                status: None,
                errors: vec![ApiMessage {
                    code: obj.get("code").and_then(|c| c.as_i64()),
                    message,
                }],
            }
        }
        Some(serde_json::Value::String(s)) => Error::remote_message(None, s.clone()),
        Some(other) => Error::remote_message(None, other.to_string()),
        None => Error::Remote {
            status: None,
            errors: Vec::new(),
        },
    }
}
