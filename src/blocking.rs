//! Blocking client
//!
//! [`Namespace`] runs the async client on a private tokio runtime with one
//! worker thread. Each call returns once its HTTP round trip has completed.
//! The worker keeps running between calls, so pooled connections closed by
//! the server are noticed and evicted before they are reused.
//!
//! The blocking client must not be created, used or dropped from inside an
//! async runtime; tokio panics when a runtime is blocked on from within
//! another one. Use [`crate::Namespace`] there instead.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};

use crate::config::NamespaceConfig;
use crate::error::Result;
use crate::types::{KeyInfo, StoredValue, Value};

/// Blocking client for one Workers KV namespace
///
/// # Example
/// ```rust,no_run
/// use workers_kv::blocking::Namespace;
///
/// fn main() -> Result<(), workers_kv::Error> {
///     let ns = Namespace::new("account-id", "namespace-id", "api-token")?;
///     ns.write([("greeting", "hello")])?;
///     assert!(ns.read("greeting")?.is_some());
///     ns.delete_one("greeting")?;
///     Ok(())
/// }
/// ```
pub struct Namespace {
    inner: crate::Namespace,
    runtime: Runtime,
}

impl Namespace {
    /// Create a blocking client for the namespace with default settings
    pub fn new(account_id: &str, namespace_id: &str, api_key: &str) -> Result<Self> {
        Self::with_config(NamespaceConfig::new(account_id, namespace_id, api_key))
    }

    /// Create a blocking client with custom configuration
    pub fn with_config(config: NamespaceConfig) -> Result<Self> {
        let inner = crate::Namespace::with_config(config)?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("workers-kv-blocking")
            .enable_all()
            .build()?;
        Ok(Self { inner, runtime })
    }

    /// The async client this one drives
    pub fn as_async(&self) -> &crate::Namespace {
        &self.inner
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// See [`crate::Namespace::list_keys`]
    pub fn list_keys(&self) -> Result<Vec<String>> {
        self.block_on(self.inner.list_keys())
    }

    /// See [`crate::Namespace::list_key_info`]
    pub fn list_key_info(&self) -> Result<Vec<KeyInfo>> {
        self.block_on(self.inner.list_key_info())
    }

    /// See [`crate::Namespace::read`]
    pub fn read(&self, key: &str) -> Result<Option<StoredValue>> {
        self.block_on(self.inner.read(key))
    }

    /// See [`crate::Namespace::write`]
    pub fn write<I, K, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: Into<Value>,
    {
        self.block_on(self.inner.write(pairs))
    }

    /// See [`crate::Namespace::write_one`]
    pub fn write_one(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.block_on(self.inner.write_one(key, value))
    }

    /// See [`crate::Namespace::write_many`]
    pub fn write_many<I, K, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: Into<Value>,
    {
        self.block_on(self.inner.write_many(pairs))
    }

    /// See [`crate::Namespace::delete_one`]
    pub fn delete_one(&self, key: &str) -> Result<()> {
        self.block_on(self.inner.delete_one(key))
    }

    /// See [`crate::Namespace::delete_many`]
    pub fn delete_many<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: ToString,
    {
        self.block_on(self.inner.delete_many(keys))
    }
}
