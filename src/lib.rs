//! A client for the Cloudflare Workers KV HTTP API
//!
//! This library gives typed access to one KV namespace: list keys, read,
//! write and delete, one key at a time or in bulk.
//!
//! # Features
//! - Async API on tokio, plus a [`blocking`] client
//! - Bearer token authentication
//! - Plain text and JSON values ([`Value`], [`StoredValue`])
//! - Bulk write and delete of up to [`MAX_BULK_ENTRIES`] entries per call
//! - HTTPS with webpki roots, optional certificate fingerprint pinning
//! - Built-in timeout support
//!
//! No retries and no caching: every operation issues exactly one request and
//! surfaces any failure immediately.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use workers_kv::Namespace;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), workers_kv::Error> {
//!     let ns = Namespace::new("account-id", "namespace-id", "api-token")?;
//!
//!     // Store a value
//!     ns.write([("my-key", "Hello, World!")]).await?;
//!
//!     // Retrieve it; a missing key reads as None
//!     match ns.read("my-key").await? {
//!         Some(value) => println!("Retrieved: {}", value.to_text()),
//!         None => println!("Key not found"),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod blocking;
pub mod config;
pub mod error;
pub mod namespace;
mod tls;
mod transport;
pub mod types;

pub use config::{NamespaceConfig, DEFAULT_API_BASE};
pub use error::{Error, Result};
pub use namespace::{Namespace, MAX_BULK_ENTRIES};
pub use types::*;
