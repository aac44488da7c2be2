//! Bulk operations example for the Workers KV client
//!
//! Writes and deletes several keys with one request each, using the blocking client.
//!
//! Run with: CF_ACCOUNT_ID=... CF_NAMESPACE_ID=... CF_API_TOKEN=... cargo run --example bulk_operations

use serde_json::json;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use workers_kv::blocking::Namespace;
use workers_kv::{Error, Value, MAX_BULK_ENTRIES};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let account_id = std::env::var("CF_ACCOUNT_ID")?;
    let namespace_id = std::env::var("CF_NAMESPACE_ID")?;
    let api_token = std::env::var("CF_API_TOKEN")?;

    let ns = Namespace::new(&account_id, &namespace_id, &api_token)?;

    info!("=== Bulk Operations Example ===");

    let users = vec![
        ("bulk:user:1", Value::from(json!({"name": "Alice", "role": "admin"}))),
        ("bulk:user:2", Value::from(json!({"name": "Bob", "role": "user"}))),
        ("bulk:user:3", Value::from(json!({"name": "Charlie", "role": "user"}))),
        ("bulk:motd", Value::from("plain text values are stored as-is")),
    ];

    info!("Writing {} keys in one request...", users.len());
    ns.write(users)?;

    for key in ["bulk:user:1", "bulk:motd", "bulk:user:999"] {
        match ns.read(key)? {
            Some(value) => info!("{} = {}", key, value.to_text()),
            None => info!("{} not found", key),
        }
    }

    // Batches over the limit are refused before anything is sent
    let too_many: Vec<String> = (0..=MAX_BULK_ENTRIES).map(|i| format!("k{}", i)).collect();
    match ns.delete_many(&too_many) {
        Err(Error::LimitExceeded { limit, actual }) => {
            warn!("Refused bulk delete of {} keys (limit {})", actual, limit)
        }
        other => warn!("Unexpected result: {:?}", other),
    }

    info!("Deleting the written keys...");
    ns.delete_many(["bulk:user:1", "bulk:user:2", "bulk:user:3", "bulk:motd"])?;

    info!("Example completed successfully!");
    Ok(())
}
