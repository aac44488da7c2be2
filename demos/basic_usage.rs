//! Basic usage example for the Workers KV client
//!
//! Run with: CF_ACCOUNT_ID=... CF_NAMESPACE_ID=... CF_API_TOKEN=... cargo run --example basic_usage

use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use workers_kv::Namespace;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let account_id = std::env::var("CF_ACCOUNT_ID")?;
    let namespace_id = std::env::var("CF_NAMESPACE_ID")?;
    let api_token = std::env::var("CF_API_TOKEN")?;

    let ns = Namespace::new(&account_id, &namespace_id, &api_token)?;

    // Store a value
    info!("Storing key 'example:hello'...");
    ns.write([("example:hello", "Hello, Workers KV!")]).await?;

    // Retrieve the value
    info!("Retrieving key 'example:hello'...");
    match ns.read("example:hello").await? {
        Some(value) => info!("Retrieved: {}", value.to_text()),
        None => info!("Key not found"),
    }

    // Store JSON data
    info!("Storing JSON data...");
    ns.write_one("user:alice", json!({"name": "Alice", "age": 30, "city": "NYC"}))
        .await?;
    if let Some(value) = ns.read("user:alice").await? {
        info!("User city: {}", value.into_json()["city"]);
    }

    // A missing key is not an error
    let missing = ns.read("example:missing").await?;
    info!("Missing key present: {}", missing.is_some());

    // List keys
    info!("Listing keys...");
    for key in ns.list_keys().await? {
        info!("  - {}", key);
    }

    // Delete the keys again
    ns.delete_one("example:hello").await?;
    ns.delete_one("user:alice").await?;

    info!("Example completed successfully!");
    Ok(())
}
