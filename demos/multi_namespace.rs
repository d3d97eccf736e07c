//! Example demonstrating several named cache managers sharing one registry.
//!
//! Each manager owns its own backend, configuration and statistics. Values are typed at the
//! call site, so one manager can hold users while another holds API keys.
//!
//! Run with `RUST_LOG=multistore_cache=debug` to see eviction and cleanup diagnostics.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use multistore_cache::{
    CacheConfig, CacheConfigOverride, CacheEventKind, CacheRegistry, Preset, Priority,
    StorageStrategy,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct User {
    id: String,
    name: String,
    email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ApiKey {
    key: String,
    user_id: String,
    created_at: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = CacheRegistry::new();
    let storage_dir = std::env::temp_dir().join("multistore-cache-demo");
    std::fs::create_dir_all(&storage_dir)?;

    // Users survive restarts in a file-backed area
    let users = registry
        .create_manager("users", CacheConfig {
            strategy: StorageStrategy::LocalPersisted,
            storage_path: Some(storage_dir.join("users.json")),
            namespace: "users".to_string(),
            ..Preset::Persisted.config()
        })
        .await?;

    // API keys live in SQLite
    let apikeys = registry
        .create_manager("apikeys", CacheConfig {
            storage_path: Some(storage_dir.join("apikeys.db")),
            namespace: "apikeys".to_string(),
            ..Preset::Indexed.config()
        })
        .await?;

    // Short-lived lookups stay in memory
    let scratch = registry.create_preset("scratch", Preset::Temporary).await?;

    let misses = Arc::new(AtomicUsize::new(0));
    let misses_clone = misses.clone();
    users.on(CacheEventKind::Miss, move |event| {
        misses_clone.fetch_add(1, Ordering::Relaxed);
        println!("miss: {:?}", event.key);
    });

    let cached: Option<User> = users.get("chronark").await;
    if cached.is_none() {
        println!("Loading user from database: chronark");
        let user = User {
            id: "chronark".to_string(),
            name: "Andreas".to_string(),
            email: "andreas@example.com".to_string(),
        };
        users
            .set(
                "chronark",
                &user,
                Some(
                    &CacheConfigOverride::default()
                        .tags(["admins"])
                        .priority(Priority::High),
                ),
            )
            .await?;
    }

    let user: Option<User> = users.get("chronark").await;
    println!("User (cached): {:?}", user);

    apikeys
        .set(
            "key_123",
            &ApiKey {
                key: "sk_test_123".to_string(),
                user_id: "chronark".to_string(),
                created_at: 1234567890,
            },
            None,
        )
        .await?;

    let api_key: Option<ApiKey> = apikeys.get("key_123").await;
    println!("ApiKey in apikey cache: {:?}", api_key);

    // Not in the user cache (different manager and backend)
    let not_found: Option<ApiKey> = users.get("key_123").await;
    println!("key_123 in user cache: {:?}", not_found);

    scratch.set("answer", &42, None).await?;
    let admins = users.get_by_tag::<User>("admins").await;
    println!("Admins: {:?}", admins.keys().collect::<Vec<_>>());

    for name in registry.names() {
        if let Some(manager) = registry.get_manager(&name) {
            let stats = manager.get_stats().await;
            println!(
                "{:<8} items={} bytes={} hit_rate={:.2}",
                name, stats.total_items, stats.total_size, stats.hit_rate
            );
        }
    }
    println!("User cache misses observed: {}", misses.load(Ordering::Relaxed));

    for name in registry.names() {
        registry.remove_manager(&name);
    }

    Ok(())
}
