//! Integration Tests for the Cache Store
//!
//! Exercises the full lifecycle against both built-in backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use table_cache::{
    CacheError, CacheKey, CacheStore, ClientOptions, Connection, Connector, DefaultConnector,
    Envelope, MemoryBackend, Policy, SqliteBackend, StorageBackend,
};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const DESCRIPTORS: &[&str] = &["memory://", "sqlite::memory:"];

async fn started_store(url: &str) -> CacheStore {
    init_tracing();
    let store = CacheStore::from_options(ClientOptions::new().with_url(url)).unwrap();
    store.start().await.unwrap();
    store
}

/// Connector that counts how many handles it opened.
#[derive(Default)]
struct CountingConnector {
    connects: AtomicUsize,
}

#[async_trait]
impl Connector for CountingConnector {
    async fn connect(&self, url: &str) -> anyhow::Result<Arc<dyn StorageBackend>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        // Give concurrent starters a chance to interleave
        tokio::time::sleep(Duration::from_millis(20)).await;
        DefaultConnector.connect(url).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    age: u32,
    tags: Vec<String>,
}

// == Connection Tests ==

#[tokio::test]
async fn test_creates_a_new_connection() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        assert!(store.is_ready());
    }
}

#[tokio::test]
async fn test_closes_the_connection() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        store.stop().await;
        assert!(!store.is_ready());
    }
}

#[tokio::test]
async fn test_start_twice_chained() {
    let store = started_store("sqlite::memory:").await;
    store.start().await.unwrap();
    assert!(store.is_ready());
}

#[tokio::test]
async fn test_concurrent_start_opens_one_handle() {
    init_tracing();
    let connector = Arc::new(CountingConnector::default());
    let connection = Connection::with_connector(
        ClientOptions::new().with_url("memory://"),
        connector.clone(),
    )
    .unwrap();
    let store = Arc::new(CacheStore::new(connection));

    let (a, b) = tokio::join!(store.start(), store.start());
    a.unwrap();
    b.unwrap();

    assert!(store.is_ready());
    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_start_across_tasks() {
    init_tracing();
    let connector = Arc::new(CountingConnector::default());
    let connection = Connection::with_connector(
        ClientOptions::new().with_url("memory://"),
        connector.clone(),
    )
    .unwrap();
    let store = Arc::new(CacheStore::new(connection));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.start().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_restart_after_stop_opens_new_handle() {
    let connector = Arc::new(CountingConnector::default());
    let connection = Connection::with_connector(
        ClientOptions::new().with_url("memory://"),
        connector.clone(),
    )
    .unwrap();
    let store = CacheStore::new(connection);

    store.start().await.unwrap();
    store.stop().await;
    store.start().await.unwrap();

    assert!(store.is_ready());
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_start_without_url_is_configuration_error() {
    let store = CacheStore::from_options(ClientOptions::default()).unwrap();
    assert!(matches!(store.start().await, Err(CacheError::Configuration(_))));
}

#[tokio::test]
async fn test_external_handle_is_adopted_and_left_open() {
    init_tracing();
    let sqlite = SqliteBackend::open_in_memory().await.unwrap();
    let handle: Arc<dyn StorageBackend> = Arc::new(sqlite.clone());

    let store = CacheStore::new(
        Connection::with_handle(ClientOptions::new().with_partition("hapi-test"), handle).unwrap(),
    );
    store.start().await.unwrap();

    let key = CacheKey::new("test", "a");
    store.set(&key, "going in", 1000).await.unwrap();
    let envelope: Envelope<String> = store.get(&key).await.unwrap().unwrap();
    assert_eq!(envelope.item, "going in");

    store.stop().await;
    assert!(sqlite.is_open());
}

#[tokio::test]
async fn test_two_partitions_share_one_backend() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
    let first = CacheStore::new(
        Connection::with_handle(ClientOptions::new().with_partition("one"), backend.clone())
            .unwrap(),
    );
    let second = CacheStore::new(
        Connection::with_handle(ClientOptions::new().with_partition("two"), backend).unwrap(),
    );
    first.start().await.unwrap();
    second.start().await.unwrap();

    let key = CacheKey::new("seg", "id");
    first.set(&key, "from one", 1000).await.unwrap();

    let other: Option<Envelope<String>> = second.get(&key).await.unwrap();
    assert!(other.is_none());
}

// == Entry Tests ==

#[tokio::test]
async fn test_gets_an_item_after_setting_it() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        let key = CacheKey::new("test", "x");

        store.set(&key, "123", 500).await.unwrap();
        let envelope: Envelope<String> = store.get(&key).await.unwrap().unwrap();
        assert_eq!(envelope.item, "123");
    }
}

#[tokio::test]
async fn test_structured_value_round_trip() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        let key = CacheKey::new("profiles", "7");
        let profile = Profile {
            name: "Ada".to_string(),
            age: 36,
            tags: vec!["math".to_string(), "engines".to_string()],
        };

        store.set(&key, &profile, 10_000).await.unwrap();
        let envelope: Envelope<Profile> = store.get(&key).await.unwrap().unwrap();
        assert_eq!(envelope.item, profile);
    }
}

#[tokio::test]
async fn test_falsy_values_round_trip() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        for (id, value) in [("zero", json!(0)), ("false", json!(false)), ("empty", json!(""))] {
            let key = CacheKey::new("falsy", id);
            store.set(&key, &value, 1000).await.unwrap();

            let envelope: Envelope<Value> = store.get(&key).await.unwrap().unwrap();
            assert_eq!(envelope.item, value);
        }
    }
}

#[tokio::test]
async fn test_returns_not_found_when_item_expired() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        let key = CacheKey::new("test", "x");

        store.set(&key, "x", 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let result: Option<Envelope<String>> = store.get(&key).await.unwrap();
        assert!(result.is_none());
    }
}

#[tokio::test]
async fn test_overwrite_replaces_value_and_ttl() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        let key = CacheKey::new("test", "x");

        store.set(&key, "old", 1).await.unwrap();
        store.set(&key, "new", 60_000).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let envelope: Envelope<String> = store.get(&key).await.unwrap().unwrap();
        assert_eq!(envelope.item, "new");
        assert_eq!(envelope.ttl, 60_000);
    }
}

#[tokio::test]
async fn test_zero_ttl_is_not_stored() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        let key = CacheKey::new("test", "x");

        store.set(&key, "v", 0).await.unwrap();
        let result: Option<Envelope<String>> = store.get(&key).await.unwrap();
        assert!(result.is_none());
    }
}

#[tokio::test]
async fn test_drop_missing_key_succeeds() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        store.drop(&CacheKey::new("test", "never-set")).await.unwrap();
    }
}

#[tokio::test]
async fn test_invalid_keys_rejected() {
    for url in DESCRIPTORS {
        let store = started_store(url).await;
        let empty = CacheKey::default();

        let get: table_cache::Result<Option<Envelope<Value>>> = store.get(&empty).await;
        assert!(matches!(get, Err(CacheError::InvalidKey(_))));
        assert!(matches!(
            store.set(&empty, "v", 1000).await,
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(store.drop(&empty).await, Err(CacheError::InvalidKey(_))));
    }
}

#[tokio::test]
async fn test_operations_fail_when_not_started() {
    let store = CacheStore::from_options(ClientOptions::new().with_url("memory://")).unwrap();
    let key = CacheKey::new("test", "x");

    let get: table_cache::Result<Option<Envelope<Value>>> = store.get(&key).await;
    assert!(matches!(get, Err(CacheError::NotStarted { .. })));
    assert!(matches!(
        store.set(&key, "v", 1000).await,
        Err(CacheError::NotStarted { .. })
    ));
    assert!(matches!(store.drop(&key).await, Err(CacheError::NotStarted { .. })));
}

#[tokio::test]
async fn test_operations_fail_after_stop() {
    let store = started_store("sqlite::memory:").await;
    store.stop().await;

    let result = store.set(&CacheKey::new("test", "x"), "v", 1000).await;
    assert!(matches!(result, Err(CacheError::NotStarted { operation: "set" })));
}

#[tokio::test]
async fn test_sqlite_file_survives_restart() {
    init_tracing();
    let dir = std::env::temp_dir().join(format!(
        "table_cache_it_{}",
        table_cache::cache::current_timestamp_ms()
    ));
    let url = format!("sqlite://{}", dir.join("cache.db").display());

    let key = CacheKey::new("persist", "x");
    {
        let store = started_store(&url).await;
        store.set(&key, &json!({"kept": true}), 60_000).await.unwrap();
        store.stop().await;
    }

    let store = started_store(&url).await;
    let envelope: Envelope<Value> = store.get(&key).await.unwrap().unwrap();
    assert_eq!(envelope.item, json!({"kept": true}));
    store.stop().await;

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_drop_through_shared_store() {
    let store = Arc::new(started_store("memory://").await);
    let key = CacheKey::new("shared", "x");
    store.set(&key, "v", 1000).await.unwrap();

    let worker = store.clone();
    let dropped = tokio::spawn(async move {
        let key = CacheKey::new("shared", "x");
        CacheStore::drop(&worker, &key).await
    });
    dropped.await.unwrap().unwrap();

    let result: Option<Envelope<String>> = store.get(&key).await.unwrap();
    assert!(result.is_none());
}

// == Policy Tests ==

#[tokio::test]
async fn test_policy_over_sqlite() {
    let store = Arc::new(started_store("sqlite::memory:").await);
    let policy = Policy::new(store.clone(), "test", Duration::from_secs(1)).unwrap();

    policy.set("a", "going in").await.unwrap();
    let value: Option<String> = policy.get("a").await.unwrap();
    assert_eq!(value.as_deref(), Some("going in"));

    let stats = store.stats();
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.hits, 1);
}

// == Sweep Tests ==

#[tokio::test]
async fn test_sweep_over_sqlite() {
    let store = Arc::new(started_store("sqlite::memory:").await);
    store.set(&CacheKey::new("s", "short"), "v", 1).await.unwrap();
    store.set(&CacheKey::new("s", "long"), "v", 60_000).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(store.sweep_expired().await.unwrap(), 1);

    let long: Option<Envelope<String>> = store.get(&CacheKey::new("s", "long")).await.unwrap();
    assert!(long.is_some());
}
