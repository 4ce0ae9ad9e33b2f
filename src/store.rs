// ============================================================================
// Counter Store
// ============================================================================
//
// The shared key-value store with per-key TTL used by the rate limiter and
// the subscription cache. The store contract is the seam: production runs on
// Redis (portico-redis), tests and single-node development use the in-memory
// implementation.
//
// Expired keys are treated as absent. Mutation happens only through the
// atomic primitives (windowed increment, set-with-TTL); there is no
// application-level locking around the store.
//
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;

use portico_redis::RedisClient;

/// Bound on every individual store round-trip.
const OP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation timed out")]
    Timeout,
    #[error("redis error: {0}")]
    Redis(#[from] portico_redis::RedisError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store with per-key TTL and atomic counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Get the value at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set `key` to `value`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Atomically increment the fixed-window counter at `key`, starting its
    /// expiry window on the first increment. Returns the post-increment
    /// count.
    async fn incr_window(&self, key: &str, window: Duration) -> StoreResult<i64>;

    /// Check store liveness.
    async fn ping(&self) -> StoreResult<()>;
}

// ============================================================================
// Redis implementation
// ============================================================================

/// Production counter store backed by Redis.
pub struct RedisCounterStore {
    client: RedisClient,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = timeout(OP_TIMEOUT, RedisClient::connect(url))
            .await
            .map_err(|_| StoreError::Timeout)??;
        Ok(Self { client })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut client = self.client.clone();
        let value = timeout(OP_TIMEOUT, client.get(key))
            .await
            .map_err(|_| StoreError::Timeout)??;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut client = self.client.clone();
        timeout(OP_TIMEOUT, client.set_ex(key, value, ttl.as_secs().max(1)))
            .await
            .map_err(|_| StoreError::Timeout)??;
        Ok(())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> StoreResult<i64> {
        let mut client = self.client.clone();
        let count = timeout(OP_TIMEOUT, client.incr_window(key, window.as_secs().max(1)))
            .await
            .map_err(|_| StoreError::Timeout)??;
        Ok(count)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut client = self.client.clone();
        timeout(OP_TIMEOUT, client.ping())
            .await
            .map_err(|_| StoreError::Timeout)??;
        Ok(())
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory counter store for tests and single-node development.
///
/// Implements the same expired-is-absent semantics as Redis; entries are
/// reaped lazily on access.
#[derive(Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> StoreResult<i64> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                let count = entry.value.parse::<i64>().unwrap_or(0) + 1;
                entry.value = count.to_string();
                Ok(count)
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: now + window,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_get_set_round_trip() {
        let store = MemoryCounterStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_expired_key_is_absent() {
        let store = MemoryCounterStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_window_counts_then_resets() {
        let store = MemoryCounterStore::new();
        let window = Duration::from_millis(60);

        assert_eq!(store.incr_window("w", window).await.unwrap(), 1);
        assert_eq!(store.incr_window("w", window).await.unwrap(), 2);
        assert_eq!(store.incr_window("w", window).await.unwrap(), 3);

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Window elapsed: the counter starts over
        assert_eq!(store.incr_window("w", window).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_store_windows_are_per_key() {
        let store = MemoryCounterStore::new();
        let window = Duration::from_secs(10);

        assert_eq!(store.incr_window("a", window).await.unwrap(), 1);
        assert_eq!(store.incr_window("b", window).await.unwrap(), 1);
        assert_eq!(store.incr_window("a", window).await.unwrap(), 2);
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn redis_store_window_round_trip() {
        let store = RedisCounterStore::connect("redis://localhost:6379")
            .await
            .unwrap();
        let key = format!("portico_test_store_{}", uuid::Uuid::new_v4());

        assert_eq!(
            store
                .incr_window(&key, Duration::from_secs(5))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .incr_window(&key, Duration::from_secs(5))
                .await
                .unwrap(),
            2
        );
    }
}
