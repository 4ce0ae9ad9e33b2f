// ============================================================================
// Rate Limiter
// ============================================================================
//
// Fixed-window counter keyed by client IP, window 60s by default. Active
// subscribers bypass the quota entirely. The increment and the window expiry
// are one atomic store operation, so the decision is exact: the first
// `limit` increments within a window proceed, every later one rejects.
//
// If the counter store is unreachable the limiter fails open and logs; see
// DESIGN.md for the rationale.
//
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;

use super::subscription::SubscriptionResolver;
use crate::config::RateLimitConfig;
use crate::store::CounterStore;

pub const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit:";

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Reject,
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    subscriptions: SubscriptionResolver,
    requests_per_minute: i64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn CounterStore>,
        subscriptions: SubscriptionResolver,
        config: &RateLimitConfig,
    ) -> Self {
        Self {
            store,
            subscriptions,
            requests_per_minute: config.requests_per_minute,
            window: Duration::from_secs(config.window_secs),
        }
    }

    /// Decide whether the client identified by `client_ip` (and optionally
    /// an authenticated `subject`) may proceed.
    pub async fn check(
        &self,
        client_ip: &str,
        subject: Option<&str>,
        inbound: &HeaderMap,
    ) -> Decision {
        // Subscribers bypass the quota entirely
        if self.subscriptions.is_active(subject, inbound).await {
            return Decision::Proceed;
        }

        let key = format!("{}{}", RATE_LIMIT_KEY_PREFIX, client_ip);
        match self.store.incr_window(&key, self.window).await {
            Ok(count) if count > self.requests_per_minute => {
                tracing::warn!(
                    ip = %client_ip,
                    count,
                    limit = self.requests_per_minute,
                    "Rate limit exceeded"
                );
                Decision::Reject
            }
            Ok(_) => Decision::Proceed,
            Err(e) => {
                // Fail open: availability over strictness when the store is down
                tracing::error!(error = %e, ip = %client_ip, "Counter store unavailable, allowing request");
                Decision::Proceed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::gateway::discovery::StaticServiceDiscovery;
    use crate::gateway::service_client::ServiceClient;
    use crate::store::{MemoryCounterStore, StoreError, StoreResult};
    use async_trait::async_trait;

    fn limiter(store: Arc<dyn CounterStore>, limit: i64, window_secs: u64) -> RateLimiter {
        let config = Arc::new(UpstreamConfig {
            user_service_url: "http://127.0.0.1:1".to_string(),
            core_service_url: "http://127.0.0.1:1".to_string(),
            streaming_service_url: "http://127.0.0.1:1".to_string(),
            messaging_service_url: "http://127.0.0.1:1".to_string(),
            discovery_mode: "static".to_string(),
            service_timeout_secs: 1,
        });
        let subscriptions = SubscriptionResolver::new(
            store.clone(),
            ServiceClient::new(1),
            Arc::new(StaticServiceDiscovery::new(config)),
        );
        RateLimiter::new(
            store,
            subscriptions,
            &RateLimitConfig {
                requests_per_minute: limit,
                window_secs,
            },
        )
    }

    #[tokio::test]
    async fn allows_up_to_the_limit_then_rejects() {
        let limiter = limiter(Arc::new(MemoryCounterStore::new()), 3, 60);
        let headers = HeaderMap::new();

        for _ in 0..3 {
            assert_eq!(
                limiter.check("203.0.113.7", None, &headers).await,
                Decision::Proceed
            );
        }
        assert_eq!(
            limiter.check("203.0.113.7", None, &headers).await,
            Decision::Reject
        );
    }

    #[tokio::test]
    async fn limits_are_per_client() {
        let limiter = limiter(Arc::new(MemoryCounterStore::new()), 1, 60);
        let headers = HeaderMap::new();

        assert_eq!(
            limiter.check("203.0.113.7", None, &headers).await,
            Decision::Proceed
        );
        assert_eq!(
            limiter.check("203.0.113.7", None, &headers).await,
            Decision::Reject
        );
        // A different client has its own window
        assert_eq!(
            limiter.check("203.0.113.8", None, &headers).await,
            Decision::Proceed
        );
    }

    #[tokio::test]
    async fn window_elapse_resets_the_counter() {
        let limiter = limiter(Arc::new(MemoryCounterStore::new()), 1, 1);
        let headers = HeaderMap::new();

        assert_eq!(
            limiter.check("203.0.113.7", None, &headers).await,
            Decision::Proceed
        );
        assert_eq!(
            limiter.check("203.0.113.7", None, &headers).await,
            Decision::Reject
        );

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(
            limiter.check("203.0.113.7", None, &headers).await,
            Decision::Proceed
        );
    }

    #[tokio::test]
    async fn active_subscriber_bypasses_the_quota() {
        let store = Arc::new(MemoryCounterStore::new());
        store
            .set_with_ttl(
                "subscription:active:user-42",
                "true",
                Duration::from_secs(300),
            )
            .await
            .unwrap();

        let limiter = limiter(store, 1, 60);
        let headers = HeaderMap::new();

        // Well past the quota, every request proceeds
        for _ in 0..5 {
            assert_eq!(
                limiter.check("203.0.113.7", Some("user-42"), &headers).await,
                Decision::Proceed
            );
        }
    }

    struct FailingStore;

    #[async_trait]
    impl CounterStore for FailingStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Timeout)
        }
        async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
            Err(StoreError::Timeout)
        }
        async fn incr_window(&self, _key: &str, _window: Duration) -> StoreResult<i64> {
            Err(StoreError::Timeout)
        }
        async fn ping(&self) -> StoreResult<()> {
            Err(StoreError::Timeout)
        }
    }

    #[tokio::test]
    async fn store_outage_fails_open() {
        let limiter = limiter(Arc::new(FailingStore), 1, 60);
        let headers = HeaderMap::new();

        for _ in 0..5 {
            assert_eq!(
                limiter.check("203.0.113.7", None, &headers).await,
                Decision::Proceed
            );
        }
    }
}
