// ============================================================================
// Subscription Resolver
// ============================================================================
//
// Decides whether a subject holds an active paid subscription, caching the
// answer in the counter store. The resolver never raises: every failure
// degrades to "not subscribed" so callers fall back to normal rate limiting.
//
// Cache policy: "true" is trusted for 300s, "false" only for 60s so a fresh
// subscription is picked up quickly.
//
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use super::discovery::ServiceDiscovery;
use super::service_client::ServiceClient;
use super::Service;
use crate::error::AppResult;
use crate::store::CounterStore;

pub const SUBSCRIPTION_CACHE_PREFIX: &str = "subscription:active:";

const POSITIVE_TTL: Duration = Duration::from_secs(300);
const NEGATIVE_TTL: Duration = Duration::from_secs(60);

pub struct SubscriptionResolver {
    store: Arc<dyn CounterStore>,
    client: ServiceClient,
    discovery: Arc<dyn ServiceDiscovery>,
}

impl SubscriptionResolver {
    pub fn new(
        store: Arc<dyn CounterStore>,
        client: ServiceClient,
        discovery: Arc<dyn ServiceDiscovery>,
    ) -> Self {
        Self {
            store,
            client,
            discovery,
        }
    }

    /// Whether `subject` has an active subscription. Infallible; anything
    /// short of a verified active subscription is `false`.
    pub async fn is_active(&self, subject: Option<&str>, inbound: &HeaderMap) -> bool {
        let Some(subject) = subject else {
            // Unauthenticated requests never bypass rate limiting
            return false;
        };

        let cache_key = format!("{}{}", SUBSCRIPTION_CACHE_PREFIX, subject);
        match self.store.get(&cache_key).await {
            Ok(Some(cached)) => return cached == "true",
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Subscription cache unavailable, treating as not subscribed");
                return false;
            }
        }

        match self.lookup(subject, &cache_key, inbound).await {
            Ok(active) => active,
            Err(e) => {
                tracing::debug!(error = %e, subject = %subject, "Subscription lookup failed, treating as not subscribed");
                false
            }
        }
    }

    /// Resolve the subscription from the user service: user record ->
    /// subscription record -> expiry check.
    async fn lookup(&self, subject: &str, cache_key: &str, inbound: &HeaderMap) -> AppResult<bool> {
        let base_url = self
            .discovery
            .resolve(Service::User)
            .map_err(|e| crate::error::AppError::internal(e.to_string()))?;
        let headers = lookup_headers(inbound);

        let Some(user) = self
            .client
            .get_json(&base_url, &format!("/users/{}", subject), headers.clone())
            .await?
        else {
            self.cache(cache_key, false).await;
            return Ok(false);
        };

        let Some(subscription_id) = user.get("subscriptionId").and_then(|v| v.as_str()) else {
            self.cache(cache_key, false).await;
            return Ok(false);
        };

        let Some(subscription) = self
            .client
            .get_json(
                &base_url,
                &format!("/users/subscriptions/{}", subscription_id),
                headers,
            )
            .await?
        else {
            self.cache(cache_key, false).await;
            return Ok(false);
        };

        let active = subscription
            .get("expiryDate")
            .and_then(|v| v.as_str())
            .and_then(parse_expiry)
            .is_some_and(|expiry| expiry > Utc::now());

        self.cache(cache_key, active).await;
        Ok(active)
    }

    /// Cache writes are best-effort; a failed write never fails the lookup.
    async fn cache(&self, key: &str, active: bool) {
        let (value, ttl) = if active {
            ("true", POSITIVE_TTL)
        } else {
            ("false", NEGATIVE_TTL)
        };
        if let Err(e) = self.store.set_with_ttl(key, value, ttl).await {
            tracing::debug!(error = %e, "Failed to cache subscription status");
        }
    }
}

/// Minimal header set for internal lookups: JSON content type plus the
/// caller's Authorization so the user service can authorize the read.
fn lookup_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Some(auth) = inbound.get(header::AUTHORIZATION) {
        headers.insert(header::AUTHORIZATION, auth.clone());
    }
    headers
}

/// Parse a subscription expiry: RFC 3339 first, then a bare ISO-8601
/// datetime (treated as UTC).
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
