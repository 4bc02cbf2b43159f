//! # Cross-Request Cache and Clock
//!
//! Shared, TTL-bounded storage for values that are expensive to rebuild on
//! every request: the taxability index and raw base prices.
//!
//! ## Two Cache Tiers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request-scoped memo (RequestContext)     cross-request (TtlCache)     │
//! │  ───────────────────────────────────      ───────────────────────────  │
//! │  one request, one thread, no locks        shared by all requests       │
//! │  rates, modes, taxable flags              taxable_categories     1h    │
//! │  resolved jurisdiction                    raw_price:{id}         1h    │
//! │                                           cart_price:{id}        5m    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent writers may race on the same key. Last writer wins, which is
//! fine because every stored value is a pure function of the same inputs.
//! There is no explicit invalidation: entries simply expire.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

// =============================================================================
// Clock
// =============================================================================

/// Source of "now". Injected so TTLs and sale windows are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        ManualClock {
            now: RwLock::new(at),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

// =============================================================================
// TTL Cache
// =============================================================================

/// Get/set-with-TTL by string key.
pub trait TtlCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value, ttl: Duration);
}

/// Typed helpers over any [`TtlCache`].
pub trait TtlCacheExt: TtlCache {
    /// Reads and deserializes. A value of the wrong shape counts as a miss.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key, error = %e, "Discarding malformed cache entry");
                None
            }
        }
    }

    /// Serializes and stores. Values that fail to serialize are not cached.
    fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(json) => self.set(key, json, ttl),
            Err(e) => warn!(key, error = %e, "Value not cacheable"),
        }
    }
}

impl<C: TtlCache + ?Sized> TtlCacheExt for C {}

/// Cache keys used by the pricing engine.
pub mod keys {
    use crate::types::ProductId;

    pub const TAXABLE_CATEGORIES: &str = "taxable_categories";

    pub fn catalog_price(id: ProductId) -> String {
        format!("raw_price:{}", id)
    }

    pub fn cart_price(id: ProductId) -> String {
        format!("cart_price:{}", id)
    }
}

// =============================================================================
// Memory Cache
// =============================================================================

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// Process-local [`TtlCache`].
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryCache {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|_, entry| entry.expires_at > now);
    }
}

impl TtlCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), Entry { value, expires_at });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn setup() -> (Arc<ManualClock>, MemoryCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let cache = MemoryCache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (clock, cache) = setup();
        cache.set("k", json!(1), Duration::minutes(5));

        clock.advance(Duration::minutes(4));
        assert_eq!(cache.get("k"), Some(json!(1)));

        clock.advance(Duration::minutes(1));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_last_writer_wins() {
        let (_, cache) = setup();
        cache.set("k", json!("a"), Duration::hours(1));
        cache.set("k", json!("b"), Duration::hours(1));
        assert_eq!(cache.get("k"), Some(json!("b")));
    }

    #[test]
    fn test_typed_helpers() {
        let (_, cache) = setup();
        cache.set_as("ids", &vec![1u64, 2, 3], Duration::hours(1));
        assert_eq!(cache.get_as::<Vec<u64>>("ids"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get_as::<String>("ids"), None);
    }

    #[test]
    fn test_purge_expired() {
        let (clock, cache) = setup();
        cache.set("short", json!(1), Duration::minutes(5));
        cache.set("long", json!(2), Duration::hours(1));

        clock.advance(Duration::minutes(10));
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_price_keys_are_tiered() {
        use crate::types::ProductId;
        assert_eq!(keys::catalog_price(ProductId(5)), "raw_price:5");
        assert_eq!(keys::cart_price(ProductId(5)), "cart_price:5");
    }
}
