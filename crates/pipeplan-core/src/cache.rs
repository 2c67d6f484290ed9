//! In-memory plan cache keyed by context fingerprint.
//!
//! Entries expire after their TTL and are removed lazily when a lookup finds
//! them stale. There is no size bound or LRU eviction, so memory grows with
//! the number of distinct contexts seen within a TTL window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::context::Fingerprint;
use crate::plan::Plan;

#[derive(Debug, Clone)]
struct CacheEntry {
    plan: Arc<Plan>,
    expires_at: Instant,
}

/// Thread-safe TTL cache of validated plans.
///
/// Time comes from `tokio::time::Instant`, so a paused test runtime controls
/// expiry.
#[derive(Debug, Default)]
pub struct PlanCache {
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached plan if it is still fresh; evict it if it is not.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<Plan>> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(fingerprint) {
            Some(entry) if now < entry.expires_at => Some(Arc::clone(&entry.plan)),
            Some(_) => {
                entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    /// Store `plan` until `now + ttl`, replacing any previous entry.
    pub fn put(&self, fingerprint: Fingerprint, plan: Arc<Plan>, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.lock().insert(fingerprint, CacheEntry { plan, expires_at });
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::plan::Stage;
    use serde_json::json;

    fn fingerprint(branch: &str) -> Fingerprint {
        Context::from_value(json!({ "branch": branch }))
            .unwrap()
            .fingerprint()
    }

    fn plan(command: &str) -> Arc<Plan> {
        Arc::new(Plan::new(vec![Stage::new(
            "Step".to_string(),
            command.to_string(),
        )]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_then_get_returns_plan() {
        let cache = PlanCache::new();
        let key = fingerprint("main");
        cache.put(key.clone(), plan("echo a"), Duration::from_secs(60));

        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.stages()[0].command(), "echo a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = PlanCache::new();
        let key = fingerprint("main");
        cache.put(key.clone(), plan("echo a"), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(&key).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty(), "expired entry should be evicted on lookup");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entries_linger_until_looked_up() {
        let cache = PlanCache::new();
        cache.put(fingerprint("a"), plan("echo a"), Duration::from_secs(1));
        cache.put(fingerprint("b"), plan("echo b"), Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&fingerprint("a")).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_and_refreshes() {
        let cache = PlanCache::new();
        let key = fingerprint("main");
        cache.put(key.clone(), plan("echo old"), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put(key.clone(), plan("echo new"), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;

        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.stages()[0].command(), "echo new");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_never_fresh() {
        let cache = PlanCache::new();
        let key = fingerprint("main");
        cache.put(key.clone(), plan("echo a"), Duration::ZERO);
        assert!(cache.get(&key).is_none());
    }
}
