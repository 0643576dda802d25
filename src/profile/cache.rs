//! In-memory profile cache with TTL.
//! Key: username as submitted. TTL: 1 hour. No capacity bound.
//! Expiry is lazy: an entry past its TTL is dropped on the lookup that finds it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use super::ProfileRecord;

/// Default TTL for cached profiles: 1 hour.
pub const PROFILE_TTL: Duration = Duration::from_secs(3600);

/// Time source for expiry checks. Tests substitute a manually advanced clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now()`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    record: ProfileRecord,
    inserted_at: Instant,
}

pub struct ProfileCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ProfileCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(LruCache::unbounded()),
            ttl,
            clock,
        }
    }

    /// Cache with the default one hour TTL on the system clock.
    pub fn with_default_ttl() -> Self {
        Self::new(PROFILE_TTL, Arc::new(SystemClock))
    }

    /// Look up a cached profile. Returns None if absent or expired.
    pub fn get(&self, username: &str) -> Option<ProfileRecord> {
        let now = self.clock.now();
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(username) {
            if now.saturating_duration_since(entry.inserted_at) < self.ttl {
                return Some(entry.record.clone());
            }
            cache.pop(username);
        }
        None
    }

    /// Store a profile. The TTL starts now; an existing entry is replaced.
    pub fn set(&self, username: &str, record: ProfileRecord) {
        let inserted_at = self.clock.now();
        self.inner.lock().put(
            username.to_string(),
            CacheEntry {
                record,
                inserted_at,
            },
        );
    }

    /// Number of stored entries, expired ones included until they are looked up.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Clock that only moves when told to.
    pub(crate) struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.now.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }

    pub(crate) fn record(username: &str) -> ProfileRecord {
        ProfileRecord {
            username: username.to_string(),
            name: Some("The Octocat".into()),
            public_repos: 8,
            followers: 3938,
            following: 9,
            bio: None,
            location: Some("San Francisco".into()),
            company: Some("@github".into()),
            hireable: None,
            contributions_last_year: 42,
            avatar_url: None,
            html_url: None,
            created_at: None,
        }
    }

    #[test]
    fn returns_entry_within_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = ProfileCache::new(PROFILE_TTL, clock.clone());
        cache.set("octocat", record("octocat"));

        clock.advance(Duration::from_secs(3599));
        assert_eq!(cache.get("octocat"), Some(record("octocat")));
    }

    #[test]
    fn entry_expires_without_sweep() {
        let clock = Arc::new(ManualClock::new());
        let cache = ProfileCache::new(PROFILE_TTL, clock.clone());
        cache.set("octocat", record("octocat"));

        clock.advance(PROFILE_TTL);
        assert_eq!(cache.get("octocat"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn set_restarts_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = ProfileCache::new(PROFILE_TTL, clock.clone());
        cache.set("octocat", record("octocat"));
        clock.advance(Duration::from_secs(3000));

        let mut updated = record("octocat");
        updated.followers = 1;
        cache.set("octocat", updated.clone());
        clock.advance(Duration::from_secs(3000));

        assert_eq!(cache.get("octocat"), Some(updated));
    }

    #[test]
    fn keys_are_independent() {
        let cache = ProfileCache::with_default_ttl();
        cache.set("octocat", record("octocat"));
        assert!(cache.get("torvalds").is_none());
        assert_eq!(cache.len(), 1);
    }
}
