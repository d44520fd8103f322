use crate::auth::auth::AuthUser;
use moka::sync::Cache;
use std::time::Duration;

/// Short-lived cache of resolved identities. A miss must always fall
/// through to the identity provider; entries are a performance shortcut only.
pub trait IdentityCache: Send + Sync {
    fn get(&self, key: &str) -> Option<AuthUser>;
    fn set(&self, key: &str, user: AuthUser);
    fn ttl(&self) -> Duration;
}

/// Tokens are keyed by their trailing characters, which fall inside the
/// signature segment and so differ between any two issued tokens.
const CACHE_KEY_LEN: usize = 32;

pub fn cache_key(token: &str) -> &str {
    let start = token.len().saturating_sub(CACHE_KEY_LEN);
    // JWTs are ASCII; fall back to the whole token for anything else
    token.get(start..).unwrap_or(token)
}

pub struct MokaIdentityCache {
    inner: Cache<String, AuthUser>,
    ttl: Duration,
}

impl MokaIdentityCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }
}

impl IdentityCache for MokaIdentityCache {
    fn get(&self, key: &str) -> Option<AuthUser> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, user: AuthUser) {
        self.inner.insert(key.to_string(), user);
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Cache whose notion of "now" only moves when the test advances it.
    pub(crate) struct ManualClockCache {
        now_secs: AtomicU64,
        ttl: Duration,
        entries: RwLock<HashMap<String, (AuthUser, u64)>>,
    }

    impl ManualClockCache {
        pub(crate) fn new(ttl: Duration) -> Self {
            Self {
                now_secs: AtomicU64::new(0),
                ttl,
                entries: RwLock::new(HashMap::new()),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            self.now_secs.fetch_add(by.as_secs(), Ordering::SeqCst);
        }
    }

    impl IdentityCache for ManualClockCache {
        fn get(&self, key: &str) -> Option<AuthUser> {
            let now = self.now_secs.load(Ordering::SeqCst);
            let entries = self.entries.read().expect("cache poisoned");
            entries
                .get(key)
                .filter(|(_, stored_at)| now < stored_at + self.ttl.as_secs())
                .map(|(user, _)| user.clone())
        }

        fn set(&self, key: &str, user: AuthUser) {
            let now = self.now_secs.load(Ordering::SeqCst);
            self.entries
                .write()
                .expect("cache poisoned")
                .insert(key.to_string(), (user, now));
        }

        fn ttl(&self) -> Duration {
            self.ttl
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualClockCache;
    use super::*;
    use crate::auth::auth::tests::user;
    use crate::model::role::Role;

    #[test]
    fn cache_key_takes_token_tail() {
        let token = format!("{}{}", "h".repeat(40), "s".repeat(32));
        assert_eq!(cache_key(&token), "s".repeat(32));
        assert_eq!(cache_key("short"), "short");
    }

    #[test]
    fn moka_cache_stores_and_returns() {
        let cache = MokaIdentityCache::new(Duration::from_secs(30), 100);
        assert!(cache.get("k").is_none());
        cache.set("k", user(Role::Teacher, Some(1)));
        assert_eq!(cache.get("k").unwrap().school_id, Some(1));
        assert_eq!(cache.ttl(), Duration::from_secs(30));
    }

    #[test]
    fn manual_cache_expires_after_ttl() {
        let cache = ManualClockCache::new(Duration::from_secs(30));
        cache.set("k", user(Role::Teacher, Some(1)));

        cache.advance(Duration::from_secs(29));
        assert!(cache.get("k").is_some());

        cache.advance(Duration::from_secs(1));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn set_overwrites_existing_entry() {
        let cache = ManualClockCache::new(Duration::from_secs(30));
        cache.set("k", user(Role::Teacher, Some(1)));
        cache.set("k", user(Role::SchoolAdmin, Some(2)));
        assert_eq!(cache.get("k").unwrap().role, Role::SchoolAdmin);
    }
}
