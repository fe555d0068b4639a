use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(300);

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// In-process cache of vendor access tokens, keyed by credential kind.
///
/// Entries expire early by a skew so a token is never used in its final
/// seconds of validity. `invalidate` supports the auth-expired error codes
/// vendors return before the advertised expiry.
pub struct TokenCache<K> {
    entries: Mutex<HashMap<K, CachedToken>>,
    skew: Duration,
}

impl<K: Eq + Hash + Clone> TokenCache<K> {
    pub fn new() -> Self {
        Self::with_skew(DEFAULT_EXPIRY_SKEW)
    }

    pub fn with_skew(skew: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), skew }
    }

    /// The cached token for `kind`, unless expired or absent
    pub fn get(&self, kind: &K) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(kind)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.token.clone())
    }

    /// Cache a token valid for `expires_in_secs`, shortened by the skew
    pub fn put(&self, kind: K, token: String, expires_in_secs: u64) {
        let ttl = Duration::from_secs(expires_in_secs).saturating_sub(self.skew);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(kind, CachedToken { token, expires_at: Instant::now() + ttl });
        }
    }

    pub fn invalidate(&self, kind: &K) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(kind);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl<K: Eq + Hash + Clone> Default for TokenCache<K> {
    fn default() -> Self {
        Self::new()
    }
}
