/// Token Revocation Cache
///
/// In-memory record of access tokens that must be rejected before their
/// natural expiry. Process-scoped and injected at startup rather than a
/// global singleton. Single-node, best-effort: entries are not synchronized
/// across nodes.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

const DEFAULT_RETENTION_SECS: i64 = 3600;

/// Deny-list of logged-out access tokens with time-bounded retention
///
/// The retention window must be >= the maximum access token ttl in a
/// correct deployment; `sweep` does not check whether an entry could still
/// correspond to an unexpired token.
pub struct TokenBlacklist {
    retention: Duration,
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl TokenBlacklist {
    pub fn new(retention_secs: i64) -> Self {
        Self {
            retention: Duration::seconds(retention_secs),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record a token as revoked. Idempotent; re-blacklisting refreshes the
    /// entry timestamp.
    pub fn blacklist(&self, token: &str) {
        let mut entries = self.entries.write().expect("blacklist lock poisoned");
        entries.insert(token.to_string(), Utc::now());
    }

    /// A present entry means the token is rejected regardless of signature
    /// validity.
    pub fn is_blacklisted(&self, token: &str) -> bool {
        let entries = self.entries.read().expect("blacklist lock poisoned");
        entries.contains_key(token)
    }

    /// Remove entries older than the retention window. Returns the number of
    /// entries removed. Holds the write lock only for its own removal pass.
    pub fn sweep(&self) -> usize {
        let cutoff = Utc::now() - self.retention;
        let mut entries = self.entries.write().expect("blacklist lock poisoned");
        let before = entries.len();
        entries.retain(|_, blacklisted_at| *blacklisted_at >= cutoff);
        before - entries.len()
    }

    #[cfg(test)]
    fn backdate(&self, token: &str, age_secs: i64) {
        let mut entries = self.entries.write().expect("blacklist lock poisoned");
        entries.insert(token.to_string(), Utc::now() - Duration::seconds(age_secs));
    }
}

impl Default for TokenBlacklist {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_SECS)
    }
}
