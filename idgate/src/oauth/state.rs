//! CSRF state management
//!
//! State values correlate a callback with a login attempt this gateway
//! started. Lifecycle: issued at authorize-URL-build time, consumed exactly
//! once at callback time, invalid after the configured TTL. A replayed,
//! unknown, or expired state fails the callback before any exchange call.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Error;

/// State issuance and single-use consumption
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Generate, record, and return a new state value
    async fn issue(&self, provider: &str) -> Result<String, Error>;

    /// Consume a state value
    ///
    /// Returns the provider key recorded at issue time, or an error if the
    /// state is unknown, expired, or already consumed.
    async fn consume(&self, state: &str) -> Result<String, Error>;
}

/// Generate a cryptographically secure random state value
///
/// 32 random bytes (256 bits of entropy), base64 URL-safe without padding.
pub fn generate_state() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::rng().random();
    base64_url_encode(&bytes)
}

/// Base64 URL-safe encoding without padding
fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(bytes)
}

struct StateEntry {
    provider: String,
    issued_at: Instant,
}

/// In-memory state store with TTL-based eviction
///
/// Backed by a concurrent map; no lock is held across any network call (the
/// store is only touched before the exchange begins). Expired entries are
/// swept on each issue, so an abandoned login attempt leaves nothing behind
/// past the TTL.
pub struct MemoryStateStore {
    entries: DashMap<String, StateEntry>,
    ttl: Duration,
}

impl MemoryStateStore {
    /// Create a store with the given state TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn sweep(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.issued_at.elapsed() < ttl);
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn issue(&self, provider: &str) -> Result<String, Error> {
        self.sweep();

        let state = generate_state();
        self.entries.insert(
            state.clone(),
            StateEntry {
                provider: provider.to_string(),
                issued_at: Instant::now(),
            },
        );
        Ok(state)
    }

    async fn consume(&self, state: &str) -> Result<String, Error> {
        // remove() returns the entry at most once, so a replay fails here
        let (_, entry) = self
            .entries
            .remove(state)
            .ok_or_else(|| Error::BadRequest("Invalid or expired state".to_string()))?;

        if entry.issued_at.elapsed() >= self.ttl {
            return Err(Error::BadRequest("Invalid or expired state".to_string()));
        }

        Ok(entry.provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStateStore {
        MemoryStateStore::new(Duration::from_secs(600))
    }

    #[test]
    fn test_generate_state_shape() {
        let state = generate_state();
        // Base64 URL-safe encoding of 32 bytes = 43 chars (without padding)
        assert_eq!(state.len(), 43);
        assert!(!state.contains('='));
        assert!(!state.contains('+'));
        assert!(!state.contains('/'));
    }

    #[test]
    fn test_generate_state_uniqueness() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_state()), "state value collided");
        }
    }

    #[tokio::test]
    async fn test_issue_then_consume() {
        let store = store();
        let state = store.issue("google").await.unwrap();
        let provider = store.consume(&state).await.unwrap();
        assert_eq!(provider, "google");
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let store = store();
        let state = store.issue("google").await.unwrap();
        assert!(store.consume(&state).await.is_ok());
        assert!(store.consume(&state).await.is_err());
    }

    #[tokio::test]
    async fn test_consume_unknown_state_fails() {
        let store = store();
        assert!(store.consume("never-issued").await.is_err());
    }

    #[tokio::test]
    async fn test_expired_state_is_rejected() {
        let store = MemoryStateStore::new(Duration::ZERO);
        let state = store.issue("naver").await.unwrap();
        assert!(store.consume(&state).await.is_err());
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_entries() {
        let store = MemoryStateStore::new(Duration::ZERO);
        store.issue("google").await.unwrap();
        store.issue("google").await.unwrap();
        // The next issue sweeps everything already expired, leaving only itself
        store.issue("google").await.unwrap();
        assert_eq!(store.entries.len(), 1);
    }
}
