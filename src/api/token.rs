//! Bearer token storage and the short-lived read memo used by the API client

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Persisted bearer token, shared between the auth session (writer) and
/// the API client (reader).
#[derive(Clone, Default)]
pub struct TokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct MemoEntry {
    token: Option<String>,
    read_at: Instant,
}

/// Memoizes reads of the [`TokenStore`] for a short freshness window.
///
/// A stored token is served from the memo while it is younger than `ttl`;
/// an empty read is never served from the memo.
pub struct TokenMemo {
    store: TokenStore,
    ttl: Duration,
    entry: RwLock<Option<MemoEntry>>,
}

impl TokenMemo {
    pub fn new(store: TokenStore, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Option<String> {
        {
            let entry = self.entry.read().await;
            if let Some(MemoEntry {
                token: Some(token),
                read_at,
            }) = entry.as_ref()
            {
                if read_at.elapsed() < self.ttl {
                    return Some(token.clone());
                }
            }
        }

        let token = self.store.get().await;
        *self.entry.write().await = Some(MemoEntry {
            token: token.clone(),
            read_at: Instant::now(),
        });
        token
    }

    /// Force the next read to go to the store
    pub async fn clear(&self) {
        *self.entry.write().await = None;
    }
}
