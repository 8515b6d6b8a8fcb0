//! In-process session store
//!
//! A tokio Mutex over a `HashMap` serializes every operation, which makes
//! `take` atomic with respect to concurrent callers. Expired entries are
//! dropped lazily when touched; there is no background sweeper.
//!
//! Expiry uses `tokio::time::Instant`, so tests can drive TTLs with
//! `tokio::time::pause()` / `advance()`.

use std::collections::HashMap;
use std::time::Duration;

use common::Secret;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::{SessionStore, StoreFuture, session_key};

struct Entry {
    renewal_credential: Secret<String>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Session store held in process memory.
#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) sessions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let state = self.state.lock().await;
        state.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn put<'a>(
        &'a self,
        session_id: &'a str,
        renewal_credential: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.insert(
                session_key(session_id),
                Entry {
                    renewal_credential: Secret::new(renewal_credential.to_owned()),
                    expires_at: Instant::now() + ttl,
                },
            );
            debug!(session_id, ttl_secs = ttl.as_secs(), "stored session");
            Ok(())
        })
    }

    fn exists<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let key = session_key(session_id);
            let mut state = self.state.lock().await;
            match state.get(&key) {
                Some(entry) if entry.is_live(Instant::now()) => Ok(true),
                Some(_) => {
                    state.remove(&key);
                    Ok(false)
                }
                None => Ok(false),
            }
        })
    }

    fn take<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let taken = state
                .remove(&session_key(session_id))
                .filter(|entry| entry.is_live(Instant::now()))
                .map(|entry| entry.renewal_credential);
            debug!(session_id, found = taken.is_some(), "took session");
            Ok(taken)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
