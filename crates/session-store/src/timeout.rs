//! Bounded-latency wrapper for any session store

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use tracing::warn;

use crate::error::{Error, Result};
use crate::{SessionStore, StoreFuture};

/// Applies a deadline to every call on the wrapped store.
///
/// An elapsed deadline becomes `Error::Timeout`; it is never reported as a
/// missing session.
pub struct TimeoutStore {
    inner: Arc<dyn SessionStore>,
    timeout: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn SessionStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, op: &'static str, fut: StoreFuture<'_, T>) -> Result<T> {
        deadline(self.timeout, op, fut).await
    }
}

async fn deadline<T>(
    limit: Duration,
    op: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let millis = limit.as_millis() as u64;
            warn!(op, timeout_ms = millis, "session store call timed out");
            Err(Error::Timeout(millis))
        }
    }
}

impl SessionStore for TimeoutStore {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    fn put<'a>(
        &'a self,
        session_id: &'a str,
        renewal_credential: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.bounded("put", self.inner.put(session_id, renewal_credential, ttl)))
    }

    fn exists<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(self.bounded("exists", self.inner.exists(session_id)))
    }

    fn take<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(self.bounded("take", self.inner.take(session_id)))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.bounded("ping", self.inner.ping()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySessionStore;

    /// Store whose every call hangs far longer than any test deadline.
    struct StalledStore;

    impl SessionStore for StalledStore {
        fn backend(&self) -> &'static str {
            "stalled"
        }

        fn put<'a>(&'a self, _: &'a str, _: &'a str, _: Duration) -> StoreFuture<'a, ()> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
        }

        fn exists<'a>(&'a self, _: &'a str) -> StoreFuture<'a, bool> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(false)
            })
        }

        fn take<'a>(&'a self, _: &'a str) -> StoreFuture<'a, Option<Secret<String>>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            })
        }

        fn ping(&self) -> StoreFuture<'_, ()> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn passes_through_fast_calls() {
        let store = TimeoutStore::new(
            Arc::new(MemorySessionStore::new()),
            Duration::from_millis(500),
        );
        store
            .put("s1", "rt_1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.exists("s1").await.unwrap());
        assert_eq!(store.take("s1").await.unwrap().unwrap().expose(), "rt_1");
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_is_timeout_not_absence() {
        let store = TimeoutStore::new(Arc::new(StalledStore), Duration::from_millis(50));

        let exists = store.exists("s1").await;
        assert!(
            matches!(exists, Err(Error::Timeout(50))),
            "a stalled lookup must be a timeout, got {exists:?}"
        );

        let taken = store.take("s1").await;
        assert!(matches!(taken, Err(Error::Timeout(50))));

        let put = store.put("s1", "rt", Duration::from_secs(1)).await;
        assert!(matches!(put, Err(Error::Timeout(_))));
    }
}
