//! Session store for renewal credentials
//!
//! Holds one entry per live session: key `session:{session_id}`, value the
//! session's current renewal credential, with a per-key time-to-live. An
//! absent key means the session is terminated; the store does not record
//! whether it expired, was rotated away, or was revoked.
//!
//! Back ends:
//! - `MemorySessionStore` for tests and single-process deployments
//! - `RedisSessionStore` for production
//!
//! Wrap either in `TimeoutStore` so that no call blocks the caller
//! indefinitely. A timed-out call surfaces as `Error::Timeout`, never as
//! "absent".

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod timeout;

pub use error::{Error, Result};
pub use memory::MemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use timeout::TimeoutStore;

use common::Secret;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Prefix for every session key.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Boxed future returned by `SessionStore` methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Build the store key for a session id.
pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{session_id}")
}

/// Key/value store with per-key expiry, keyed by session id.
///
/// Uses `Pin<Box<dyn Future>>` return types so the store can be shared as
/// `Arc<dyn SessionStore>`.
pub trait SessionStore: Send + Sync {
    /// Back end name for logging and health reporting.
    fn backend(&self) -> &'static str;

    /// Write the renewal credential for a session, replacing any previous
    /// value and resetting the TTL.
    fn put<'a>(
        &'a self,
        session_id: &'a str,
        renewal_credential: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, ()>;

    /// Whether a live entry exists for the session.
    fn exists<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, bool>;

    /// Atomically read and delete the session's entry.
    ///
    /// Of any number of concurrent `take` calls on the same session, at most
    /// one observes `Some`.
    fn take<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<Secret<String>>>;

    /// Round-trip check used at startup.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
