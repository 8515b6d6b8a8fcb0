//! Redis-backed session store
//!
//! Uses a multiplexed `ConnectionManager` (reconnects on failure, cheap to
//! clone per call). `take` is a single `GETDEL` so that read-and-delete is
//! atomic on the server; it requires Redis 6.2 or newer.

use std::time::Duration;

use common::Secret;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::error::Result;
use crate::{SessionStore, StoreFuture, session_key};

pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    /// Open a managed connection to the given `redis://` URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("connected to redis session store");
        Ok(Self { conn })
    }
}

impl SessionStore for RedisSessionStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    fn put<'a>(
        &'a self,
        session_id: &'a str,
        renewal_credential: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            // Redis rejects EX 0; a sub-second TTL rounds up to one second.
            let ttl_secs = ttl.as_secs().max(1);
            let _: () = redis::cmd("SET")
                .arg(session_key(session_id))
                .arg(renewal_credential)
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await?;
            debug!(session_id, ttl_secs, "stored session");
            Ok(())
        })
    }

    fn exists<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let found: bool = redis::cmd("EXISTS")
                .arg(session_key(session_id))
                .query_async(&mut conn)
                .await?;
            Ok(found)
        })
    }

    fn take<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let value: Option<String> = redis::cmd("GETDEL")
                .arg(session_key(session_id))
                .query_async(&mut conn)
                .await?;
            debug!(session_id, found = value.is_some(), "took session");
            Ok(value.map(Secret::new))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
    }
}
