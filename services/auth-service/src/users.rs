//! User directory: email → (id, password hash)
//!
//! `PgUserDirectory` backs production against the `users` table;
//! `MemoryUserDirectory` serves tests and deployments without a database.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("email already registered")]
    Conflict,

    #[error("user directory unavailable: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => DirectoryError::Conflict,
            _ => DirectoryError::Backend(err.to_string()),
        }
    }
}

pub type DirectoryFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, DirectoryError>> + Send + 'a>>;

pub trait UserDirectory: Send + Sync {
    /// Insert a user and return its id. Fails with `Conflict` if the email
    /// is taken.
    fn create<'a>(&'a self, email: &'a str, password_hash: &'a str) -> DirectoryFuture<'a, i32>;

    fn find_by_email<'a>(&'a self, email: &'a str) -> DirectoryFuture<'a, Option<UserRecord>>;
}

#[derive(Default)]
struct MemoryUsers {
    by_email: HashMap<String, UserRecord>,
    last_id: i32,
}

/// In-process directory with sequential ids starting at 1.
#[derive(Default)]
pub struct MemoryUserDirectory {
    inner: RwLock<MemoryUsers>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn create<'a>(&'a self, email: &'a str, password_hash: &'a str) -> DirectoryFuture<'a, i32> {
        Box::pin(async move {
            let mut users = self.inner.write().await;
            if users.by_email.contains_key(email) {
                return Err(DirectoryError::Conflict);
            }
            users.last_id += 1;
            let id = users.last_id;
            users.by_email.insert(
                email.to_owned(),
                UserRecord {
                    id,
                    email: email.to_owned(),
                    password_hash: password_hash.to_owned(),
                },
            );
            Ok(id)
        })
    }

    fn find_by_email<'a>(&'a self, email: &'a str) -> DirectoryFuture<'a, Option<UserRecord>> {
        Box::pin(async move { Ok(self.inner.read().await.by_email.get(email).cloned()) })
    }
}

/// Postgres directory over
/// `users(id SERIAL PRIMARY KEY, email TEXT UNIQUE NOT NULL, password_hash TEXT NOT NULL)`.
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Connect a pool. Fails if the database is unreachable.
    pub async fn connect(database_url: &str) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

impl UserDirectory for PgUserDirectory {
    fn create<'a>(&'a self, email: &'a str, password_hash: &'a str) -> DirectoryFuture<'a, i32> {
        Box::pin(async move {
            let id: i32 = sqlx::query_scalar(
                "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id",
            )
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await?;
            Ok(id)
        })
    }

    fn find_by_email<'a>(&'a self, email: &'a str) -> DirectoryFuture<'a, Option<UserRecord>> {
        Box::pin(async move {
            let user = sqlx::query_as::<_, UserRecord>(
                "SELECT id, email, password_hash FROM users WHERE email = $1",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
            Ok(user)
        })
    }
}
