//! Error types for session store operations

/// Errors from session store operations.
///
/// Absence of a session is not an error; it is reported as `None`/`false`
/// by the store methods.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session store call timed out after {0}ms")]
    Timeout(u64),
}

/// Result alias for session store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Unavailable(e.to_string())
    }
}
