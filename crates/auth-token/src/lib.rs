//! Access and renewal credential lifecycle
//!
//! Mints short-lived HS256 access credentials and one-time-use renewal
//! credentials, verifies access credentials against the session store, and
//! rotates sessions on renewal. Depends only on the `SessionStore` trait, so
//! the same code runs against Redis in production and memory in tests.
//!
//! Flow:
//! 1. Login succeeds → `TokenService::issue(user_id)` → session stored
//! 2. Other services → `TokenService::verify(access_token)` → read-only check
//! 3. Access credential lapses → `TokenService::renew(access, refresh)` →
//!    old session consumed, new session issued
//! 4. Wrong renewal credential → session revoked, caller must log in again

pub mod claims;
pub mod constants;
pub mod credential;
pub mod error;
pub mod key;
pub mod service;

pub use claims::{Claims, RenewalClaims};
pub use constants::*;
pub use error::{IssueError, KeyError, RenewError, VerifyFailure};
pub use key::SigningKey;
pub use service::{TokenPair, TokenService, Verification};

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
