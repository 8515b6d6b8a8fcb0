//! Token lifetimes and fixed claim values

use std::time::Duration;

/// Access credential validity window (15 minutes).
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Lifetime of a session entry in the store (7 days). Applied on every
/// issuance; never extended in place.
pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// `sub` claim carried by every access credential.
pub const ACCESS_TOKEN_SUBJECT: &str = "access_token";

/// Random bytes in a renewal credential before encoding.
pub const RENEWAL_CREDENTIAL_BYTES: usize = 32;

/// Environment variable holding the HS256 signing secret.
pub const SIGNING_KEY_ENV: &str = "JWT_SECRET";
