//! Access credential claims and JWT encoding
//!
//! Two decode paths:
//! - `decode_verified` checks algorithm (HS256 only), signature, and subject.
//!   Expiry is compared by the caller against its own clock.
//! - `decode_unverified` only parses the structure. It exists for renewal,
//!   which has to work precisely when the access credential has expired;
//!   the renewal credential is the secret that authorizes rotation.

use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::constants::{ACCESS_TOKEN_SUBJECT, ACCESS_TOKEN_TTL_SECS};
use crate::key::SigningKey;

/// Claims embedded in every access credential.
///
/// `iat` and `exp` are unix timestamps in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub session_id: String,
    pub iat: u64,
    pub exp: u64,
    pub sub: String,
}

impl Claims {
    /// Claims for a fresh access credential issued at `now`.
    pub fn access(user_id: i32, session_id: String, now: u64) -> Self {
        Self {
            user_id,
            session_id,
            iat: now,
            exp: now + ACCESS_TOKEN_TTL_SECS,
            sub: ACCESS_TOKEN_SUBJECT.to_owned(),
        }
    }

    /// Whether the credential has lapsed at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.exp
    }

    /// Sign as a compact HS256 JWT.
    pub fn sign(&self, key: &SigningKey) -> jsonwebtoken::errors::Result<String> {
        encode(&Header::new(Algorithm::HS256), self, &key.encoding_key())
    }
}

/// The part of an access credential renewal reads.
///
/// Renewal is authorized by the renewal credential, not by these claims, so
/// only `user_id` is required. Timestamps and subject are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenewalClaims {
    pub user_id: i32,
    /// Missing in a malformed token; renewal rejects it as empty.
    #[serde(default)]
    pub session_id: String,
}

/// Parse and authenticate a token. Does not check expiry.
pub fn decode_verified(token: &str, key: &SigningKey) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation.sub = Some(ACCESS_TOKEN_SUBJECT.to_owned());
    decode::<Claims>(token, &key.decoding_key(), &validation).map(|data| data.claims)
}

/// Parse a token's claims without checking signature, algorithm, or expiry.
pub fn decode_unverified(token: &str) -> jsonwebtoken::errors::Result<RenewalClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    decode::<RenewalClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
}
