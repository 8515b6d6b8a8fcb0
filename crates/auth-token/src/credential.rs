//! Random session identifiers and renewal credentials
//!
//! Both values are unguessable and unique by construction: session ids are
//! UUID v4 (122 random bits) and renewal credentials are 256 random bits.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

use crate::constants::RENEWAL_CREDENTIAL_BYTES;

/// Generate a new session id.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a new opaque renewal credential, URL-safe base64 without padding.
pub fn generate_renewal_credential() -> String {
    let mut bytes = [0u8; RENEWAL_CREDENTIAL_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
