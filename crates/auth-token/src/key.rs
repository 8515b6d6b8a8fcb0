//! Signing key provider
//!
//! The HS256 secret is constructed once at startup and injected into
//! `TokenService`. Nothing reads it from ambient process state after that,
//! so tests can run issuers and verifiers with different keys side by side.

use common::Secret;
use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::error::KeyError;

/// Symmetric secret used to sign and verify access credentials.
#[derive(Clone)]
pub struct SigningKey {
    secret: Secret<Vec<u8>>,
}

impl SigningKey {
    /// Wrap raw key bytes. Rejects an empty secret.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self {
            secret: Secret::new(bytes),
        })
    }

    /// Load the secret from an environment variable.
    ///
    /// Surrounding whitespace is trimmed; a missing or blank variable is
    /// `KeyError::Missing`.
    pub fn from_env(var: &str) -> Result<Self, KeyError> {
        let value = std::env::var(var).map_err(|_| KeyError::Missing(var.to_owned()))?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(KeyError::Missing(var.to_owned()));
        }
        Self::new(trimmed.as_bytes().to_vec())
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose())
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("secret", &self.secret)
            .finish()
    }
}
