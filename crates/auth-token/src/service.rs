//! Issue, verify, and renew access/renewal credential pairs
//!
//! Session lifecycle:
//! - `issue` creates a session: new session id, signed access credential,
//!   renewal credential written to the store with `SESSION_TTL`
//! - `verify` is read-only: signature/subject/expiry, then session existence
//! - `renew` atomically takes the stored renewal credential; a match mints a
//!   brand-new session, a mismatch leaves the session deleted (revoked)
//!
//! A session with no store entry is terminated for good. Nothing recreates
//! an entry under an old session id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use session_store::SessionStore;
use tracing::{debug, error, info, warn};

use crate::claims::{Claims, decode_unverified, decode_verified};
use crate::constants::SESSION_TTL;
use crate::credential::{generate_renewal_credential, generate_session_id};
use crate::error::{IssueError, RenewError, VerifyFailure};
use crate::key::SigningKey;
use crate::unix_now;

/// Access/renewal credential pair returned by login and refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Result of verifying an access credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid { user_id: i32 },
    Invalid(VerifyFailure),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid { .. })
    }

    pub fn user_id(&self) -> Option<i32> {
        match self {
            Verification::Valid { user_id } => Some(*user_id),
            Verification::Invalid(_) => None,
        }
    }

    pub fn failure(&self) -> Option<VerifyFailure> {
        match self {
            Verification::Valid { .. } => None,
            Verification::Invalid(failure) => Some(*failure),
        }
    }
}

/// Token issuer, verifier, and renewal protocol over one signing key and
/// one session store.
pub struct TokenService {
    key: SigningKey,
    store: Arc<dyn SessionStore>,
}

impl TokenService {
    pub fn new(key: SigningKey, store: Arc<dyn SessionStore>) -> Self {
        Self { key, store }
    }

    /// Start a new session for `user_id`.
    pub async fn issue(&self, user_id: i32) -> Result<TokenPair, IssueError> {
        self.issue_at(user_id, unix_now()).await
    }

    /// `issue` with an explicit clock value (unix seconds).
    ///
    /// If the store write fails the signed access credential is dropped and
    /// the caller gets nothing.
    pub async fn issue_at(&self, user_id: i32, now: u64) -> Result<TokenPair, IssueError> {
        let session_id = generate_session_id();
        let refresh_token = generate_renewal_credential();

        let access_token = Claims::access(user_id, session_id.clone(), now)
            .sign(&self.key)
            .map_err(|e| IssueError::Signing(e.to_string()))?;

        self.store
            .put(&session_id, &refresh_token, SESSION_TTL)
            .await
            .inspect_err(|e| error!(user_id, error = %e, "failed to persist new session"))?;

        info!(user_id, session_id = %session_id, "issued session");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Two-phase verification of an access credential.
    pub async fn verify(&self, access_token: &str) -> Verification {
        self.verify_at(access_token, unix_now()).await
    }

    /// `verify` with an explicit clock value (unix seconds).
    pub async fn verify_at(&self, access_token: &str, now: u64) -> Verification {
        let claims = match decode_verified(access_token, &self.key) {
            Ok(claims) if !claims.is_expired(now) => claims,
            Ok(claims) => {
                debug!(session_id = %claims.session_id, "access token expired");
                return Verification::Invalid(VerifyFailure::InvalidOrExpired);
            }
            Err(e) => {
                debug!(error = %e, "access token rejected");
                return Verification::Invalid(VerifyFailure::InvalidOrExpired);
            }
        };

        match self.store.exists(&claims.session_id).await {
            Ok(true) => Verification::Valid {
                user_id: claims.user_id,
            },
            Ok(false) => {
                debug!(session_id = %claims.session_id, "session not active");
                Verification::Invalid(VerifyFailure::SessionRevokedOrInactive)
            }
            Err(e) => {
                error!(session_id = %claims.session_id, error = %e, "session lookup failed");
                Verification::Invalid(VerifyFailure::InternalError)
            }
        }
    }

    /// Rotate a session: consume its renewal credential and issue a new pair.
    ///
    /// The access credential is parsed without signature or expiry checks.
    /// Authority for rotation comes from the renewal credential alone; a
    /// forged access credential naming someone else's session still needs
    /// that session's renewal credential, and guessing wrong revokes it.
    pub async fn renew(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, RenewError> {
        self.renew_at(access_token, refresh_token, unix_now()).await
    }

    /// `renew` with an explicit clock value (unix seconds) for the new pair.
    pub async fn renew_at(
        &self,
        access_token: &str,
        refresh_token: &str,
        now: u64,
    ) -> Result<TokenPair, RenewError> {
        let claims = decode_unverified(access_token)
            .map_err(|e| RenewError::MalformedCredential(e.to_string()))?;
        if claims.session_id.is_empty() {
            return Err(RenewError::MalformedCredential(
                "token missing session_id claim".into(),
            ));
        }

        // Single atomic read-and-delete: concurrent renewals with the same
        // credential cannot both observe the entry.
        let stored = match self.store.take(&claims.session_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!(session_id = %claims.session_id, "renewal for inactive session");
                return Err(RenewError::SessionInactive);
            }
            Err(e) => {
                error!(session_id = %claims.session_id, error = %e, "session take failed");
                return Err(RenewError::InternalError(e.to_string()));
            }
        };

        if !stored.ct_eq(refresh_token.as_bytes()) {
            warn!(
                session_id = %claims.session_id,
                user_id = claims.user_id,
                "refresh token mismatch, session revoked"
            );
            metrics::counter!("auth_session_revocations_total").increment(1);
            return Err(RenewError::RenewalMismatch);
        }

        let pair = self
            .issue_at(claims.user_id, now)
            .await
            .map_err(|e| RenewError::InternalError(e.to_string()))?;
        metrics::counter!("auth_session_rotations_total").increment(1);
        info!(
            user_id = claims.user_id,
            old_session_id = %claims.session_id,
            "session rotated"
        );
        Ok(pair)
    }
}
