//! Error and outcome types for the token lifecycle

/// Signing key construction errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("signing key is empty")]
    Empty,

    #[error("signing key environment variable {0} is not set")]
    Missing(String),
}

/// Issuance failures. No partial token pair is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("failed to sign access token: {0}")]
    Signing(String),

    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[from] session_store::Error),
}

/// Renewal failures.
///
/// `SessionInactive` and `RenewalMismatch` both force re-authentication;
/// `RenewalMismatch` has additionally revoked the session.
/// `InternalError` is an infrastructure fault and is retriable.
#[derive(Debug, thiserror::Error)]
pub enum RenewError {
    #[error("malformed access token: {0}")]
    MalformedCredential(String),

    #[error("session expired or revoked")]
    SessionInactive,

    #[error("refresh token does not match session; session revoked")]
    RenewalMismatch,

    #[error("internal error during renewal: {0}")]
    InternalError(String),
}

impl RenewError {
    /// Whether the caller should treat this as a server fault (5xx) rather
    /// than a rejected credential (4xx).
    pub fn is_internal(&self) -> bool {
        matches!(self, RenewError::InternalError(_))
    }
}

/// Why a verification failed. The wire strings are part of the internal
/// `ValidateToken` contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyFailure {
    /// Bad structure, wrong algorithm, bad signature, wrong subject, or expired.
    InvalidOrExpired,
    /// Signature fine, but the session is no longer in the store.
    SessionRevokedOrInactive,
    /// The store lookup itself failed or timed out.
    InternalError,
}

impl VerifyFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyFailure::InvalidOrExpired => "invalid_or_expired",
            VerifyFailure::SessionRevokedOrInactive => "session_revoked_or_inactive",
            VerifyFailure::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
