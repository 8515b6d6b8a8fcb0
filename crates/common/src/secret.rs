//! Secret wrapper for signing keys and renewal credentials

use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs, zeroed on drop
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize + AsRef<[u8]>> Secret<T> {
    /// Compare against a caller-supplied value without short-circuiting on
    /// the first differing byte.
    ///
    /// Length differences still return early; the values compared here are
    /// fixed-length random tokens, so length carries no information.
    pub fn ct_eq(&self, other: &[u8]) -> bool {
        self.0.as_ref().ct_eq(other).into()
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Lets config files carry values such as database URLs that embed passwords.
impl<'de, T: Zeroize + serde::Deserialize<'de>> serde::Deserialize<'de> for Secret<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = Secret::new(String::from("rt_live_value"));
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn expose_returns_inner_value() {
        let secret = Secret::new(b"signing-key".to_vec());
        assert_eq!(secret.expose().as_slice(), b"signing-key");
    }

    #[test]
    fn ct_eq_matches_only_identical_bytes() {
        let secret = Secret::new(String::from("abc123"));
        assert!(secret.ct_eq(b"abc123"));
        assert!(!secret.ct_eq(b"abc124"));
        assert!(!secret.ct_eq(b"abc12"));
        assert!(!secret.ct_eq(b""));
    }

    #[test]
    fn deserializes_from_config_without_leaking_in_debug() {
        #[derive(Debug, serde::Deserialize)]
        struct Section {
            url: Secret<String>,
        }
        let section: Section = toml::from_str(r#"url = "postgres://u:pw@db/auth""#).unwrap();
        assert_eq!(section.url.expose(), "postgres://u:pw@db/auth");
        assert!(!format!("{section:?}").contains("pw@db"));
    }
}
