//! Redacting wrapper for credentials.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret that never shows up in logs and is zeroed on drop.
///
/// ```
/// use parley_agent::SecretString;
///
/// let key = SecretString::new("sk-test-123".to_string());
/// assert_eq!(format!("{key:?}"), "[REDACTED]");
/// assert_eq!(key.expose_secret(), "sk-test-123");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret<T: Zeroize> {
    inner: T,
}

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// The only way to read the value. Never log the result.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

pub type SecretString = Secret<String>;

impl SecretString {
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
