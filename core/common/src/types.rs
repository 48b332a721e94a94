//! Common types used throughout Stratus.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Name of a configured remote, unique within the configuration store.
///
/// The name doubles as the helper's logical source (`{name}:`) and as the
/// `[name]` block header in the serialized profile, so characters that would
/// break either surface are rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteName(String);

impl RemoteName {
    /// Create a new RemoteName from a string.
    ///
    /// # Preconditions
    /// - `name` must be non-empty
    /// - `name` must not contain `[`, `]`, `:`, whitespace, or control characters
    ///
    /// # Errors
    /// - Returns error if the name is empty or contains a forbidden character
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Remote name cannot be empty".to_string(),
            ));
        }
        if name
            .chars()
            .any(|c| matches!(c, '[' | ']' | ':') || c.is_whitespace() || c.is_control())
        {
            return Err(crate::Error::InvalidInput(format!(
                "Remote name '{}' contains forbidden characters",
                name
            )));
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The helper's source argument form, `{name}:`.
    pub fn as_source(&self) -> String {
        format!("{}:", self.0)
    }
}

impl fmt::Display for RemoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local mount-point identifier, drawn from the drive-letter pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriveLetter(char);

impl DriveLetter {
    /// Create a drive letter.
    ///
    /// # Errors
    /// - Returns error unless `letter` is an ASCII uppercase letter
    pub fn new(letter: char) -> crate::Result<Self> {
        if !letter.is_ascii_uppercase() {
            return Err(crate::Error::InvalidInput(format!(
                "'{}' is not a valid drive letter",
                letter
            )));
        }
        Ok(Self(letter))
    }

    /// Get the raw letter.
    pub fn as_char(&self) -> char {
        self.0
    }

    /// The helper's target argument form, `{letter}:`.
    pub fn as_target(&self) -> String {
        format!("{}:", self.0)
    }
}

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.0)
    }
}

/// Sensitive data wrapper that zeroizes on drop.
///
/// Serialized profile material passes through the process as `SecretBytes`:
/// it is piped into a helper's stdin and then dropped, never written out.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Create new secret bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecretBytes {
    fn from(mut s: String) -> Self {
        let bytes = s.as_bytes().to_vec();
        s.zeroize();
        Self(bytes)
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes([REDACTED; {} bytes])", self.0.len())
    }
}
