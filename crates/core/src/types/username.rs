//! Username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// Fewer than [`Username::MIN_LENGTH`] characters survive normalization.
    #[error("username must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// More than [`Username::MAX_LENGTH`] characters.
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters outside `[a-z0-9_]`.
    #[error("username may only contain lowercase letters, digits and underscores")]
    InvalidCharacters,
}

/// A public, unique, lowercase handle.
///
/// ## Constraints
///
/// - Characters: `a-z`, `0-9`, `_`
/// - Length: 3-30 characters
///
/// Raw keyboard input goes through [`Username::normalize`] first, which
/// lowercases and drops everything else. [`Username::parse`] is strict and
/// rejects input that normalization would have changed.
///
/// ## Examples
///
/// ```
/// use a2a_labs_core::Username;
///
/// assert_eq!(Username::normalize("Ada Lovelace!"), "adalovelace");
/// assert!(Username::parse("ada_l").is_ok());
/// assert!(Username::parse("ab").is_err());
/// assert!(Username::parse("Ada").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Minimum length, also the length at which availability checks start.
    pub const MIN_LENGTH: usize = 3;

    /// Maximum length.
    pub const MAX_LENGTH: usize = 30;

    /// Apply the input filter: lowercase, keep only `[a-z0-9_]`.
    #[must_use]
    pub fn normalize(raw: &str) -> String {
        raw.chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
            .collect()
    }

    /// Parse an already-normalized username.
    ///
    /// # Errors
    ///
    /// Returns an error if the input contains characters outside `[a-z0-9_]`
    /// or its length is outside 3-30.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        if Self::normalize(s) != s {
            return Err(UsernameError::InvalidCharacters);
        }
        if s.len() < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_filters_input() {
        assert_eq!(Username::normalize("Hello_World 42"), "hello_world42");
        assert_eq!(Username::normalize("ÅB-c.d"), "bcd");
        assert_eq!(Username::normalize(""), "");
    }

    #[test]
    fn test_parse_length_bounds() {
        assert_eq!(
            Username::parse("ab"),
            Err(UsernameError::TooShort { min: 3 })
        );
        assert!(Username::parse("abc").is_ok());
        assert!(Username::parse(&"a".repeat(30)).is_ok());
        assert_eq!(
            Username::parse(&"a".repeat(31)),
            Err(UsernameError::TooLong { max: 30 })
        );
    }

    #[test]
    fn test_parse_rejects_unnormalized() {
        assert_eq!(
            Username::parse("Abc"),
            Err(UsernameError::InvalidCharacters)
        );
        assert_eq!(
            Username::parse("a-b-c"),
            Err(UsernameError::InvalidCharacters)
        );
    }

    #[test]
    fn test_serde_validates() {
        let name: Username = serde_json::from_str("\"agent_007\"").unwrap();
        assert_eq!(name.as_str(), "agent_007");
        assert!(serde_json::from_str::<Username>("\"no\"").is_err());
    }
}
