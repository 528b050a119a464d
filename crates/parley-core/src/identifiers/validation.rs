//! Identifier validation rules

use thiserror::Error;

/// Maximum length for all identifier types
pub const MAX_ID_LENGTH: usize = 128;

/// Reasons an identifier string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdValidationError {
    /// The identifier string is empty
    #[error("Identifier cannot be empty")]
    Empty,
    /// The identifier contains only whitespace
    #[error("Identifier cannot be whitespace-only")]
    WhitespaceOnly,
    /// The identifier has leading or trailing whitespace
    #[error("Identifier cannot have leading or trailing whitespace")]
    LeadingTrailingWhitespace,
    /// The identifier contains characters outside the allowed set
    #[error(
        "Identifier can only contain alphanumeric characters, hyphens, underscores, and dots"
    )]
    InvalidCharacters,
    /// The identifier exceeds the maximum length
    #[error("Identifier too long ({length} chars, max {max})")]
    TooLong { length: usize, max: usize },
    /// The identifier contains `./` or `../`
    #[error("Identifier cannot contain path traversal sequences (../)")]
    PathTraversal,
}

/// Validator shared by every identifier newtype.
pub struct IdValidator;

impl IdValidator {
    /// Validate an identifier string.
    ///
    /// Accepts 1..=128 characters drawn from alphanumerics, `-`, `_` and `.`,
    /// with no surrounding whitespace and no `./` sequence.
    ///
    /// ```rust
    /// use parley_core::identifiers::IdValidator;
    ///
    /// assert!(IdValidator::validate("greeting_agent").is_ok());
    /// assert!(IdValidator::validate("weather_agent_v2").is_ok());
    /// assert!(IdValidator::validate("").is_err());
    /// assert!(IdValidator::validate("agent/path").is_err());
    /// ```
    pub fn validate(id: &str) -> Result<&str, IdValidationError> {
        if id.is_empty() {
            return Err(IdValidationError::Empty);
        }

        if id.trim().is_empty() {
            return Err(IdValidationError::WhitespaceOnly);
        }

        if id != id.trim() {
            return Err(IdValidationError::LeadingTrailingWhitespace);
        }

        if id.len() > MAX_ID_LENGTH {
            return Err(IdValidationError::TooLong {
                length: id.len(),
                max: MAX_ID_LENGTH,
            });
        }

        if id.contains("./") {
            return Err(IdValidationError::PathTraversal);
        }

        if !id.chars().all(Self::is_valid_char) {
            return Err(IdValidationError::InvalidCharacters);
        }

        Ok(id)
    }

    /// Check if a character is valid in an identifier
    pub fn is_valid_char(c: char) -> bool {
        c.is_alphanumeric() || c == '-' || c == '_' || c == '.'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_tutorial_names() {
        for id in [
            "greeting_agent",
            "farewell_agent",
            "weather_agent_v2",
            "say_hello",
            "session_001_agent_team",
            "user_1",
        ] {
            assert!(IdValidator::validate(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert_eq!(IdValidator::validate(""), Err(IdValidationError::Empty));
        assert_eq!(
            IdValidator::validate(" \t"),
            Err(IdValidationError::WhitespaceOnly)
        );
        assert_eq!(
            IdValidator::validate(" agent"),
            Err(IdValidationError::LeadingTrailingWhitespace)
        );
    }

    #[test]
    fn rejects_bad_characters_and_traversal() {
        assert_eq!(
            IdValidator::validate("agent@host"),
            Err(IdValidationError::InvalidCharacters)
        );
        assert_eq!(
            IdValidator::validate("../etc"),
            Err(IdValidationError::PathTraversal)
        );
    }

    #[test]
    fn enforces_length_limit() {
        assert!(IdValidator::validate(&"a".repeat(MAX_ID_LENGTH)).is_ok());
        assert_eq!(
            IdValidator::validate(&"a".repeat(MAX_ID_LENGTH + 1)),
            Err(IdValidationError::TooLong {
                length: MAX_ID_LENGTH + 1,
                max: MAX_ID_LENGTH
            })
        );
    }
}
