//! Validated identifier types.
//!
//! Every identifier is a distinct newtype so a [`ToolId`] can never be passed
//! where an [`AgentId`] is expected. All of them share the rules enforced by
//! [`IdValidator`].
//!
//! ```rust
//! use parley_core::identifiers::{AgentId, SessionKey};
//!
//! let agent = AgentId::parse("greeting_agent").unwrap();
//! assert_eq!(agent.as_str(), "greeting_agent");
//!
//! let key = SessionKey::parse("weather_app", "user_1", "session_001").unwrap();
//! assert_eq!(key.to_string(), "weather_app/user_1/session_001");
//!
//! assert!(AgentId::parse("not an id").is_err());
//! ```

mod validation;

pub use validation::{IdValidationError, IdValidator, MAX_ID_LENGTH};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier.
            pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
                IdValidator::validate(id.as_ref()).map(|s| Self(s.to_string()))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Build an identifier without validation (tests and literals only).
            #[doc(hidden)]
            pub fn new_unchecked(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier of an agent; unique within a team.
    AgentId
}

define_id! {
    /// Identifier of a tool; unique within a registry.
    ToolId
}

define_id! {
    /// Identifier of the application owning a set of sessions.
    AppId
}

define_id! {
    /// Identifier of the end user a session belongs to.
    UserId
}

define_id! {
    /// Identifier of one conversation for a given app and user.
    SessionId
}

impl SessionId {
    /// Generate a random session identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// The `(app, user, session)` triple that names a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub app_id: AppId,
    pub user_id: UserId,
    pub session_id: SessionId,
}

impl SessionKey {
    pub fn new(app_id: AppId, user_id: UserId, session_id: SessionId) -> Self {
        Self {
            app_id,
            user_id,
            session_id,
        }
    }

    /// Validate all three parts at once.
    pub fn parse(
        app_id: impl AsRef<str>,
        user_id: impl AsRef<str>,
        session_id: impl AsRef<str>,
    ) -> Result<Self, IdValidationError> {
        Ok(Self {
            app_id: AppId::parse(app_id)?,
            user_id: UserId::parse(user_id)?,
            session_id: SessionId::parse(session_id)?,
        })
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_id, self.user_id, self.session_id)
    }
}
