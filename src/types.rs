//! NewType wrappers for the identifiers that flow between layers.
//!
//! These keep a subject id from being passed where a media id is expected,
//! which is easy to do when every identifier is a bare `String`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_string!(
    /// Subject id issued by the identity provider (the JWT `sub` claim).
    ///
    /// This is also the primary key of the local user record, so bookmarks
    /// and history entries reference users by it directly.
    UserId
);

newtype_string!(
    /// Identifier of a media item in the external media-search API.
    MediaId
);

newtype_string!(
    /// Key of a stored search history entry (the record key without the
    /// table prefix).
    HistoryId
);

impl UserId {
    /// Default username for a user whose token carried none:
    /// `user_` followed by the first eight characters of the subject id.
    pub fn default_username(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("user_{prefix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_creation() {
        let id = UserId::new("user_2abc");
        assert_eq!(id.as_str(), "user_2abc");
        assert_eq!(id.to_string(), "user_2abc");
    }

    #[test]
    fn test_media_id_from_string() {
        let id: MediaId = "f9c8b7".into();
        assert_eq!(id.as_str(), "f9c8b7");

        let id: MediaId = String::from("a1b2").into();
        assert_eq!(id.into_inner(), "a1b2");
    }

    #[test]
    fn test_history_id_serde() {
        let id = HistoryId::new("k3j2h1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"k3j2h1\"");

        let parsed: HistoryId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_default_username_uses_first_eight_chars() {
        let id = UserId::new("user_2NNEqL2nrIRdJ194ndJqAHwEfxC");
        assert_eq!(id.default_username(), "user_user_2NN");

        let short = UserId::new("u1");
        assert_eq!(short.default_username(), "user_u1");
    }

    #[test]
    fn test_default_username_counts_chars_not_bytes() {
        let id = UserId::new("üñíçødé-subject");
        assert_eq!(id.default_username(), "user_üñíçødé-");
    }
}
