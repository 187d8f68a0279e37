//! Opaque identifiers used across the relay.
//!
//! All of them are strings on the wire. The newtypes only exist so a tutor id
//! can't be passed where an announcement id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Chat-platform user id of a tutor (a Discord snowflake, kept as text)
    TutorId
);

string_id!(
    /// Upstream id of a course announcement
    AnnouncementId
);

string_id!(
    /// Id of one date option, unique within its announcement
    OptionId
);

string_id!(
    /// Upstream id of one of a tutor's existing classes
    ClassId
);

impl From<u64> for TutorId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = TutorId::from(1234_u64);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1234\"");

        let parsed: AnnouncementId = serde_json::from_str("\"A7\"").unwrap();
        assert_eq!(parsed.as_str(), "A7");
        assert_eq!(parsed.to_string(), "A7");
    }
}
