//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `TransferId` where a `MovementId`
//! is expected. Vault keys, actor identities and client operation keys are
//! caller-chosen strings and get their own string newtypes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

/// Macro to generate non-empty string key wrappers.
macro_rules! string_key {
    ($name:ident, $what:literal, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a key, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns an error message if the value is blank.
            pub fn new(value: impl AsRef<str>) -> Result<Self, String> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(format!("{} cannot be empty", $what));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(MovementId, "Unique identifier for a vault movement.");
typed_id!(TransferId, "Unique identifier for a transfer between two vaults.");
typed_id!(CutOffId, "Unique identifier for a cut-off.");
typed_id!(
    ReconciliationRunId,
    "Unique identifier for a reconciliation run."
);
typed_id!(
    DifferenceId,
    "Unique identifier for a reconciliation difference."
);

string_key!(VaultKey, "vault key", "Stable key of a vault, e.g. `boveda-monte`.");
string_key!(ActorId, "actor id", "Identity of the actor issuing a command.");
string_key!(
    OperationId,
    "operation id",
    "Client-supplied idempotency key for a command."
);
