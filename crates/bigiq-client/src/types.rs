//! # Identifier Types
//!
//! Newtypes for the identifiers the licensing resources are keyed by. They
//! keep a registration key from being passed where a pool id is expected;
//! on the wire they are plain strings.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
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
    /// Registration key (base key) being activated or assigned.
    RegKey
);
string_id!(
    /// Registration pool identifier (a UUID assigned by the control plane).
    PoolId
);
string_id!(
    /// Pool member (assignment) identifier.
    MemberId
);
string_id!(
    /// Per-device license task identifier.
    TaskId
);
