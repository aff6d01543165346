//! Branded ID newtypes.
//!
//! Group and user identifiers are assigned outside this system and are opaque
//! strings. Connection identifiers are assigned by the transport layer, one per
//! physical connection; the WebSocket gateway mints them with
//! [`ConnectionId::generate`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of a chat group.
    GroupId
}

branded_id! {
    /// Identifier of a user, as declared in a group's member list.
    UserId
}

branded_id! {
    /// Identifier of one live transport connection.
    ConnectionId
}

impl ConnectionId {
    /// Mint a fresh, time-ordered connection ID (`conn_<uuid v7>`).
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }
}
