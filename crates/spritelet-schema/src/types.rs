//! Newtype wrappers for string identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings so the on-disk
//! documents stay readable by external tools.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_newtype!(
    /// A normalized state name: trimmed, lower-cased, whitespace collapsed to `-`.
    ///
    /// [`SimpleName::new`] normalizes its input. Values read back from a
    /// catalog document are taken as stored; `verify` flags keys that drifted.
    SimpleName
);

string_newtype!(
    /// A store-relative artifact path as persisted in the catalog and the
    /// current signal (for example `states/focused-coding.png`). Empty means
    /// "nothing published yet".
    SpriteletPath
);

impl SimpleName {
    /// Normalize a human-entered label into a catalog key.
    pub fn new(raw: &str) -> Self {
        Self(crate::normalize::normalize_simple_name(raw))
    }
}

impl SpriteletPath {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The "nothing published yet" value.
    pub fn none() -> Self {
        Self(String::new())
    }
}

impl From<&str> for SpriteletPath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SpriteletPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}
