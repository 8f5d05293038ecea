//! Identity types for banners and the two dimensions that address them.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Primary key of a banner row.
    BannerId
);
id_type!(
    /// Tag dimension; a banner carries many tags.
    TagId
);
id_type!(
    /// Feature dimension; a banner carries exactly one feature.
    FeatureId
);

/// Privilege level attached to a caller's access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    User,
    Admin,
}

impl AccessLevel {
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin { Self::Admin } else { Self::User }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// How a resolution request treats the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Consult the cache first, fall back to the store on a miss.
    #[default]
    Cached,
    /// Always read the store and republish the result into the cache.
    LastRevision,
}

impl ReadMode {
    pub fn from_flag(use_last_revision: bool) -> Self {
        if use_last_revision {
            Self::LastRevision
        } else {
            Self::Cached
        }
    }
}
