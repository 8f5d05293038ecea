//! Cache key definitions.

use std::fmt;

use crate::domain::types::{BannerId, FeatureId, TagId};

/// Logical key of a cache entry. `Display` renders the wire form shared by
/// every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Content record of one banner.
    Banner(BannerId),
    /// Banner ids carrying a tag.
    Tag(TagId),
    /// Banner ids assigned to a feature.
    Feature(FeatureId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Banner(id) => write!(f, "banner:{id}"),
            CacheKey::Tag(id) => write!(f, "tags:{id}"),
            CacheKey::Feature(id) => write!(f, "features:{id}"),
        }
    }
}
