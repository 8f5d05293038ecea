//! Banner cache index.
//!
//! A derived, expendable view of the store keyed three ways:
//!
//! - `banner:{id}`: content record plus activity flag
//! - `tags:{id}`: set of banner ids carrying the tag
//! - `features:{id}`: set of banner ids assigned to the feature
//!
//! Each key carries its own expiry, refreshed on every write that touches it.
//! A resolution reads the intersection of the two sets. The cache is never
//! authoritative; every miss or failure falls back to the store.

mod config;
mod keys;
mod lock;
mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entities::{BannerContent, ResolvedBanner};
use crate::domain::types::{AccessLevel, BannerId, FeatureId, TagId};
use crate::domain::visibility::ensure_visible;

pub use config::CacheConfig;
pub use keys::CacheKey;
pub use memory::MemoryBannerCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cached record could not be decoded: {0}")]
    Decode(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Per-banner record stored under `banner:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBanner {
    pub banner_id: BannerId,
    pub content: BannerContent,
    pub is_active: bool,
}

impl From<ResolvedBanner> for CachedBanner {
    fn from(banner: ResolvedBanner) -> Self {
        Self {
            banner_id: banner.id,
            content: banner.content,
            is_active: banner.is_active,
        }
    }
}

/// Result of a cache read after visibility has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(BannerContent),
    /// Nothing usable cached; the caller must consult the store.
    Miss,
    Forbidden,
}

#[async_trait]
pub trait BannerCache: Send + Sync {
    /// Upserts the banner record and adds its id to the `tag` and `feature`
    /// index sets, refreshing the expiry of all three keys.
    async fn set(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
        banner: &CachedBanner,
    ) -> Result<(), CacheError>;

    /// Raw record lookup through the tag/feature intersection.
    async fn lookup(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
    ) -> Result<Option<CachedBanner>, CacheError>;

    async fn get(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
        access: AccessLevel,
    ) -> Result<CacheLookup, CacheError> {
        let Some(banner) = self.lookup(tag_id, feature_id).await? else {
            return Ok(CacheLookup::Miss);
        };

        match ensure_visible(banner.is_active, access) {
            Ok(()) => Ok(CacheLookup::Hit(banner.content)),
            Err(_) => Ok(CacheLookup::Forbidden),
        }
    }
}

/// Picks the only member of an intersection. More than one candidate means the
/// index disagrees with the uniqueness rule, so it is treated as a miss and the
/// store decides.
pub(crate) fn pick_single(candidates: BTreeSet<BannerId>) -> Option<BannerId> {
    let mut iter = candidates.into_iter();
    let first = iter.next()?;
    match iter.next() {
        Some(_) => None,
        None => Some(first),
    }
}
