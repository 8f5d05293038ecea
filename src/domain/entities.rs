//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{BannerId, FeatureId, TagId};

/// Opaque banner payload served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerContent {
    pub title: String,
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub id: BannerId,
    pub tag_ids: Vec<TagId>,
    pub feature_id: FeatureId,
    pub content: BannerContent,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The single banner matched by a (tag, feature) resolution, before visibility
/// rules are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBanner {
    pub id: BannerId,
    pub content: BannerContent,
    pub is_active: bool,
}
