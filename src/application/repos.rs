//! Repository traits describing persistence adapters.

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::PageWindow;
use crate::domain::entities::{Banner, BannerContent, ResolvedBanner};
use crate::domain::types::{AccessLevel, BannerId, FeatureId, TagId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("banner with these tags and feature already exists")]
    Conflict,
    #[error("referenced tag does not exist")]
    MissingTag,
    #[error("referenced feature does not exist")]
    MissingFeature,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBannerParams {
    pub tag_ids: BTreeSet<TagId>,
    pub feature_id: FeatureId,
    pub content: BannerContent,
    pub is_active: bool,
}

/// Field-wise content update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerContentPatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
}

impl BannerContentPatch {
    pub fn apply(&self, content: &mut BannerContent) {
        if let Some(title) = &self.title {
            content.title.clone_from(title);
        }
        if let Some(text) = &self.text {
            content.text.clone_from(text);
        }
        if let Some(url) = &self.url {
            content.url.clone_from(url);
        }
    }
}

/// Partial update. `tag_ids` replaces the whole tag-set when present.
#[derive(Debug, Clone)]
pub struct UpdateBannerParams {
    pub id: BannerId,
    pub tag_ids: Option<BTreeSet<TagId>>,
    pub feature_id: Option<FeatureId>,
    pub content: BannerContentPatch,
    pub is_active: Option<bool>,
}

impl UpdateBannerParams {
    /// Whether the update moves the banner to another (tag-set, feature) slot.
    pub fn touches_assignments(&self) -> bool {
        self.tag_ids.is_some() || self.feature_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BannerQueryFilter {
    pub tag: Option<TagId>,
    pub feature: Option<FeatureId>,
}

impl BannerQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.feature.is_none()
    }
}

/// Durable banner/tag/feature assignments.
///
/// Every read-decide-write method runs inside a single store transaction; the
/// uniqueness check in `create_banner`/`update_banner` observes the same
/// snapshot the mutation commits against.
#[async_trait]
pub trait BannerStore: Send + Sync {
    /// Returns `false` when another banner assigned to `feature` already
    /// carries every tag in `tag_ids`.
    async fn check_unique(
        &self,
        tag_ids: &BTreeSet<TagId>,
        feature_id: FeatureId,
        excluding: Option<BannerId>,
    ) -> Result<bool, RepoError>;

    async fn create_banner(&self, params: CreateBannerParams) -> Result<BannerId, RepoError>;

    async fn update_banner(&self, params: UpdateBannerParams) -> Result<(), RepoError>;

    async fn delete_banner(&self, id: BannerId) -> Result<(), RepoError>;

    /// The banner assigned to both `tag_id` and `feature_id`. `NotFound` when
    /// none matches, `Integrity` when more than one does.
    async fn resolve_banner(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
    ) -> Result<ResolvedBanner, RepoError>;

    async fn list_banners(
        &self,
        filter: &BannerQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<Banner>, RepoError>;
}

#[async_trait]
pub trait AccessTokensRepo: Send + Sync {
    async fn find_access_level(&self, token: &str) -> Result<Option<AccessLevel>, RepoError>;
}
