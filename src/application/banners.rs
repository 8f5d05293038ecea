//! Banner engine: uniqueness-guarded mutations and the read-through resolution
//! protocol over the store and the cache index.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};

use crate::application::context::RequestContext;
use crate::application::error::BannerError;
use crate::application::pagination::PageWindow;
use crate::application::repos::{
    BannerContentPatch, BannerQueryFilter, BannerStore, CreateBannerParams, UpdateBannerParams,
};
use crate::cache::{BannerCache, CacheLookup, CachedBanner};
use crate::domain::entities::{Banner, BannerContent, ResolvedBanner};
use crate::domain::error::DomainError;
use crate::domain::types::{AccessLevel, BannerId, FeatureId, ReadMode, TagId};
use crate::domain::visibility::ensure_visible;

pub const METRIC_CACHE_HIT: &str = "banner_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "banner_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "banner_cache_error_total";
pub const METRIC_CACHE_WRITE_ERROR: &str = "banner_cache_write_error_total";
pub const METRIC_RESOLVE_MS: &str = "banner_resolve_ms";

#[derive(Debug, Clone, Copy)]
pub struct UserBannerRequest {
    pub tag_id: TagId,
    pub feature_id: FeatureId,
    pub mode: ReadMode,
    pub access: AccessLevel,
}

#[derive(Debug, Clone)]
pub struct CreateBannerCommand {
    pub tag_ids: Vec<TagId>,
    pub feature_id: FeatureId,
    pub content: BannerContent,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateBannerCommand {
    pub id: BannerId,
    pub tag_ids: Option<Vec<TagId>>,
    pub feature_id: Option<FeatureId>,
    pub content: BannerContentPatch,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct BannerService {
    store: Arc<dyn BannerStore>,
    cache: Arc<dyn BannerCache>,
}

impl BannerService {
    pub fn new(store: Arc<dyn BannerStore>, cache: Arc<dyn BannerCache>) -> Self {
        Self { store, cache }
    }

    /// Serves the banner for `(tag, feature)`.
    ///
    /// `ReadMode::Cached` consults the cache index first; a miss or a cache
    /// failure falls through to the store. `ReadMode::LastRevision` always reads
    /// the store. Either way a store read is republished into the cache before
    /// visibility is applied, so forbidden outcomes are cached too.
    #[instrument(
        skip_all,
        fields(
            tag_id = %request.tag_id,
            feature_id = %request.feature_id,
            mode = ?request.mode
        )
    )]
    pub async fn get_user_banner(
        &self,
        ctx: &RequestContext,
        request: UserBannerRequest,
    ) -> Result<BannerContent, BannerError> {
        let started_at = Instant::now();
        let result = ctx.run(self.resolve_through_cache(request)).await;

        histogram!(
            METRIC_RESOLVE_MS,
            "mode" => match request.mode {
                ReadMode::Cached => "cached",
                ReadMode::LastRevision => "last_revision",
            }
        )
        .record(started_at.elapsed().as_secs_f64() * 1000.0);

        result
    }

    async fn resolve_through_cache(
        &self,
        request: UserBannerRequest,
    ) -> Result<BannerContent, BannerError> {
        let UserBannerRequest {
            tag_id,
            feature_id,
            mode,
            access,
        } = request;

        if mode == ReadMode::Cached {
            match self.cache.get(tag_id, feature_id, access).await {
                Ok(CacheLookup::Hit(content)) => {
                    counter!(METRIC_CACHE_HIT).increment(1);
                    return Ok(content);
                }
                Ok(CacheLookup::Forbidden) => {
                    counter!(METRIC_CACHE_HIT).increment(1);
                    return Err(BannerError::Forbidden);
                }
                Ok(CacheLookup::Miss) => {
                    counter!(METRIC_CACHE_MISS).increment(1);
                    debug!("Banner cache miss");
                }
                Err(err) => {
                    counter!(METRIC_CACHE_ERROR).increment(1);
                    warn!(error = %err, "Banner cache read failed; falling back to store");
                }
            }
        }

        let banner = self.store.resolve_banner(tag_id, feature_id).await?;
        self.publish(tag_id, feature_id, &banner).await;

        ensure_visible(banner.is_active, access)?;
        Ok(banner.content)
    }

    async fn publish(&self, tag_id: TagId, feature_id: FeatureId, banner: &ResolvedBanner) {
        let record = CachedBanner::from(banner.clone());
        if let Err(err) = self.cache.set(tag_id, feature_id, &record).await {
            counter!(METRIC_CACHE_WRITE_ERROR).increment(1);
            warn!(
                banner_id = %banner.id,
                error = %err,
                "Failed to write resolved banner back to cache"
            );
        }
    }

    #[instrument(skip_all, fields(feature_id = %command.feature_id))]
    pub async fn create_banner(
        &self,
        ctx: &RequestContext,
        command: CreateBannerCommand,
    ) -> Result<BannerId, BannerError> {
        let params = CreateBannerParams {
            tag_ids: tag_set(command.tag_ids)?,
            feature_id: command.feature_id,
            content: command.content,
            is_active: command.is_active,
        };

        let id = ctx
            .run(async {
                self.store
                    .create_banner(params)
                    .await
                    .map_err(BannerError::from)
            })
            .await?;

        info!(banner_id = %id, "Banner created");
        Ok(id)
    }

    #[instrument(skip_all, fields(banner_id = %command.id))]
    pub async fn update_banner(
        &self,
        ctx: &RequestContext,
        command: UpdateBannerCommand,
    ) -> Result<(), BannerError> {
        let params = UpdateBannerParams {
            id: command.id,
            tag_ids: command.tag_ids.map(tag_set).transpose()?,
            feature_id: command.feature_id,
            content: command.content,
            is_active: command.is_active,
        };

        ctx.run(async {
            self.store
                .update_banner(params)
                .await
                .map_err(BannerError::from)
        })
        .await?;

        info!("Banner updated");
        Ok(())
    }

    #[instrument(skip_all, fields(banner_id = %id))]
    pub async fn delete_banner(
        &self,
        ctx: &RequestContext,
        id: BannerId,
    ) -> Result<(), BannerError> {
        ctx.run(async { self.store.delete_banner(id).await.map_err(BannerError::from) })
            .await?;

        info!("Banner deleted");
        Ok(())
    }

    /// Store-only listing; the cache is never consulted.
    pub async fn list_banners(
        &self,
        ctx: &RequestContext,
        filter: BannerQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<Banner>, BannerError> {
        if filter.is_empty() {
            return Err(
                DomainError::validation("at least one of tag or feature filter is required")
                    .into(),
            );
        }

        ctx.run(async {
            self.store
                .list_banners(&filter, window)
                .await
                .map_err(BannerError::from)
        })
        .await
    }

    /// Whether `(tag_ids, feature_id)` is free, ignoring `excluding`.
    pub async fn check_unique(
        &self,
        ctx: &RequestContext,
        tag_ids: Vec<TagId>,
        feature_id: FeatureId,
        excluding: Option<BannerId>,
    ) -> Result<bool, BannerError> {
        let tag_ids = tag_set(tag_ids)?;
        ctx.run(async {
            self.store
                .check_unique(&tag_ids, feature_id, excluding)
                .await
                .map_err(BannerError::from)
        })
        .await
    }
}

fn tag_set(tag_ids: Vec<TagId>) -> Result<BTreeSet<TagId>, DomainError> {
    if tag_ids.is_empty() {
        return Err(DomainError::validation("a banner needs at least one tag"));
    }
    Ok(tag_ids.into_iter().collect())
}
