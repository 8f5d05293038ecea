#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use banner_service::application::pagination::PageWindow;
use banner_service::application::repos::{
    BannerQueryFilter, BannerStore, CreateBannerParams, RepoError, UpdateBannerParams,
};
use banner_service::cache::{BannerCache, CacheError, CachedBanner};
use banner_service::domain::entities::{Banner, BannerContent, ResolvedBanner};
use banner_service::domain::types::{BannerId, FeatureId, TagId};
use time::OffsetDateTime;

pub fn content(n: u32) -> BannerContent {
    BannerContent {
        title: format!("title{n}"),
        text: format!("text{n}"),
        url: format!("url{n}"),
    }
}

pub fn tags(ids: &[i64]) -> BTreeSet<TagId> {
    ids.iter().copied().map(TagId::new).collect()
}

#[derive(Debug, Clone)]
struct StoredBanner {
    tags: BTreeSet<TagId>,
    feature: FeatureId,
    content: BannerContent,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Default)]
struct State {
    next_id: i64,
    banners: BTreeMap<BannerId, StoredBanner>,
}

impl State {
    fn slot_taken(
        &self,
        tag_ids: &BTreeSet<TagId>,
        feature_id: FeatureId,
        excluding: Option<BannerId>,
    ) -> bool {
        self.banners.iter().any(|(id, banner)| {
            Some(*id) != excluding && banner.feature == feature_id && tag_ids.is_subset(&banner.tags)
        })
    }
}

/// Store fake with the same outcomes as the Postgres adapter. Tags and
/// features `1..=10` exist. Mutations apply only after the optional delay, so
/// a cancelled call leaves no trace.
pub struct MemoryBannerStore {
    state: Mutex<State>,
    known_tags: BTreeSet<TagId>,
    known_features: BTreeSet<FeatureId>,
    resolves: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryBannerStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
            known_tags: (1..=10).map(TagId::new).collect(),
            known_features: (1..=10).map(FeatureId::new).collect(),
            resolves: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// banner 1: tags {1,2,3}, feature 1, active
    /// banner 2: tags {4}, feature 3, inactive
    /// banner 3: tags {2,5}, feature 3, inactive
    pub async fn seeded() -> Self {
        let store = Self::new();
        for (tag_ids, feature, n, is_active) in [
            (&[1, 2, 3][..], 1, 1, true),
            (&[4][..], 3, 2, false),
            (&[5, 2][..], 3, 3, false),
        ] {
            store
                .create_banner(CreateBannerParams {
                    tag_ids: tags(tag_ids),
                    feature_id: FeatureId::new(feature),
                    content: content(n),
                    is_active,
                })
                .await
                .expect("seed banner");
        }
        store
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn banner_count(&self) -> usize {
        self.state.lock().expect("store lock").banners.len()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn validate_refs(
        &self,
        tag_ids: Option<&BTreeSet<TagId>>,
        feature_id: Option<FeatureId>,
    ) -> Result<(), RepoError> {
        if let Some(tag_ids) = tag_ids {
            if !tag_ids.is_subset(&self.known_tags) {
                return Err(RepoError::MissingTag);
            }
        }
        if let Some(feature_id) = feature_id {
            if !self.known_features.contains(&feature_id) {
                return Err(RepoError::MissingFeature);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BannerStore for MemoryBannerStore {
    async fn check_unique(
        &self,
        tag_ids: &BTreeSet<TagId>,
        feature_id: FeatureId,
        excluding: Option<BannerId>,
    ) -> Result<bool, RepoError> {
        let state = self.state.lock().expect("store lock");
        Ok(!state.slot_taken(tag_ids, feature_id, excluding))
    }

    async fn create_banner(&self, params: CreateBannerParams) -> Result<BannerId, RepoError> {
        self.pause().await;

        let mut state = self.state.lock().expect("store lock");
        if state.slot_taken(&params.tag_ids, params.feature_id, None) {
            return Err(RepoError::Conflict);
        }
        self.validate_refs(Some(&params.tag_ids), Some(params.feature_id))?;

        let id = BannerId::new(state.next_id);
        state.next_id += 1;
        let now = OffsetDateTime::now_utc();
        state.banners.insert(
            id,
            StoredBanner {
                tags: params.tag_ids,
                feature: params.feature_id,
                content: params.content,
                is_active: params.is_active,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_banner(&self, params: UpdateBannerParams) -> Result<(), RepoError> {
        self.pause().await;

        let mut state = self.state.lock().expect("store lock");
        let current = state
            .banners
            .get(&params.id)
            .cloned()
            .ok_or(RepoError::NotFound)?;

        if params.touches_assignments() {
            let tag_ids = params.tag_ids.clone().unwrap_or_else(|| current.tags.clone());
            let feature_id = params.feature_id.unwrap_or(current.feature);
            if state.slot_taken(&tag_ids, feature_id, Some(params.id)) {
                return Err(RepoError::Conflict);
            }
        }
        self.validate_refs(params.tag_ids.as_ref(), params.feature_id)?;

        let mut updated = current;
        if let Some(tag_ids) = params.tag_ids {
            updated.tags = tag_ids;
        }
        if let Some(feature_id) = params.feature_id {
            updated.feature = feature_id;
        }
        params.content.apply(&mut updated.content);
        if let Some(is_active) = params.is_active {
            updated.is_active = is_active;
        }
        updated.updated_at = OffsetDateTime::now_utc();
        state.banners.insert(params.id, updated);
        Ok(())
    }

    async fn delete_banner(&self, id: BannerId) -> Result<(), RepoError> {
        self.pause().await;

        let mut state = self.state.lock().expect("store lock");
        state
            .banners
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn resolve_banner(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
    ) -> Result<ResolvedBanner, RepoError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let state = self.state.lock().expect("store lock");
        let mut matches = state
            .banners
            .iter()
            .filter(|(_, banner)| banner.feature == feature_id && banner.tags.contains(&tag_id));

        let Some((id, banner)) = matches.next() else {
            return Err(RepoError::NotFound);
        };
        if matches.next().is_some() {
            return Err(RepoError::integrity("ambiguous resolution"));
        }

        Ok(ResolvedBanner {
            id: *id,
            content: banner.content.clone(),
            is_active: banner.is_active,
        })
    }

    async fn list_banners(
        &self,
        filter: &BannerQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<Banner>, RepoError> {
        let state = self.state.lock().expect("store lock");
        Ok(state
            .banners
            .iter()
            .filter(|(_, banner)| filter.tag.is_none_or(|tag| banner.tags.contains(&tag)))
            .filter(|(_, banner)| filter.feature.is_none_or(|feature| banner.feature == feature))
            .skip(usize::try_from(window.offset()).expect("offset fits"))
            .take(window.limit() as usize)
            .map(|(id, banner)| Banner {
                id: *id,
                tag_ids: banner.tags.iter().copied().collect(),
                feature_id: banner.feature,
                content: banner.content.clone(),
                is_active: banner.is_active,
                created_at: banner.created_at,
                updated_at: banner.updated_at,
            })
            .collect())
    }
}

/// Cache whose backend is always unreachable.
pub struct FailingCache {
    pub writes: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self {
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BannerCache for FailingCache {
    async fn set(
        &self,
        _tag_id: TagId,
        _feature_id: FeatureId,
        _banner: &CachedBanner,
    ) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::backend("connection refused"))
    }

    async fn lookup(
        &self,
        _tag_id: TagId,
        _feature_id: FeatureId,
    ) -> Result<Option<CachedBanner>, CacheError> {
        Err(CacheError::backend("connection refused"))
    }
}
