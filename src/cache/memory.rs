//! In-process implementation of the banner cache index.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::types::{BannerId, FeatureId, TagId};

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};
use super::{BannerCache, CacheError, CachedBanner, pick_single};

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type IdSet = Expiring<BTreeSet<BannerId>>;

/// TTL cache held in process memory.
///
/// An entry past its deadline reads as absent. Every write sweeps expired
/// keys while it holds the write locks, so memory stays bounded by the live set.
/// Locks are always taken in the order records, tags, features.
pub struct MemoryBannerCache {
    config: CacheConfig,
    records: RwLock<HashMap<BannerId, Expiring<CachedBanner>>>,
    tags: RwLock<HashMap<TagId, IdSet>>,
    features: RwLock<HashMap<FeatureId, IdSet>>,
}

impl MemoryBannerCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            records: RwLock::new(HashMap::new()),
            tags: RwLock::new(HashMap::new()),
            features: RwLock::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
impl MemoryBannerCache {
    /// Number of live keys across the record store and both indices.
    fn live_keys(&self) -> usize {
        let now = Instant::now();
        let records = rw_read(&self.records, "records", "live_keys")
            .values()
            .filter(|entry| entry.is_live(now))
            .count();
        let tags = rw_read(&self.tags, "tags", "live_keys")
            .values()
            .filter(|entry| entry.is_live(now))
            .count();
        let features = rw_read(&self.features, "features", "live_keys")
            .values()
            .filter(|entry| entry.is_live(now))
            .count();
        records + tags + features
    }

    /// Number of keys held, expired or not.
    fn stored_keys(&self) -> usize {
        rw_read(&self.records, "records", "stored_keys").len()
            + rw_read(&self.tags, "tags", "stored_keys").len()
            + rw_read(&self.features, "features", "stored_keys").len()
    }
}

impl Default for MemoryBannerCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn purge_expired<K: Eq + Hash, T>(map: &mut HashMap<K, Expiring<T>>, now: Instant) -> usize {
    let before = map.len();
    map.retain(|_, entry| entry.is_live(now));
    before - map.len()
}

/// SADD + EXPIRE: a set past its deadline starts over empty.
fn add_member<K: Eq + Hash>(
    map: &mut HashMap<K, IdSet>,
    key: K,
    member: BannerId,
    now: Instant,
    expires_at: Instant,
) {
    let entry = map.entry(key).or_insert_with(|| Expiring {
        value: BTreeSet::new(),
        expires_at,
    });
    if !entry.is_live(now) {
        entry.value.clear();
    }
    entry.value.insert(member);
    entry.expires_at = expires_at;
}

fn live_members<K: Eq + Hash>(
    map: &HashMap<K, IdSet>,
    key: &K,
    now: Instant,
) -> BTreeSet<BannerId> {
    map.get(key)
        .filter(|entry| entry.is_live(now))
        .map(|entry| entry.value.clone())
        .unwrap_or_default()
}

#[async_trait]
impl BannerCache for MemoryBannerCache {
    async fn set(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
        banner: &CachedBanner,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now + self.config.ttl;

        let mut records = rw_write(&self.records, "records", "set");
        let mut tags = rw_write(&self.tags, "tags", "set");
        let mut features = rw_write(&self.features, "features", "set");

        let purged = purge_expired(&mut *records, now)
            + purge_expired(&mut *tags, now)
            + purge_expired(&mut *features, now);
        if purged > 0 {
            debug!(purged, "Purged expired banner cache keys");
        }

        records.insert(
            banner.banner_id,
            Expiring {
                value: banner.clone(),
                expires_at,
            },
        );
        add_member(&mut tags, tag_id, banner.banner_id, now, expires_at);
        add_member(&mut features, feature_id, banner.banner_id, now, expires_at);

        Ok(())
    }

    async fn lookup(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
    ) -> Result<Option<CachedBanner>, CacheError> {
        let now = Instant::now();

        let records = rw_read(&self.records, "records", "lookup");
        let tagged = live_members(&rw_read(&self.tags, "tags", "lookup"), &tag_id, now);
        if tagged.is_empty() {
            return Ok(None);
        }
        let featured = live_members(
            &rw_read(&self.features, "features", "lookup"),
            &feature_id,
            now,
        );

        let candidates = tagged.intersection(&featured).copied().collect();
        let Some(banner_id) = pick_single(candidates) else {
            return Ok(None);
        };

        Ok(records
            .get(&banner_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }
}
