mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use banner_service::application::banners::{BannerService, UserBannerRequest};
use banner_service::application::context::RequestContext;
use banner_service::cache::MemoryBannerCache;
use banner_service::domain::types::{AccessLevel, FeatureId, ReadMode, TagId};
use metrics_util::debugging::DebuggingRecorder;

use common::{FailingCache, MemoryBannerStore};

fn cached_read(tag: i64, feature: i64) -> UserBannerRequest {
    UserBannerRequest {
        tag_id: TagId::new(tag),
        feature_id: FeatureId::new(feature),
        mode: ReadMode::Cached,
        access: AccessLevel::User,
    }
}

#[tokio::test]
async fn resolution_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let ctx = RequestContext::with_timeout(Duration::from_secs(5));
    let store = Arc::new(MemoryBannerStore::seeded().await);

    // miss, then hit
    let healthy = BannerService::new(store.clone(), Arc::new(MemoryBannerCache::default()));
    for _ in 0..2 {
        healthy
            .get_user_banner(&ctx, cached_read(1, 1))
            .await
            .expect("banner");
    }

    // read failure and write-back failure
    let broken = BannerService::new(store, Arc::new(FailingCache::new()));
    broken
        .get_user_banner(&ctx, cached_read(1, 1))
        .await
        .expect("store fallback");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "banner_cache_hit_total",
        "banner_cache_miss_total",
        "banner_cache_error_total",
        "banner_cache_write_error_total",
        "banner_resolve_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
