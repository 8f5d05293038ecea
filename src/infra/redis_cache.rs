//! Redis backend for the banner cache index.
//!
//! Layout:
//! - `banner:{id}` hash with fields `content` (JSON) and `is_active` (`1`/`0`)
//! - `tags:{id}` and `features:{id}` sets of banner ids
//!
//! Each write refreshes the expiry of the three keys it touches.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, cmd, pipe};

use crate::cache::{BannerCache, CacheConfig, CacheError, CacheKey, CachedBanner, pick_single};
use crate::domain::entities::BannerContent;
use crate::domain::types::{BannerId, FeatureId, TagId};

const FIELD_CONTENT: &str = "content";
const FIELD_IS_ACTIVE: &str = "is_active";

#[derive(Clone)]
pub struct RedisBannerCache {
    connection: ConnectionManager,
    config: CacheConfig,
}

impl RedisBannerCache {
    pub async fn connect(url: &str, config: CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(CacheError::backend)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(CacheError::backend)?;

        Ok(Self { connection, config })
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: String = cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;
        Ok(())
    }
}

fn encode_flag(is_active: bool) -> &'static str {
    if is_active { "1" } else { "0" }
}

fn decode_record(
    banner_id: BannerId,
    content: Option<String>,
    is_active: Option<String>,
) -> Result<Option<CachedBanner>, CacheError> {
    let (Some(content), Some(is_active)) = (content, is_active) else {
        return Ok(None);
    };

    let content: BannerContent = serde_json::from_str(&content).map_err(CacheError::decode)?;
    let is_active = match is_active.as_str() {
        "1" => true,
        "0" => false,
        other => {
            return Err(CacheError::decode(format!(
                "unexpected is_active value `{other}`"
            )));
        }
    };

    Ok(Some(CachedBanner {
        banner_id,
        content,
        is_active,
    }))
}

#[async_trait]
impl BannerCache for RedisBannerCache {
    async fn set(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
        banner: &CachedBanner,
    ) -> Result<(), CacheError> {
        let record_key = CacheKey::Banner(banner.banner_id).to_string();
        let tag_key = CacheKey::Tag(tag_id).to_string();
        let feature_key = CacheKey::Feature(feature_id).to_string();
        let ttl = self.config.ttl_seconds();
        let content = serde_json::to_string(&banner.content).map_err(CacheError::decode)?;
        let member = banner.banner_id.get();

        let mut pipeline = pipe();
        pipeline
            .atomic()
            .hset_multiple(
                &record_key,
                &[
                    (FIELD_CONTENT, content.as_str()),
                    (FIELD_IS_ACTIVE, encode_flag(banner.is_active)),
                ],
            )
            .ignore()
            .expire(&record_key, ttl)
            .ignore()
            .sadd(&tag_key, member)
            .ignore()
            .expire(&tag_key, ttl)
            .ignore()
            .sadd(&feature_key, member)
            .ignore()
            .expire(&feature_key, ttl)
            .ignore();

        let mut conn = self.connection.clone();
        let _: () = pipeline
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;

        Ok(())
    }

    async fn lookup(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
    ) -> Result<Option<CachedBanner>, CacheError> {
        let mut conn = self.connection.clone();
        let index_keys = [
            CacheKey::Tag(tag_id).to_string(),
            CacheKey::Feature(feature_id).to_string(),
        ];

        let members: Vec<i64> = conn
            .sinter(&index_keys)
            .await
            .map_err(CacheError::backend)?;

        let candidates = members.into_iter().map(BannerId::new).collect();
        let Some(banner_id) = pick_single(candidates) else {
            return Ok(None);
        };

        let (content, is_active): (Option<String>, Option<String>) = cmd("HMGET")
            .arg(CacheKey::Banner(banner_id).to_string())
            .arg(FIELD_CONTENT)
            .arg(FIELD_IS_ACTIVE)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;

        decode_record(banner_id, content, is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_record_decodes_as_absent() {
        let decoded = decode_record(BannerId::new(1), None, None).expect("decode");
        assert_eq!(decoded, None);
    }

    #[test]
    fn stored_fields_decode_into_record() {
        let decoded = decode_record(
            BannerId::new(3),
            Some(r#"{"title":"title3","text":"text3","url":"url3"}"#.to_string()),
            Some("0".to_string()),
        )
        .expect("decode")
        .expect("present");

        assert_eq!(decoded.banner_id, BannerId::new(3));
        assert_eq!(decoded.content.title, "title3");
        assert!(!decoded.is_active);
    }

    #[test]
    fn malformed_flag_is_a_decode_error() {
        let err = decode_record(
            BannerId::new(3),
            Some(r#"{"title":"t","text":"t","url":"u"}"#.to_string()),
            Some("yes".to_string()),
        )
        .expect_err("bad flag");
        assert!(matches!(err, CacheError::Decode(_)));
    }
}
