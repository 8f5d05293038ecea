use std::collections::BTreeSet;

use sqlx::{PgConnection, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    BannerQueryFilter, BannerStore, CreateBannerParams, RepoError, UpdateBannerParams,
};
use crate::domain::entities::{Banner, BannerContent, ResolvedBanner};
use crate::domain::types::{BannerId, FeatureId, TagId};

use super::{PostgresStore, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct BannerRow {
    id: i64,
    feature_id: i64,
    tag_ids: Vec<i64>,
    title: String,
    text: String,
    url: String,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BannerRow> for Banner {
    fn from(row: BannerRow) -> Self {
        Self {
            id: BannerId::new(row.id),
            tag_ids: row.tag_ids.into_iter().map(TagId::new).collect(),
            feature_id: FeatureId::new(row.feature_id),
            content: BannerContent {
                title: row.title,
                text: row.text,
                url: row.url,
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ResolvedRow {
    id: i64,
    title: String,
    text: String,
    url: String,
    is_active: bool,
}

impl From<ResolvedRow> for ResolvedBanner {
    fn from(row: ResolvedRow) -> Self {
        Self {
            id: BannerId::new(row.id),
            content: BannerContent {
                title: row.title,
                text: row.text,
                url: row.url,
            },
            is_active: row.is_active,
        }
    }
}

fn raw_tag_ids(tag_ids: &BTreeSet<TagId>) -> Vec<i64> {
    tag_ids.iter().map(|id| id.get()).collect()
}

/// True when a banner under `feature_id` (other than `excluding`) already
/// carries every tag in `tag_ids`.
async fn slot_taken(
    conn: &mut PgConnection,
    tag_ids: &BTreeSet<TagId>,
    feature_id: FeatureId,
    excluding: Option<BannerId>,
) -> Result<bool, RepoError> {
    let wanted = i64::try_from(tag_ids.len())
        .map_err(|_| RepoError::from_persistence("tag set exceeds supported range"))?;

    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM banner_features bf
            WHERE bf.feature_id = $1
              AND ($2::bigint IS NULL OR bf.banner_id <> $2)
              AND (
                  SELECT COUNT(DISTINCT bt.tag_id)
                  FROM banner_tags bt
                  WHERE bt.banner_id = bf.banner_id
                    AND bt.tag_id = ANY($3)
              ) = $4
        )
        "#,
    )
    .bind(feature_id.get())
    .bind(excluding.map(BannerId::get))
    .bind(raw_tag_ids(tag_ids))
    .bind(wanted)
    .fetch_one(conn)
    .await
    .map_err(map_sqlx_error)
}

async fn insert_tags(
    conn: &mut PgConnection,
    banner_id: i64,
    tag_ids: &BTreeSet<TagId>,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO banner_tags (banner_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::bigint[]) AS t(tag_id)
        "#,
    )
    .bind(banner_id)
    .bind(raw_tag_ids(tag_ids))
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

async fn current_tags(
    conn: &mut PgConnection,
    banner_id: i64,
) -> Result<BTreeSet<TagId>, RepoError> {
    let rows: Vec<i64> = sqlx::query_scalar("SELECT tag_id FROM banner_tags WHERE banner_id = $1")
        .bind(banner_id)
        .fetch_all(conn)
        .await
        .map_err(map_sqlx_error)?;

    Ok(rows.into_iter().map(TagId::new).collect())
}

#[async_trait::async_trait]
impl BannerStore for PostgresStore {
    async fn check_unique(
        &self,
        tag_ids: &BTreeSet<TagId>,
        feature_id: FeatureId,
        excluding: Option<BannerId>,
    ) -> Result<bool, RepoError> {
        let mut conn = self.pool().acquire().await.map_err(map_sqlx_error)?;
        let taken = slot_taken(&mut conn, tag_ids, feature_id, excluding).await?;
        Ok(!taken)
    }

    async fn create_banner(&self, params: CreateBannerParams) -> Result<BannerId, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        if slot_taken(&mut tx, &params.tag_ids, params.feature_id, None).await? {
            return Err(RepoError::Conflict);
        }

        let now = OffsetDateTime::now_utc();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO banners (title, text, url, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(&params.content.title)
        .bind(&params.content.text)
        .bind(&params.content.url)
        .bind(params.is_active)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        insert_tags(&mut tx, id, &params.tag_ids).await?;

        sqlx::query("INSERT INTO banner_features (banner_id, feature_id) VALUES ($1, $2)")
            .bind(id)
            .bind(params.feature_id.get())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(BannerId::new(id))
    }

    async fn update_banner(&self, params: UpdateBannerParams) -> Result<(), RepoError> {
        let id = params.id.get();
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let current_feature: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT bf.feature_id
            FROM banners b
            JOIN banner_features bf ON bf.banner_id = b.id
            WHERE b.id = $1
            FOR UPDATE OF b
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(current_feature) = current_feature else {
            return Err(RepoError::NotFound);
        };

        if params.touches_assignments() {
            let tag_ids = match params.tag_ids.as_ref() {
                Some(tag_ids) => tag_ids.clone(),
                None => current_tags(&mut tx, id).await?,
            };
            let feature_id = params
                .feature_id
                .unwrap_or(FeatureId::new(current_feature));

            if slot_taken(&mut tx, &tag_ids, feature_id, Some(params.id)).await? {
                return Err(RepoError::Conflict);
            }
        }

        if let Some(tag_ids) = params.tag_ids.as_ref() {
            sqlx::query("DELETE FROM banner_tags WHERE banner_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            insert_tags(&mut tx, id, tag_ids).await?;
        }

        if let Some(feature_id) = params.feature_id {
            sqlx::query("UPDATE banner_features SET feature_id = $2 WHERE banner_id = $1")
                .bind(id)
                .bind(feature_id.get())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        sqlx::query(
            r#"
            UPDATE banners
            SET title = COALESCE($2, title),
                text = COALESCE($3, text),
                url = COALESCE($4, url),
                is_active = COALESCE($5, is_active),
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(params.content.title.as_deref())
        .bind(params.content.text.as_deref())
        .bind(params.content.url.as_deref())
        .bind(params.is_active)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_banner(&self, id: BannerId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn resolve_banner(
        &self,
        tag_id: TagId,
        feature_id: FeatureId,
    ) -> Result<ResolvedBanner, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let mut rows: Vec<ResolvedRow> = sqlx::query_as(
            r#"
            SELECT b.id, b.title, b.text, b.url, b.is_active
            FROM banners b
            JOIN banner_tags bt ON bt.banner_id = b.id
            JOIN banner_features bf ON bf.banner_id = b.id
            WHERE bt.tag_id = $1 AND bf.feature_id = $2
            ORDER BY b.id
            LIMIT 2
            "#,
        )
        .bind(tag_id.get())
        .bind(feature_id.get())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        match rows.len() {
            0 => Err(RepoError::NotFound),
            1 => Ok(rows.remove(0).into()),
            _ => Err(RepoError::integrity(format!(
                "more than one banner assigned to tag {tag_id} and feature {feature_id}"
            ))),
        }
    }

    async fn list_banners(
        &self,
        filter: &BannerQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<Banner>, RepoError> {
        let limit = i64::from(window.limit());
        let offset = i64::try_from(window.offset())
            .map_err(|_| RepoError::from_persistence("offset exceeds supported range"))?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT b.id,
                   bf.feature_id,
                   ARRAY(
                       SELECT bt.tag_id FROM banner_tags bt
                       WHERE bt.banner_id = b.id
                       ORDER BY bt.tag_id
                   ) AS tag_ids,
                   b.title, b.text, b.url, b.is_active, b.created_at, b.updated_at
            FROM banners b
            JOIN banner_features bf ON bf.banner_id = b.id
            WHERE TRUE
            "#,
        );

        if let Some(tag_id) = filter.tag {
            qb.push(
                " AND EXISTS (SELECT 1 FROM banner_tags ft WHERE ft.banner_id = b.id AND ft.tag_id = ",
            );
            qb.push_bind(tag_id.get());
            qb.push(")");
        }

        if let Some(feature_id) = filter.feature {
            qb.push(" AND bf.feature_id = ");
            qb.push_bind(feature_id.get());
        }

        qb.push(" ORDER BY b.id LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows: Vec<BannerRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Banner::from).collect())
    }
}
