use crate::application::repos::RepoError;

const TAG_FK_CONSTRAINT: &str = "banner_tags_tag_id_fkey";
const FEATURE_FK_CONSTRAINT: &str = "banner_features_feature_id_fkey";
const QUERY_CANCELED: &str = "57014";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => match db.constraint() {
            Some(TAG_FK_CONSTRAINT) => RepoError::MissingTag,
            Some(FEATURE_FK_CONSTRAINT) => RepoError::MissingFeature,
            _ => RepoError::integrity(db.message()),
        },
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
            RepoError::Timeout
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            RepoError::integrity(db.message())
        }
        other => RepoError::from_persistence(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_map_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn pool_exhaustion_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
    }

    #[test]
    fn other_failures_are_persistence_errors() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            RepoError::Persistence(_)
        ));
    }
}
