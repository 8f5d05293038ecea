use crate::application::repos::{AccessTokensRepo, RepoError};
use crate::domain::types::AccessLevel;

use super::{PostgresStore, map_sqlx_error};

#[async_trait::async_trait]
impl AccessTokensRepo for PostgresStore {
    async fn find_access_level(&self, token: &str) -> Result<Option<AccessLevel>, RepoError> {
        let is_admin: Option<bool> =
            sqlx::query_scalar("SELECT is_admin FROM access_tokens WHERE token = $1")
                .bind(token)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(is_admin.map(AccessLevel::from_admin_flag))
    }
}
