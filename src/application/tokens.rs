use std::sync::Arc;

use tracing::debug;

use crate::application::context::RequestContext;
use crate::application::error::BannerError;
use crate::application::repos::AccessTokensRepo;
use crate::domain::types::AccessLevel;

/// Resolves caller tokens to an access level. Issuance lives elsewhere.
#[derive(Clone)]
pub struct TokenService {
    repo: Arc<dyn AccessTokensRepo>,
}

impl TokenService {
    pub fn new(repo: Arc<dyn AccessTokensRepo>) -> Self {
        Self { repo }
    }

    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        token: Option<&str>,
    ) -> Result<AccessLevel, BannerError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(BannerError::Unauthorized)?;

        let level = ctx
            .run(async {
                self.repo
                    .find_access_level(token)
                    .await
                    .map_err(BannerError::from)
            })
            .await?;

        match level {
            Some(level) => Ok(level),
            None => {
                debug!("Rejected unknown access token");
                Err(BannerError::Unauthorized)
            }
        }
    }

    /// Mutations and listings are admin-only; only banner resolution is open
    /// to regular users.
    pub fn require_admin(level: AccessLevel) -> Result<(), BannerError> {
        if level.is_admin() {
            Ok(())
        } else {
            Err(BannerError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::RepoError;

    struct StubTokens(HashMap<&'static str, AccessLevel>);

    #[async_trait]
    impl AccessTokensRepo for StubTokens {
        async fn find_access_level(&self, token: &str) -> Result<Option<AccessLevel>, RepoError> {
            Ok(self.0.get(token).copied())
        }
    }

    fn service() -> TokenService {
        TokenService::new(Arc::new(StubTokens(HashMap::from([
            ("user_token", AccessLevel::User),
            ("admin_token", AccessLevel::Admin),
        ]))))
    }

    fn ctx() -> RequestContext {
        RequestContext::with_timeout(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn known_tokens_resolve_to_their_level() {
        let service = service();
        assert_eq!(
            service.authorize(&ctx(), Some("user_token")).await.expect("user"),
            AccessLevel::User
        );
        assert_eq!(
            service
                .authorize(&ctx(), Some("admin_token"))
                .await
                .expect("admin"),
            AccessLevel::Admin
        );
    }

    #[tokio::test]
    async fn missing_or_unknown_tokens_are_unauthorized() {
        let service = service();
        for token in [None, Some(""), Some("   "), Some("nope")] {
            let err = service.authorize(&ctx(), token).await.expect_err("rejected");
            assert!(matches!(err, BannerError::Unauthorized));
        }
    }

    #[test]
    fn users_cannot_reach_admin_operations() {
        assert!(matches!(
            TokenService::require_admin(AccessLevel::User),
            Err(BannerError::Forbidden)
        ));
        assert!(TokenService::require_admin(AccessLevel::Admin).is_ok());
    }
}
