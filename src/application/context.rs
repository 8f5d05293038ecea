//! Per-request deadline shared by every engine operation.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};

use crate::application::error::BannerError;

/// Bounds an operation in time. When the deadline passes the operation future
/// is dropped, which rolls back any open store transaction and releases its
/// pooled connection.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    deadline: Instant,
}

impl RequestContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    pub async fn run<T, F>(&self, operation: F) -> Result<T, BannerError>
    where
        F: Future<Output = Result<T, BannerError>>,
    {
        match timeout_at(self.deadline, operation).await {
            Ok(result) => result,
            Err(_) => Err(BannerError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_cancels_operation() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));
        let result: Result<(), BannerError> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(BannerError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_operation_completes() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(1));
        let value = ctx.run(async { Ok(7) }).await.expect("completes");
        assert_eq!(value, 7);
    }
}
