// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth_gateway;
pub mod directory;
pub mod feedback;
pub mod id_token;
pub mod identity_toolkit;
pub mod interview;
pub mod session;
pub mod text_generation;

pub use auth_gateway::{AuthGateway, SESSION_COOKIE, SESSION_TTL};
pub use directory::{CredentialDirectory, Identity, MemoryDirectory};
pub use feedback::{CreateFeedback, FeedbackService};
pub use id_token::{FirebaseIdTokenVerifier, IdTokenVerifier, VerifiedIdToken};
pub use identity_toolkit::IdentityToolkitDirectory;
pub use interview::{GenerateInterview, InterviewGenerator};
pub use session::{JwtSessionService, SessionClaims, SessionTokenService};
pub use text_generation::{GeminiClient, TextGenerator};

use crate::error::AppError;
use std::future::Future;
use std::time::Duration;

/// Bound a call to an external collaborator.
pub(crate) async fn with_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Upstream call timed out");
            Err(AppError::Upstream(format!("{operation} timed out")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_timeout_passes_through_results() {
        let ok: Result<u32, AppError> =
            with_timeout(Duration::from_secs(1), "fast", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn with_timeout_reports_upstream_error() {
        let slow = with_timeout(Duration::from_millis(10), "slow call", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, AppError>(())
        })
        .await;

        match slow {
            Err(AppError::Upstream(msg)) => assert_eq!(msg, "slow call timed out"),
            other => panic!("expected upstream timeout, got {other:?}"),
        }
    }
}
