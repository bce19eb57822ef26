// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token service.
//!
//! Exchanges a verified ID token for a stateless HS256 session JWT, and
//! verifies session JWTs on later requests. With `check_revoked`, every
//! verification also consults the credential directory so that disabled,
//! deleted or revoked identities lose their sessions immediately.

use crate::error::AppError;
use crate::services::directory::CredentialDirectory;
use crate::services::id_token::IdTokenVerifier;
use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject (identity ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// When the user authenticated with the identity provider
    pub auth_time: u64,
}

/// Issues and validates signed session tokens.
#[async_trait]
pub trait SessionTokenService: Send + Sync {
    /// Mint a session token from an identity credential.
    async fn create_session(&self, id_token: &str, valid_for: Duration)
        -> Result<String, AppError>;

    /// Verify a session token and return its claims.
    async fn verify_session(
        &self,
        session: &str,
        check_revoked: bool,
    ) -> Result<SessionClaims, AppError>;
}

/// Session tokens signed with a shared HS256 key.
pub struct JwtSessionService {
    signing_key: Vec<u8>,
    id_tokens: Arc<dyn IdTokenVerifier>,
    directory: Arc<dyn CredentialDirectory>,
}

impl JwtSessionService {
    pub fn new(
        signing_key: Vec<u8>,
        id_tokens: Arc<dyn IdTokenVerifier>,
        directory: Arc<dyn CredentialDirectory>,
    ) -> Self {
        Self {
            signing_key,
            id_tokens,
            directory,
        }
    }

    async fn check_not_revoked(&self, claims: &SessionClaims) -> Result<(), AppError> {
        let identity = self
            .directory
            .get_user(&claims.sub)
            .await?
            .ok_or(AppError::InvalidSession)?;

        if identity.disabled {
            tracing::debug!(uid = %claims.sub, "Session belongs to a disabled identity");
            return Err(AppError::InvalidSession);
        }

        if identity
            .tokens_valid_after
            .is_some_and(|valid_after| claims.auth_time < valid_after)
        {
            tracing::debug!(uid = %claims.sub, "Session was revoked");
            return Err(AppError::InvalidSession);
        }

        Ok(())
    }
}

#[async_trait]
impl SessionTokenService for JwtSessionService {
    async fn create_session(
        &self,
        id_token: &str,
        valid_for: Duration,
    ) -> Result<String, AppError> {
        let verified = self.id_tokens.verify_id_token(id_token).await?;

        create_session_jwt(
            &verified.uid,
            verified.auth_time,
            valid_for,
            &self.signing_key,
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    async fn verify_session(
        &self,
        session: &str,
        check_revoked: bool,
    ) -> Result<SessionClaims, AppError> {
        let claims = decode_session_jwt(session, &self.signing_key)?;

        if check_revoked {
            self.check_not_revoked(&claims).await?;
        }

        Ok(claims)
    }
}

/// Create a JWT for a user session.
pub(crate) fn create_session_jwt(
    uid: &str,
    auth_time: u64,
    valid_for: Duration,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let claims = SessionClaims {
        sub: uid.to_string(),
        iat: now,
        exp: now + valid_for.as_secs(),
        auth_time,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Decode and validate a session JWT (signature and expiry).
pub(crate) fn decode_session_jwt(
    token: &str,
    signing_key: &[u8],
) -> Result<SessionClaims, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<SessionClaims>(token, &key, &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            AppError::InvalidSession
        })?
        .claims;

    if claims.sub.is_empty() {
        return Err(AppError::InvalidSession);
    }

    Ok(claims)
}
