// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication user directory over the Identity Toolkit REST API.
//!
//! Calls are authorized with an OAuth2 access token obtained through the
//! JWT-bearer grant, signed with the Firebase service account key. Access
//! tokens are cached until shortly before they expire.

use crate::config::Config;
use crate::error::AppError;
use crate::services::directory::{CredentialDirectory, Identity};
use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
/// Refresh access tokens this long before Google says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CachedAccessToken {
    token: String,
    expires_at: Instant,
}

/// Credential directory backed by Firebase Authentication.
pub struct IdentityToolkitDirectory {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    client_email: String,
    signing_key: EncodingKey,
    access_token: RwLock<Option<CachedAccessToken>>,
    refresh_lock: Mutex<()>,
}

impl IdentityToolkitDirectory {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .context("failed building Identity Toolkit HTTP client")?;

        let signing_key = EncodingKey::from_rsa_pem(config.firebase_private_key.as_bytes())
            .context("FIREBASE_PRIVATE_KEY is not a valid RSA PEM key")?;

        tracing::info!(
            project = %config.firebase_project_id,
            client_email = %config.firebase_client_email,
            "Initialized Identity Toolkit directory"
        );

        Ok(Self {
            http,
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
            project_id: config.firebase_project_id.clone(),
            client_email: config.firebase_client_email.clone(),
            signing_key,
            access_token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Get a cached access token or mint a new one.
    async fn access_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.cached_access_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while we waited.
        if let Some(token) = self.cached_access_token().await {
            return Ok(token);
        }

        let assertion = self.signed_assertion()?;
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Access token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Access token request returned {status}: {body}"
            )));
        }

        let granted: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(granted.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *self.access_token.write().await = Some(CachedAccessToken {
            token: granted.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        tracing::debug!(expires_in = granted.expires_in, "Service account access token refreshed");
        Ok(granted.access_token)
    }

    async fn cached_access_token(&self) -> Option<String> {
        let cache = self.access_token.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.token.clone())
    }

    fn signed_assertion(&self) -> Result<String, AppError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs();

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: TOKEN_URL,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Assertion signing failed: {}", e)))
    }

    /// `accounts:lookup` returns no `users` field when nothing matches.
    async fn lookup(&self, body: LookupRequest<'_>) -> Result<Option<Identity>, AppError> {
        let token = self.access_token().await?;
        let url = format!("{}/projects/{}/accounts:lookup", self.base_url, self.project_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Identity Toolkit request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Identity Toolkit lookup returned {status}: {body}"
            )));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid lookup response: {e}")))?;

        Ok(lookup.users.into_iter().next().map(Identity::from))
    }
}

#[async_trait]
impl CredentialDirectory for IdentityToolkitDirectory {
    async fn get_user(&self, uid: &str) -> Result<Option<Identity>, AppError> {
        self.lookup(LookupRequest {
            local_id: Some(vec![uid]),
            email: None,
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, AppError> {
        self.lookup(LookupRequest {
            local_id: None,
            email: Some(vec![email]),
        })
        .await
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    local_id: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<Vec<&'a str>>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    disabled: bool,
    /// Unix seconds, encoded as a decimal string.
    valid_since: Option<String>,
}

impl From<UserInfo> for Identity {
    fn from(user: UserInfo) -> Self {
        Identity {
            id: user.local_id,
            email: user.email,
            disabled: user.disabled,
            tokens_valid_after: user.valid_since.and_then(|raw| raw.parse().ok()),
        }
    }
}
