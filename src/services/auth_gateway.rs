// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth gateway: sign-up, sign-in and session resolution.
//!
//! Sign-up and sign-in report typed errors to their caller. Session
//! resolution never fails: every problem (missing cookie, bad signature,
//! revoked identity, missing profile, upstream outage) resolves to
//! `Session::Anonymous`.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{Session, UserProfile};
use crate::services::directory::CredentialDirectory;
use crate::services::session::SessionTokenService;
use crate::services::with_timeout;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use std::time::Duration;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Session validity window (one week).
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Orchestrates the credential directory, session tokens and user profiles.
pub struct AuthGateway {
    directory: Arc<dyn CredentialDirectory>,
    sessions: Arc<dyn SessionTokenService>,
    store: Arc<dyn DocumentStore>,
    secure_cookies: bool,
    upstream_timeout: Duration,
}

impl AuthGateway {
    pub fn new(
        directory: Arc<dyn CredentialDirectory>,
        sessions: Arc<dyn SessionTokenService>,
        store: Arc<dyn DocumentStore>,
        secure_cookies: bool,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            sessions,
            store,
            secure_cookies,
            upstream_timeout,
        }
    }

    /// Create the profile for a freshly registered identity.
    ///
    /// The identity must exist in the directory under `uid` with the same
    /// email (`NoSuchUser` / `BadRequest` otherwise). Fails with
    /// `AlreadyExists` if a profile is already stored for `uid`; the stored
    /// profile is never overwritten.
    pub async fn sign_up(&self, uid: &str, name: &str, email: &str) -> Result<(), AppError> {
        let identity = with_timeout(
            self.upstream_timeout,
            "identity lookup",
            self.directory.get_user(uid),
        )
        .await?;
        let Some(identity) = identity else {
            tracing::info!(uid, "Sign-up rejected: no identity for uid");
            return Err(AppError::NoSuchUser);
        };
        if !identity.email.trim().eq_ignore_ascii_case(email.trim()) {
            tracing::info!(uid, "Sign-up rejected: email does not match identity");
            return Err(AppError::BadRequest(
                "Email does not match the registered account".to_string(),
            ));
        }

        let existing = with_timeout(
            self.upstream_timeout,
            "profile lookup",
            self.store.get_user(uid),
        )
        .await?;
        if existing.is_some() {
            tracing::info!(uid, "Sign-up rejected: profile already exists");
            return Err(profile_exists());
        }

        let profile = UserProfile {
            id: uid.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };

        // The read above is only a fast path; this write is create-if-absent,
        // so a concurrent sign-up for the same uid still loses cleanly.
        let created = with_timeout(
            self.upstream_timeout,
            "profile create",
            self.store.create_user(&profile),
        )
        .await?;
        if !created {
            tracing::info!(uid, "Sign-up lost a concurrent create race");
            return Err(profile_exists());
        }

        tracing::info!(uid, "User profile created");
        Ok(())
    }

    /// Start a session for an existing identity.
    ///
    /// The ID token itself is checked by the session token service while
    /// minting; this only confirms that the email is registered.
    pub async fn sign_in(&self, email: &str, id_token: &str) -> Result<Cookie<'static>, AppError> {
        let identity = with_timeout(
            self.upstream_timeout,
            "identity lookup",
            self.directory.get_user_by_email(email),
        )
        .await?;

        let Some(identity) = identity else {
            tracing::info!("Sign-in rejected: no identity for email");
            return Err(AppError::NoSuchUser);
        };

        let cookie = self.mint_session(id_token).await?;
        tracing::info!(uid = %identity.id, "Session created");
        Ok(cookie)
    }

    /// Exchange an ID token for a session cookie valid for one week.
    pub async fn mint_session(&self, id_token: &str) -> Result<Cookie<'static>, AppError> {
        let token = with_timeout(
            self.upstream_timeout,
            "session create",
            self.sessions.create_session(id_token, SESSION_TTL),
        )
        .await?;

        Ok(self.session_cookie(token))
    }

    /// Resolve the caller's session from the request cookies.
    pub async fn current_session(&self, jar: &CookieJar) -> Session {
        self.session_for_token(jar.get(SESSION_COOKIE).map(|cookie| cookie.value()))
            .await
    }

    /// Resolve a raw session token. `None` means no token was presented.
    pub async fn session_for_token(&self, token: Option<&str>) -> Session {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Session::Anonymous;
        };

        match self.resolve_profile(token).await {
            Ok(Some(profile)) => Session::Authenticated(profile),
            Ok(None) => {
                tracing::debug!("Verified session has no profile; treating as anonymous");
                Session::Anonymous
            }
            Err(e) => {
                tracing::debug!(error = %e, "Session rejected; treating as anonymous");
                Session::Anonymous
            }
        }
    }

    pub async fn is_authenticated(&self, jar: &CookieJar) -> bool {
        self.current_session(jar).await.is_authenticated()
    }

    async fn resolve_profile(&self, token: &str) -> Result<Option<UserProfile>, AppError> {
        // Always consult the directory's revocation state.
        let claims = with_timeout(
            self.upstream_timeout,
            "session verify",
            self.sessions.verify_session(token, true),
        )
        .await?;

        with_timeout(
            self.upstream_timeout,
            "profile lookup",
            self.store.get_user(&claims.sub),
        )
        .await
    }

    fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .max_age(time::Duration::seconds(SESSION_TTL.as_secs() as i64))
            .http_only(true)
            .secure(self.secure_cookies)
            .path("/")
            .same_site(SameSite::Lax)
            .build()
    }

    /// Cookie that clears the session; attributes match the issued cookie.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .max_age(time::Duration::ZERO)
            .http_only(true)
            .secure(self.secure_cookies)
            .path("/")
            .same_site(SameSite::Lax)
            .build()
    }
}

fn profile_exists() -> AppError {
    AppError::AlreadyExists("User already exists. Please sign in.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::directory::MemoryDirectory;
    use crate::services::session::JwtSessionService;

    const KEY: &[u8] = b"test_session_key_32_bytes_long!!";

    fn gateway(directory: &MemoryDirectory, store: &MemoryStore) -> AuthGateway {
        let sessions = JwtSessionService::new(
            KEY.to_vec(),
            Arc::new(directory.clone()),
            Arc::new(directory.clone()),
        );
        AuthGateway::new(
            Arc::new(directory.clone()),
            Arc::new(sessions),
            Arc::new(store.clone()),
            true,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn session_cookie_attributes() {
        let gateway = gateway(&MemoryDirectory::new(), &MemoryStore::new());
        let cookie = gateway.session_cookie("token".to_string());

        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604_800)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[tokio::test]
    async fn sign_up_twice_is_rejected() {
        let store = MemoryStore::new();
        let directory = MemoryDirectory::new();
        let identity = directory.create_user("ada@example.com", "secret").unwrap();
        let gateway = gateway(&directory, &store);

        gateway
            .sign_up(&identity.id, "Ada", "ada@example.com")
            .await
            .unwrap();
        let second = gateway
            .sign_up(&identity.id, "Mallory", "ADA@example.com")
            .await;

        assert!(matches!(second, Err(AppError::AlreadyExists(_))));
        let stored = store.get_user(&identity.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Ada");
    }

    #[tokio::test]
    async fn sign_up_requires_matching_identity() {
        let store = MemoryStore::new();
        let directory = MemoryDirectory::new();
        let identity = directory.create_user("ada@example.com", "secret").unwrap();
        let gateway = gateway(&directory, &store);

        let unknown = gateway.sign_up("ghost-uid", "Ghost", "ghost@example.com").await;
        assert!(matches!(unknown, Err(AppError::NoSuchUser)));

        let wrong_email = gateway
            .sign_up(&identity.id, "Mallory", "mallory@example.com")
            .await;
        assert!(matches!(wrong_email, Err(AppError::BadRequest(_))));

        assert!(store.get_user("ghost-uid").await.unwrap().is_none());
        assert!(store.get_user(&identity.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_cookie_is_anonymous() {
        let gateway = gateway(&MemoryDirectory::new(), &MemoryStore::new());
        assert_eq!(
            gateway.current_session(&CookieJar::new()).await,
            Session::Anonymous
        );
        assert_eq!(gateway.session_for_token(Some("")).await, Session::Anonymous);
    }

    #[tokio::test]
    async fn session_without_profile_is_anonymous() {
        let directory = MemoryDirectory::new();
        directory.create_user("ada@example.com", "secret").unwrap();
        let id_token = directory
            .sign_in_with_password("ada@example.com", "secret")
            .unwrap();
        let gateway = gateway(&directory, &MemoryStore::new());

        // Identity exists, profile was never written.
        let cookie = gateway
            .sign_in("ada@example.com", &id_token)
            .await
            .unwrap();
        let jar = CookieJar::new().add(cookie);

        assert!(!gateway.is_authenticated(&jar).await);
    }
}
