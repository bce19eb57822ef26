// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential directory: identity records owned by the identity provider.
//!
//! Production uses Firebase Authentication through the Identity Toolkit REST
//! API (see `identity_toolkit`). `MemoryDirectory` is a self-contained
//! directory for tests and offline runs that also plays the role of the
//! client SDK, issuing ID tokens on password sign-in.

use crate::error::AppError;
use crate::services::id_token::{IdTokenVerifier, VerifiedIdToken};
use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

/// An authenticatable principal as seen by this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub disabled: bool,
    /// Sessions authenticated before this instant (Unix seconds) are revoked.
    pub tokens_valid_after: Option<u64>,
}

/// Lookup interface over the identity provider.
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<Option<Identity>, AppError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, AppError>;
}

struct StoredIdentity {
    identity: Identity,
    password_digest: [u8; 32],
}

/// Directory held entirely in memory.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    by_id: Arc<DashMap<String, StoredIdentity>>,
    /// Lowercased email -> identity ID
    by_email: Arc<DashMap<String, String>>,
    /// Outstanding ID tokens -> (identity ID, auth time)
    id_tokens: Arc<DashMap<String, (String, u64)>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new identity. Emails are unique, compared case-insensitively.
    pub fn create_user(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let key = email.trim().to_lowercase();
        let id = uuid::Uuid::new_v4().simple().to_string();

        match self.by_email.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(AppError::AlreadyExists(
                    "This email is already in use".to_string(),
                ))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id.clone());
            }
        }

        let identity = Identity {
            id: id.clone(),
            email: email.trim().to_string(),
            disabled: false,
            tokens_valid_after: None,
        };
        self.by_id.insert(
            id,
            StoredIdentity {
                identity: identity.clone(),
                password_digest: digest(password),
            },
        );

        Ok(identity)
    }

    /// Check a password and hand out a fresh ID token, as the client SDK
    /// would after `signInWithEmailAndPassword`.
    pub fn sign_in_with_password(&self, email: &str, password: &str) -> Result<String, AppError> {
        let uid = self
            .by_email
            .get(&email.trim().to_lowercase())
            .map(|entry| entry.value().clone())
            .ok_or(AppError::NoSuchUser)?;

        let stored = self.by_id.get(&uid).ok_or(AppError::NoSuchUser)?;
        let matches: bool = stored
            .password_digest[..]
            .ct_eq(&digest(password)[..])
            .into();
        if !matches || stored.identity.disabled {
            return Err(AppError::InvalidSession);
        }

        let token = uuid::Uuid::new_v4().to_string();
        self.id_tokens.insert(token.clone(), (uid, now_unix_secs()));
        Ok(token)
    }

    /// Revoke every session authenticated before `valid_after` (Unix seconds).
    pub fn set_tokens_valid_after(&self, uid: &str, valid_after: u64) {
        if let Some(mut stored) = self.by_id.get_mut(uid) {
            stored.identity.tokens_valid_after = Some(valid_after);
        }
    }

    pub fn set_disabled(&self, uid: &str, disabled: bool) {
        if let Some(mut stored) = self.by_id.get_mut(uid) {
            stored.identity.disabled = disabled;
        }
    }

    /// Remove an identity and its email mapping.
    pub fn delete_user(&self, uid: &str) {
        if let Some((_, stored)) = self.by_id.remove(uid) {
            self.by_email.remove(&stored.identity.email.to_lowercase());
        }
    }
}

#[async_trait]
impl CredentialDirectory for MemoryDirectory {
    async fn get_user(&self, uid: &str) -> Result<Option<Identity>, AppError> {
        Ok(self.by_id.get(uid).map(|stored| stored.identity.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, AppError> {
        let Some(uid) = self
            .by_email
            .get(&email.trim().to_lowercase())
            .map(|entry| entry.value().clone())
        else {
            return Ok(None);
        };
        self.get_user(&uid).await
    }
}

#[async_trait]
impl IdTokenVerifier for MemoryDirectory {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdToken, AppError> {
        let (uid, auth_time) = self
            .id_tokens
            .get(id_token)
            .map(|entry| entry.value().clone())
            .ok_or(AppError::InvalidSession)?;

        let identity = self
            .by_id
            .get(&uid)
            .map(|stored| stored.identity.clone())
            .ok_or(AppError::InvalidSession)?;

        Ok(VerifiedIdToken {
            uid,
            email: Some(identity.email),
            auth_time,
        })
    }
}

fn digest(password: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(password.as_bytes()));
    out
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
