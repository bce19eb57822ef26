// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles keyed by identity ID)
//! - Interviews (generated question sets)
//! - Feedback (transcript assessments)

use crate::config::Config;
use crate::db::{collections, DocumentStore};
use crate::error::AppError;
use crate::models::{FeedbackRecord, InterviewRecord, UserProfile};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreQueryDirection;

/// Extra documents fetched for the "latest" query so that filtering out the
/// caller's own interviews still fills the page in the common case.
const LATEST_OVERFETCH: u32 = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// Uses the Firebase service account from the config when one is set,
    /// otherwise application default credentials. For local development with
    /// the emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let project_id = config.firebase_project_id.as_str();

        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = if config.firebase_private_key.is_empty() {
            firestore::FirestoreDb::new(project_id).await
        } else {
            let options = firestore::FirestoreDbOptions::new(project_id.to_string());
            firestore::FirestoreDb::with_options_token_source(
                options,
                gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
                gcloud_sdk::TokenSourceType::Json(service_account_json(config)),
            )
            .await
        }
        .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        let profile: Option<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Older profiles only carry name and email; the document ID is the uid.
        Ok(profile.map(|mut profile| {
            profile.id = uid.to_string();
            profile
        }))
    }

    async fn create_user(&self, profile: &UserProfile) -> Result<bool, AppError> {
        // `insert` is a create-if-absent: Firestore rejects it when the
        // document already exists.
        let result: Result<UserProfile, FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => {
                tracing::debug!(uid = %profile.id, "User profile already exists");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    // ─── Interview Operations ────────────────────────────────────

    async fn add_interview(&self, interview: &InterviewRecord) -> Result<(), AppError> {
        let _: InterviewRecord = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::INTERVIEWS)
            .document_id(&interview.id)
            .object(interview)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_interview(&self, id: &str) -> Result<Option<InterviewRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::INTERVIEWS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn interviews_for_user(&self, user_id: &str) -> Result<Vec<InterviewRecord>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::INTERVIEWS)
            .filter(move |q| q.for_all([q.field("userId").eq(user_id.clone())]))
            .order_by([("createdAt", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn latest_interviews(
        &self,
        exclude_user_id: &str,
        limit: usize,
    ) -> Result<Vec<InterviewRecord>, AppError> {
        // Firestore needs the inequality field ordered first, which would
        // break newest-first ordering; filter the caller out here instead.
        let fetched: Vec<InterviewRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::INTERVIEWS)
            .filter(|q| q.for_all([q.field("finalized").eq(true)]))
            .order_by([("createdAt", FirestoreQueryDirection::Descending)])
            .limit(limit as u32 + LATEST_OVERFETCH)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(fetched
            .into_iter()
            .filter(|interview| interview.user_id != exclude_user_id)
            .take(limit)
            .collect())
    }

    // ─── Feedback Operations ─────────────────────────────────────

    async fn get_feedback(&self, id: &str) -> Result<Option<FeedbackRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FEEDBACK)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_feedback(&self, feedback: &FeedbackRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FEEDBACK)
            .document_id(&feedback.id)
            .object(feedback)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn feedback_for_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, AppError> {
        let interview_id = interview_id.to_string();
        let user_id = user_id.to_string();

        let mut found: Vec<FeedbackRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::FEEDBACK)
            .filter(move |q| {
                q.for_all([
                    q.field("interviewId").eq(interview_id.clone()),
                    q.field("userId").eq(user_id.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.pop())
    }
}

/// Build the service account JSON that gcloud-sdk expects from the
/// individually injected Firebase credentials.
fn service_account_json(config: &Config) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": config.firebase_project_id,
        "private_key_id": "",
        "private_key": config.firebase_private_key,
        "client_email": config.firebase_client_email,
        "client_id": "",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token",
    })
    .to_string()
}
