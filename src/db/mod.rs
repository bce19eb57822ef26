// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, with an in-memory store for tests and local runs).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{FeedbackRecord, InterviewRecord, UserProfile};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const INTERVIEWS: &str = "interviews";
    pub const FEEDBACK: &str = "feedback";
}

/// Document store operations used by the auth gateway and the interview
/// services.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a user profile by identity ID.
    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;

    /// Create a user profile unless one already exists for `profile.id`.
    ///
    /// Returns `false` when a profile was already present; the existing
    /// document is left untouched.
    async fn create_user(&self, profile: &UserProfile) -> Result<bool, AppError>;

    /// Store a new interview under `interview.id`.
    async fn add_interview(&self, interview: &InterviewRecord) -> Result<(), AppError>;

    async fn get_interview(&self, id: &str) -> Result<Option<InterviewRecord>, AppError>;

    /// Interviews owned by `user_id`, newest first.
    async fn interviews_for_user(&self, user_id: &str) -> Result<Vec<InterviewRecord>, AppError>;

    /// Finalized interviews owned by anyone except `user_id`, newest first.
    async fn latest_interviews(
        &self,
        exclude_user_id: &str,
        limit: usize,
    ) -> Result<Vec<InterviewRecord>, AppError>;

    async fn get_feedback(&self, id: &str) -> Result<Option<FeedbackRecord>, AppError>;

    /// Create or replace feedback under `feedback.id`.
    async fn set_feedback(&self, feedback: &FeedbackRecord) -> Result<(), AppError>;

    async fn feedback_for_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, AppError>;
}
