// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store used by tests and offline runs.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{FeedbackRecord, InterviewRecord, UserProfile};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Document store backed by concurrent maps, one per collection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<String, UserProfile>>,
    interviews: Arc<DashMap<String, InterviewRecord>>,
    feedback: Arc<DashMap<String, FeedbackRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored interview, newest first.
    pub fn all_interviews(&self) -> Vec<InterviewRecord> {
        let mut all: Vec<InterviewRecord> = self
            .interviews
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sort_newest_first(&mut all);
        all
    }
}

fn sort_newest_first(interviews: &mut [InterviewRecord]) {
    // RFC 3339 UTC timestamps with a `Z` suffix sort lexicographically.
    interviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.get(uid).map(|entry| entry.value().clone()))
    }

    async fn create_user(&self, profile: &UserProfile) -> Result<bool, AppError> {
        match self.users.entry(profile.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                Ok(true)
            }
        }
    }

    async fn add_interview(&self, interview: &InterviewRecord) -> Result<(), AppError> {
        match self.interviews.entry(interview.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Database(format!(
                "Interview {} already exists",
                interview.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(interview.clone());
                Ok(())
            }
        }
    }

    async fn get_interview(&self, id: &str) -> Result<Option<InterviewRecord>, AppError> {
        Ok(self.interviews.get(id).map(|entry| entry.value().clone()))
    }

    async fn interviews_for_user(&self, user_id: &str) -> Result<Vec<InterviewRecord>, AppError> {
        let mut found: Vec<InterviewRecord> = self
            .interviews
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        sort_newest_first(&mut found);
        Ok(found)
    }

    async fn latest_interviews(
        &self,
        exclude_user_id: &str,
        limit: usize,
    ) -> Result<Vec<InterviewRecord>, AppError> {
        Ok(self
            .all_interviews()
            .into_iter()
            .filter(|interview| interview.finalized && interview.user_id != exclude_user_id)
            .take(limit)
            .collect())
    }

    async fn get_feedback(&self, id: &str) -> Result<Option<FeedbackRecord>, AppError> {
        Ok(self.feedback.get(id).map(|entry| entry.value().clone()))
    }

    async fn set_feedback(&self, feedback: &FeedbackRecord) -> Result<(), AppError> {
        self.feedback.insert(feedback.id.clone(), feedback.clone());
        Ok(())
    }

    async fn feedback_for_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, AppError> {
        Ok(self
            .feedback
            .iter()
            .find(|entry| entry.interview_id == interview_id && entry.user_id == user_id)
            .map(|entry| entry.value().clone()))
    }
}
