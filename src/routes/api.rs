// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::models::{FeedbackRecord, InterviewRecord, TranscriptEntry, UserProfile};
use crate::services::{with_timeout, CreateFeedback};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const DEFAULT_LATEST_LIMIT: usize = 20;
const MAX_LATEST_LIMIT: usize = 100;

/// API routes (require an authenticated session).
/// The session middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/interviews", get(get_my_interviews))
        .route("/api/interviews/latest", get(get_latest_interviews))
        .route("/api/interviews/{id}", get(get_interview))
        .route("/api/interviews/{id}/feedback", get(get_feedback))
        .route("/api/feedback", post(create_feedback))
}

// ─── User Profile ────────────────────────────────────────────

async fn get_me(Extension(user): Extension<UserProfile>) -> Json<UserProfile> {
    Json(user)
}

// ─── Interviews ──────────────────────────────────────────────

async fn get_my_interviews(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
) -> Result<Json<Vec<InterviewRecord>>> {
    let interviews = with_timeout(
        state.config.upstream_timeout,
        "interview list",
        state.store.interviews_for_user(&user.id),
    )
    .await?;
    Ok(Json(interviews))
}

#[derive(Debug, Deserialize)]
struct LatestQuery {
    limit: Option<usize>,
}

async fn get_latest_interviews(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<InterviewRecord>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LATEST_LIMIT)
        .clamp(1, MAX_LATEST_LIMIT);

    let interviews = with_timeout(
        state.config.upstream_timeout,
        "latest interviews",
        state.store.latest_interviews(&user.id, limit),
    )
    .await?;
    Ok(Json(interviews))
}

async fn get_interview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InterviewRecord>> {
    let interview = with_timeout(
        state.config.upstream_timeout,
        "interview lookup",
        state.store.get_interview(&id),
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Interview {id}")))?;
    Ok(Json(interview))
}

// ─── Feedback ────────────────────────────────────────────────

async fn get_feedback(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
    Path(id): Path<String>,
) -> Result<Json<FeedbackRecord>> {
    let feedback = state
        .feedback
        .for_interview(&id, &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Feedback for interview {id}")))?;
    Ok(Json(feedback))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    #[validate(length(min = 1, message = "interviewId is required"))]
    pub interview_id: String,
    #[validate(length(min = 1, message = "transcript is empty"))]
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default)]
    pub feedback_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateFeedbackResponse {
    pub success: bool,
    pub feedback_id: String,
}

async fn create_feedback(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
    Json(body): Json<CreateFeedbackRequest>,
) -> Result<(StatusCode, Json<CreateFeedbackResponse>)> {
    body.validate()?;

    let feedback = state
        .feedback
        .create(CreateFeedback {
            interview_id: body.interview_id,
            user_id: user.id,
            transcript: body.transcript,
            feedback_id: body.feedback_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateFeedbackResponse {
            success: true,
            feedback_id: feedback.id,
        }),
    ))
}
