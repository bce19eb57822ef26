// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page data routes.
//!
//! Each route returns the JSON the corresponding page renders. The guards
//! in routes/mod.rs run first, so protected handlers always see a
//! `UserProfile` extension.

use crate::error::Result;
use crate::middleware::guard::HOME_PATH;
use crate::models::{FeedbackRecord, InterviewRecord, UserProfile};
use crate::services::with_timeout;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

const DASHBOARD_LATEST: usize = 20;

/// Post-login pages.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard))
        .route("/interview", get(new_interview))
        .route("/interview/{id}", get(interview_page))
        .route("/interview/{id}/feedback", get(feedback_page))
}

/// Pages only shown to signed-out visitors.
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sign-in", get(|| auth_page("sign-in")))
        .route("/sign-up", get(|| auth_page("sign-up")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPage {
    pub user: UserProfile,
    pub user_interviews: Vec<InterviewRecord>,
    pub latest_interviews: Vec<InterviewRecord>,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
) -> Result<Json<DashboardPage>> {
    let timeout = state.config.upstream_timeout;
    let (user_interviews, latest_interviews) = tokio::try_join!(
        with_timeout(
            timeout,
            "interview list",
            state.store.interviews_for_user(&user.id)
        ),
        with_timeout(
            timeout,
            "latest interviews",
            state.store.latest_interviews(&user.id, DASHBOARD_LATEST)
        ),
    )?;

    Ok(Json(DashboardPage {
        user,
        user_interviews,
        latest_interviews,
    }))
}

#[derive(Debug, Serialize)]
pub struct NewInterviewPage {
    pub user: UserProfile,
}

async fn new_interview(Extension(user): Extension<UserProfile>) -> Json<NewInterviewPage> {
    Json(NewInterviewPage { user })
}

#[derive(Debug, Serialize)]
pub struct InterviewPage {
    pub user: UserProfile,
    pub interview: InterviewRecord,
}

async fn interview_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
    Path(id): Path<String>,
) -> Result<Response> {
    let Some(interview) = load_interview(&state, &id).await? else {
        return Ok(Redirect::to(HOME_PATH).into_response());
    };

    Ok(Json(InterviewPage { user, interview }).into_response())
}

#[derive(Debug, Serialize)]
pub struct FeedbackPage {
    pub interview: InterviewRecord,
    pub feedback: Option<FeedbackRecord>,
}

async fn feedback_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserProfile>,
    Path(id): Path<String>,
) -> Result<Response> {
    let Some(interview) = load_interview(&state, &id).await? else {
        return Ok(Redirect::to(HOME_PATH).into_response());
    };
    let feedback = state.feedback.for_interview(&id, &user.id).await?;

    Ok(Json(FeedbackPage {
        interview,
        feedback,
    })
    .into_response())
}

async fn load_interview(state: &AppState, id: &str) -> Result<Option<InterviewRecord>> {
    with_timeout(
        state.config.upstream_timeout,
        "interview lookup",
        state.store.get_interview(id),
    )
    .await
}

#[derive(Debug, Serialize)]
pub struct AuthPage {
    pub page: &'static str,
}

async fn auth_page(page: &'static str) -> Json<AuthPage> {
    Json(AuthPage { page })
}
