// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: sign-up, sign-in and sign-out.
//!
//! These answer with `{success, message}` bodies the forms can show
//! directly, never with the generic error body.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
}

/// Sign-up form, submitted after the identity was created client-side.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 1, message = "uid is required"))]
    pub uid: String,
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "idToken is required"))]
    pub id_token: String,
}

/// Outcome shown to the user by the auth forms.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthAck {
    pub success: bool,
    pub message: String,
}

type AckResponse = (StatusCode, Json<AuthAck>);

fn ack(status: StatusCode, success: bool, message: impl Into<String>) -> AckResponse {
    (
        status,
        Json(AuthAck {
            success,
            message: message.into(),
        }),
    )
}

/// Parse and validate a form body, turning any problem into a 400 ack.
fn form<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AckResponse> {
    let Json(body) =
        payload.map_err(|e| ack(StatusCode::BAD_REQUEST, false, e.body_text()))?;
    body.validate().map_err(|e| {
        ack(
            StatusCode::BAD_REQUEST,
            false,
            AppError::from(e).to_string(),
        )
    })?;
    Ok(body)
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> AckResponse {
    let body = match form(payload) {
        Ok(body) => body,
        Err(rejected) => return rejected,
    };

    match state.auth.sign_up(&body.uid, &body.name, &body.email).await {
        Ok(()) => ack(
            StatusCode::CREATED,
            true,
            "Account created successfully. Please sign in.",
        ),
        Err(AppError::AlreadyExists(message)) => ack(StatusCode::CONFLICT, false, message),
        Err(AppError::NoSuchUser) => ack(
            StatusCode::NOT_FOUND,
            false,
            "User does not exist. Create an account instead.",
        ),
        Err(AppError::BadRequest(message)) => ack(StatusCode::BAD_REQUEST, false, message),
        Err(e) => {
            tracing::error!(error = %e, uid = %body.uid, "Sign-up failed");
            ack(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                "Failed to create account. Please try again.",
            )
        }
    }
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> (CookieJar, AckResponse) {
    let body = match form(payload) {
        Ok(body) => body,
        Err(rejected) => return (jar, rejected),
    };

    match state.auth.sign_in(&body.email, &body.id_token).await {
        Ok(cookie) => (
            jar.add(cookie),
            ack(StatusCode::OK, true, "Signed in successfully."),
        ),
        Err(AppError::NoSuchUser) => (
            jar,
            ack(
                StatusCode::NOT_FOUND,
                false,
                "User does not exist. Create an account instead.",
            ),
        ),
        Err(e) => {
            let status = match e {
                AppError::InvalidSession => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(error = %e, "Sign-in failed");
            (jar, ack(status, false, "Failed to log into an account."))
        }
    }
}

async fn sign_out(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, AckResponse) {
    (
        jar.add(state.auth.removal_cookie()),
        ack(StatusCode::OK, true, "Signed out."),
    )
}
