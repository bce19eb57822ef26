// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Interview generation endpoint, called by the voice assistant workflow.
//!
//! Every failure, including a body that does not parse, is reported as
//! `{success: false, error}` with status 500.

use crate::error::AppError;
use crate::services::GenerateInterview;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/vapi/generate", get(ping).post(generate))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type is required"))]
    pub interview_type: String,
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
    #[validate(length(min = 1, message = "level is required"))]
    pub level: String,
    pub techstack: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    #[validate(range(min = 1, max = 50, message = "amount must be between 1 and 50"))]
    pub amount: u32,
    #[validate(length(min = 1, message = "userid is required"))]
    pub userid: String,
}

/// Voice workflows send variables as strings, so `"3"` and `3` are both
/// accepted.
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(u32),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("amount is not a number: {s:?}"))),
    }
}

impl From<GenerateRequest> for GenerateInterview {
    fn from(req: GenerateRequest) -> Self {
        Self {
            interview_type: req.interview_type,
            role: req.role,
            level: req.level,
            techstack: req.techstack,
            amount: req.amount,
            user_id: req.userid,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerateResponse {
    Success {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl GenerateResponse {
    fn ok() -> Self {
        GenerateResponse::Success {
            success: true,
            data: None,
        }
    }

    fn failed(error: impl ToString) -> Self {
        GenerateResponse::Failure {
            success: false,
            error: error.to_string(),
        }
    }
}

impl IntoResponse for GenerateResponse {
    fn into_response(self) -> Response {
        let status = match &self {
            GenerateResponse::Success { .. } => StatusCode::OK,
            GenerateResponse::Failure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

async fn ping() -> GenerateResponse {
    GenerateResponse::Success {
        success: true,
        data: Some("Thank you!".to_string()),
    }
}

async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> GenerateResponse {
    match run(&state, payload).await {
        Ok(()) => GenerateResponse::ok(),
        Err(e) => {
            tracing::error!(error = %e, "Interview generation failed");
            GenerateResponse::failed(e)
        }
    }
}

async fn run(
    state: &AppState,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<(), AppError> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    body.validate()?;

    state.interviews.generate(&body.into()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<GenerateRequest, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn amount_accepts_number_or_string() {
        let base = json!({
            "type": "Technical", "role": "Backend Engineer", "level": "Mid",
            "techstack": "Go,Postgres", "userid": "u1"
        });

        let mut numeric = base.clone();
        numeric["amount"] = json!(3);
        assert_eq!(parse(numeric).unwrap().amount, 3);

        let mut text = base.clone();
        text["amount"] = json!(" 5 ");
        assert_eq!(parse(text).unwrap().amount, 5);

        let mut bad = base;
        bad["amount"] = json!("five");
        assert!(parse(bad).is_err());
    }

    #[test]
    fn amount_range_is_validated() {
        let req = parse(json!({
            "type": "Technical", "role": "r", "level": "l",
            "techstack": "", "amount": 0, "userid": "u1"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn response_bodies() {
        assert_eq!(
            serde_json::to_value(GenerateResponse::ok()).unwrap(),
            json!({ "success": true })
        );
        assert_eq!(
            serde_json::to_value(GenerateResponse::failed("boom")).unwrap(),
            json!({ "success": false, "error": "boom" })
        );
    }
}
