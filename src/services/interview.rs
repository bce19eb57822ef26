// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Interview generation: prompt construction, output parsing and persistence.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::InterviewRecord;
use crate::services::text_generation::{strip_json_fences, TextGenerator};
use crate::services::with_timeout;
use crate::time_utils::format_utc_rfc3339;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;

/// Cover images shipped with the web client, relative to `/covers`.
pub const INTERVIEW_COVERS: &[&str] = &[
    "/adobe.png",
    "/amazon.png",
    "/facebook.png",
    "/hostinger.png",
    "/pinterest.png",
    "/quora.png",
    "/reddit.png",
    "/skype.png",
    "/spotify.png",
    "/telegram.png",
    "/tiktok.png",
    "/yahoo.png",
];

/// Inputs for one generated interview.
#[derive(Debug, Clone)]
pub struct GenerateInterview {
    pub interview_type: String,
    pub role: String,
    pub level: String,
    /// Comma-separated technologies, as typed by the user
    pub techstack: String,
    pub amount: u32,
    pub user_id: String,
}

/// Build the question-generation prompt.
pub fn build_prompt(request: &GenerateInterview) -> String {
    format!(
        "Prepare questions for a job interview.
The job role is {role}.
The job experience level is {level}.
The tech stack used in the job is: {techstack}.
The focus between behavioural and technical questions should lean towards: {interview_type}.
The amount of questions required is: {amount}.
Please return only the questions, without any additional text.
The questions are going to be read by a voice assistant so do not use \"/\" or \"*\" or any other special characters which might break the voice assistant.
Return the questions formatted like this:
[\"Question 1\", \"Question 2\", \"Question 3\"]

Thank you! <3
",
        role = request.role,
        level = request.level,
        techstack = request.techstack,
        interview_type = request.interview_type,
        amount = request.amount,
    )
}

/// Parse model output as a JSON array of question strings.
pub fn parse_questions(text: &str) -> Result<Vec<String>, AppError> {
    let questions: Vec<String> = serde_json::from_str(strip_json_fences(text))
        .map_err(|e| AppError::GenerationParse(format!("expected a JSON array of strings: {e}")))?;

    if questions.is_empty() {
        return Err(AppError::GenerationParse(
            "model returned no questions".to_string(),
        ));
    }

    Ok(questions)
}

/// Split a comma-separated tech stack into trimmed entries, keeping order.
pub fn split_techstack(techstack: &str) -> Vec<String> {
    techstack
        .split(',')
        .map(str::trim)
        .filter(|tech| !tech.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pick a cover image path at random.
pub fn random_cover() -> String {
    let cover = INTERVIEW_COVERS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(INTERVIEW_COVERS[0]);
    format!("/covers{cover}")
}

/// Generates interviews with the text generator and stores them.
pub struct InterviewGenerator {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn DocumentStore>,
    max_attempts: u32,
    upstream_timeout: Duration,
}

impl InterviewGenerator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn DocumentStore>,
        max_attempts: u32,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            store,
            max_attempts: max_attempts.max(1),
            upstream_timeout,
        }
    }

    /// Generate, validate and persist one interview.
    ///
    /// Unparseable output is retried up to `max_attempts` times in total;
    /// upstream failures are not retried here. Nothing is stored unless
    /// parsing succeeds.
    pub async fn generate(&self, request: &GenerateInterview) -> Result<InterviewRecord, AppError> {
        let prompt = build_prompt(request);
        let questions = self.generate_questions(&prompt, request.amount).await?;

        let interview = InterviewRecord {
            id: uuid::Uuid::new_v4().to_string(),
            role: request.role.clone(),
            level: request.level.clone(),
            interview_type: request.interview_type.clone(),
            techstack: split_techstack(&request.techstack),
            questions,
            user_id: request.user_id.clone(),
            finalized: true,
            cover_image: random_cover(),
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        with_timeout(
            self.upstream_timeout,
            "interview store",
            self.store.add_interview(&interview),
        )
        .await?;

        tracing::info!(
            interview_id = %interview.id,
            user_id = %interview.user_id,
            questions = interview.questions.len(),
            "Interview generated"
        );

        Ok(interview)
    }

    async fn generate_questions(&self, prompt: &str, amount: u32) -> Result<Vec<String>, AppError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let text = with_timeout(
                self.upstream_timeout,
                "text generation",
                self.generator.generate_text(prompt),
            )
            .await?;

            match parse_questions(&text) {
                Ok(questions) => {
                    if questions.len() != amount as usize {
                        tracing::warn!(
                            requested = amount,
                            received = questions.len(),
                            "Model returned a different number of questions"
                        );
                    }
                    return Ok(questions);
                }
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(attempt, error = %e, "Unparseable generation output, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
