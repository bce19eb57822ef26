// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Interview feedback: transcript assessment through the text generator.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{FeedbackAssessment, FeedbackRecord, TranscriptEntry};
use crate::services::text_generation::{strip_json_fences, TextGenerator};
use crate::services::with_timeout;
use crate::time_utils::format_utc_rfc3339;
use std::sync::Arc;
use std::time::Duration;

/// Categories every assessment must score, in this order.
pub const FEEDBACK_CATEGORIES: [&str; 5] = [
    "Communication Skills",
    "Technical Knowledge",
    "Problem Solving",
    "Cultural Fit",
    "Confidence and Clarity",
];

const MAX_SCORE: u32 = 100;

/// Request to assess one interview attempt.
#[derive(Debug, Clone)]
pub struct CreateFeedback {
    pub interview_id: String,
    pub user_id: String,
    pub transcript: Vec<TranscriptEntry>,
    /// Replace this feedback document instead of creating a new one
    pub feedback_id: Option<String>,
}

/// Render the transcript as one `- role: content` line per entry.
pub fn format_transcript(transcript: &[TranscriptEntry]) -> String {
    transcript
        .iter()
        .map(|entry| format!("- {}: {}\n", entry.role, entry.content))
        .collect()
}

pub fn build_feedback_prompt(transcript: &[TranscriptEntry]) -> String {
    let categories = FEEDBACK_CATEGORIES
        .iter()
        .map(|name| format!("- **{name}**"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an AI interviewer analyzing a mock interview. Your task is to evaluate the candidate based on structured categories. Be thorough and detailed in your analysis. Don't be lenient with the candidate. If there are mistakes or areas for improvement, point them out.
Transcript:
{transcript}
Please score the candidate from 0 to 100 in the following areas. Do not add categories other than the ones provided:
{categories}

Return only a JSON object with exactly these fields and no other text:
{{\"totalScore\": number, \"categoryScores\": [{{\"name\": string, \"score\": number, \"comment\": string}}], \"strengths\": [string], \"areasForImprovement\": [string], \"finalAssessment\": string}}
",
        transcript = format_transcript(transcript),
    )
}

/// Parse and validate the model's assessment.
pub fn parse_feedback(text: &str) -> Result<FeedbackAssessment, AppError> {
    let assessment: FeedbackAssessment = serde_json::from_str(strip_json_fences(text))
        .map_err(|e| AppError::GenerationParse(format!("expected a feedback object: {e}")))?;

    if assessment.total_score > MAX_SCORE {
        return Err(AppError::GenerationParse(format!(
            "total score {} out of range",
            assessment.total_score
        )));
    }

    let names: Vec<&str> = assessment
        .category_scores
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    if names != FEEDBACK_CATEGORIES {
        return Err(AppError::GenerationParse(format!(
            "unexpected categories: {names:?}"
        )));
    }

    if let Some(bad) = assessment
        .category_scores
        .iter()
        .find(|c| c.score > MAX_SCORE)
    {
        return Err(AppError::GenerationParse(format!(
            "score {} for {} out of range",
            bad.score, bad.name
        )));
    }

    Ok(assessment)
}

/// Creates and looks up interview feedback.
pub struct FeedbackService {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn DocumentStore>,
    upstream_timeout: Duration,
}

impl FeedbackService {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn DocumentStore>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            store,
            upstream_timeout,
        }
    }

    /// Assess a transcript and store the result.
    ///
    /// With `feedback_id` set, the existing document is replaced only if it
    /// belongs to the same user and interview; otherwise this is `NotFound`,
    /// so callers cannot tell foreign ids from unknown ones.
    pub async fn create(&self, request: CreateFeedback) -> Result<FeedbackRecord, AppError> {
        if request.transcript.is_empty() {
            return Err(AppError::BadRequest("transcript is empty".to_string()));
        }

        with_timeout(
            self.upstream_timeout,
            "interview lookup",
            self.store.get_interview(&request.interview_id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {}", request.interview_id)))?;

        if let Some(feedback_id) = &request.feedback_id {
            self.check_replaceable(feedback_id, &request).await?;
        }

        let text = with_timeout(
            self.upstream_timeout,
            "text generation",
            self.generator
                .generate_text(&build_feedback_prompt(&request.transcript)),
        )
        .await?;
        let assessment = parse_feedback(&text)?;

        let feedback = FeedbackRecord {
            id: request
                .feedback_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            interview_id: request.interview_id,
            user_id: request.user_id,
            total_score: assessment.total_score,
            category_scores: assessment.category_scores,
            strengths: assessment.strengths,
            areas_for_improvement: assessment.areas_for_improvement,
            final_assessment: assessment.final_assessment,
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        with_timeout(
            self.upstream_timeout,
            "feedback store",
            self.store.set_feedback(&feedback),
        )
        .await?;

        tracing::info!(
            feedback_id = %feedback.id,
            interview_id = %feedback.interview_id,
            total_score = feedback.total_score,
            "Feedback stored"
        );

        Ok(feedback)
    }

    async fn check_replaceable(
        &self,
        feedback_id: &str,
        request: &CreateFeedback,
    ) -> Result<(), AppError> {
        let existing = with_timeout(
            self.upstream_timeout,
            "feedback lookup",
            self.store.get_feedback(feedback_id),
        )
        .await?;

        match existing {
            Some(existing)
                if existing.user_id == request.user_id
                    && existing.interview_id == request.interview_id =>
            {
                Ok(())
            }
            Some(_) => {
                tracing::warn!(
                    feedback_id,
                    user_id = %request.user_id,
                    "Feedback replace rejected: owner or interview mismatch"
                );
                Err(AppError::NotFound(format!("Feedback {feedback_id}")))
            }
            None => Err(AppError::NotFound(format!("Feedback {feedback_id}"))),
        }
    }

    pub async fn for_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<FeedbackRecord>, AppError> {
        with_timeout(
            self.upstream_timeout,
            "feedback lookup",
            self.store.feedback_for_interview(interview_id, user_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment_json(categories: &[(&str, u32)], total: u32) -> String {
        serde_json::json!({
            "totalScore": total,
            "categoryScores": categories
                .iter()
                .map(|(name, score)| serde_json::json!({ "name": name, "score": score, "comment": "ok" }))
                .collect::<Vec<_>>(),
            "strengths": ["Clear answers"],
            "areasForImprovement": ["More depth"],
            "finalAssessment": "Solid."
        })
        .to_string()
    }

    fn all_categories(score: u32) -> Vec<(&'static str, u32)> {
        FEEDBACK_CATEGORIES.iter().map(|name| (*name, score)).collect()
    }

    #[test]
    fn transcript_renders_one_line_per_entry() {
        let transcript = vec![
            TranscriptEntry {
                role: "assistant".to_string(),
                content: "Why Rust?".to_string(),
            },
            TranscriptEntry {
                role: "user".to_string(),
                content: "Memory safety.".to_string(),
            },
        ];

        assert_eq!(
            format_transcript(&transcript),
            "- assistant: Why Rust?\n- user: Memory safety.\n"
        );
        assert!(build_feedback_prompt(&transcript).contains("- user: Memory safety."));
    }

    #[test]
    fn parse_feedback_accepts_complete_assessment() {
        let parsed = parse_feedback(&assessment_json(&all_categories(70), 72)).unwrap();
        assert_eq!(parsed.total_score, 72);
        assert_eq!(parsed.category_scores.len(), 5);
        assert_eq!(parsed.areas_for_improvement, vec!["More depth"]);
    }

    struct FixedGenerator(String);

    #[async_trait::async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate_text(&self, _prompt: &str) -> Result<String, AppError> {
            Ok(self.0.clone())
        }
    }

    fn request(user_id: &str, feedback_id: Option<&str>) -> CreateFeedback {
        CreateFeedback {
            interview_id: "iv-1".to_string(),
            user_id: user_id.to_string(),
            transcript: vec![TranscriptEntry {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            feedback_id: feedback_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn replacing_requires_same_owner_and_interview() {
        let store = crate::db::MemoryStore::new();
        store
            .add_interview(&crate::models::InterviewRecord {
                id: "iv-1".to_string(),
                role: "Backend Developer".to_string(),
                level: "Senior".to_string(),
                interview_type: "Technical".to_string(),
                techstack: vec!["Rust".to_string()],
                questions: vec!["Why Rust?".to_string()],
                user_id: "owner".to_string(),
                finalized: true,
                cover_image: "/covers/adobe.png".to_string(),
                created_at: "2026-01-01T00:00:00Z".to_string(),
            })
            .await
            .unwrap();
        let service = FeedbackService::new(
            Arc::new(FixedGenerator(assessment_json(&all_categories(60), 60))),
            Arc::new(store.clone()),
            Duration::from_secs(5),
        );

        let first = service.create(request("ada", None)).await.unwrap();

        let foreign = service.create(request("bob", Some(&first.id))).await;
        assert!(matches!(foreign, Err(AppError::NotFound(_))));

        let unknown = service.create(request("ada", Some("no-such-feedback"))).await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
        assert!(store.get_feedback("no-such-feedback").await.unwrap().is_none());

        let replaced = service.create(request("ada", Some(&first.id))).await.unwrap();
        assert_eq!(replaced.id, first.id);
        assert_eq!(
            store.get_feedback(&first.id).await.unwrap().unwrap().user_id,
            "ada"
        );
    }

    #[test]
    fn parse_feedback_rejects_bad_scores_and_categories() {
        assert!(parse_feedback(&assessment_json(&all_categories(70), 101)).is_err());
        assert!(parse_feedback(&assessment_json(&all_categories(150), 70)).is_err());
        assert!(parse_feedback(&assessment_json(&all_categories(70)[..4], 70)).is_err());
        assert!(parse_feedback("not json").is_err());
    }
}
