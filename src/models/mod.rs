// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod feedback;
pub mod interview;
pub mod user;

pub use feedback::{CategoryScore, FeedbackAssessment, FeedbackRecord, TranscriptEntry};
pub use interview::InterviewRecord;
pub use user::{Session, UserProfile};
