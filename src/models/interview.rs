// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Interview model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A generated interview question set, stored in Firestore.
///
/// Field names are camelCase in the stored document so the web client can
/// read the collection directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InterviewRecord {
    /// Document ID
    pub id: String,
    /// Job role, e.g. "Backend Engineer"
    pub role: String,
    /// Experience level, e.g. "Mid"
    pub level: String,
    /// Behavioural/technical focus
    #[serde(rename = "type")]
    pub interview_type: String,
    /// Technologies in the order they were given
    pub techstack: Vec<String>,
    /// Questions for the voice assistant to ask
    pub questions: Vec<String>,
    /// Owner (identity ID)
    pub user_id: String,
    pub finalized: bool,
    /// Path under the web client's public assets
    pub cover_image: String,
    /// Creation timestamp (RFC 3339, UTC)
    pub created_at: String,
}
