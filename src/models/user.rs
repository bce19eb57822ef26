// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User profile stored in Firestore.
///
/// The document ID is the identity ID from the credential directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    /// Identity ID (also used as document ID)
    #[serde(default)]
    pub id: String,
    /// Display name given at sign-up
    pub name: String,
    /// Email address
    pub email: String,
}

/// Result of resolving the caller's session.
///
/// A failed verification and a missing cookie are deliberately the same
/// variant: callers must not be able to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authenticated(UserProfile),
    Anonymous,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            Session::Authenticated(user) => Some(user),
            Session::Anonymous => None,
        }
    }

    pub fn into_user(self) -> Option<UserProfile> {
        match self {
            Session::Authenticated(user) => Some(user),
            Session::Anonymous => None,
        }
    }
}
