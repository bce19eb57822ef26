// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (session auth, page guards, security headers).

pub mod auth;
pub mod guard;
pub mod security;

pub use auth::require_session;
pub use guard::{auth_area, protected_area};
