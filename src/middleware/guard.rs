// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page guards: redirect before any page handler runs.

use crate::models::Session;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const HOME_PATH: &str = "/";

/// Which side of the login boundary a page lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPolicy {
    /// Post-login pages
    Protected,
    /// Sign-in and sign-up pages
    AuthOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

impl GuardPolicy {
    pub fn decide(self, session: &Session) -> GuardDecision {
        match (self, session.is_authenticated()) {
            (GuardPolicy::Protected, false) => GuardDecision::Redirect(SIGN_IN_PATH),
            (GuardPolicy::AuthOnly, true) => GuardDecision::Redirect(HOME_PATH),
            _ => GuardDecision::Allow,
        }
    }
}

/// Anonymous callers are sent to the sign-in page.
pub async fn protected_area(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    guard(GuardPolicy::Protected, &state, &jar, request, next).await
}

/// Signed-in callers are sent home.
pub async fn auth_area(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    guard(GuardPolicy::AuthOnly, &state, &jar, request, next).await
}

async fn guard(
    policy: GuardPolicy,
    state: &AppState,
    jar: &CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = state.auth.current_session(jar).await;

    match policy.decide(&session) {
        GuardDecision::Redirect(to) => {
            tracing::debug!(path = %request.uri().path(), to, "Guard redirect");
            Redirect::to(to).into_response()
        }
        GuardDecision::Allow => {
            if let Some(user) = session.into_user() {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;

    fn signed_in() -> Session {
        Session::Authenticated(UserProfile {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        })
    }

    #[test]
    fn decisions() {
        assert_eq!(
            GuardPolicy::Protected.decide(&Session::Anonymous),
            GuardDecision::Redirect("/sign-in")
        );
        assert_eq!(GuardPolicy::Protected.decide(&signed_in()), GuardDecision::Allow);
        assert_eq!(
            GuardPolicy::AuthOnly.decide(&signed_in()),
            GuardDecision::Redirect("/")
        );
        assert_eq!(
            GuardPolicy::AuthOnly.decide(&Session::Anonymous),
            GuardDecision::Allow
        );
    }
}
