// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use prepwise::config::Config;
use prepwise::db::{FirestoreDb, MemoryStore};
use prepwise::error::AppError;
use prepwise::models::{InterviewRecord, UserProfile};
use prepwise::routes::create_router;
use prepwise::services::{JwtSessionService, MemoryDirectory, TextGenerator};
use prepwise::AppState;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new(&Config::test_default())
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Text generator that replays canned responses.
///
/// Responses are consumed in order; the last one is repeated once the
/// queue runs dry.
#[derive(Default)]
pub struct StubGenerator {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubGenerator {
    pub fn respond_with(&self, responses: &[&str]) {
        let mut queue = self.responses.lock().unwrap();
        queue.clear();
        queue.extend(responses.iter().map(|r| r.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate_text(&self, _prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.responses.lock().unwrap();
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        next.ok_or_else(|| AppError::Upstream("no stub response queued".to_string()))
    }
}

/// Test application wired to in-memory collaborators.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub directory: MemoryDirectory,
    pub store: MemoryStore,
    pub generator: Arc<StubGenerator>,
}

#[allow(dead_code)]
impl TestApp {
    /// Register an identity with a stored profile and return the `Cookie`
    /// header value for a fresh session.
    pub async fn signed_in(&self, name: &str, email: &str) -> (UserProfile, String) {
        let identity = self.directory.create_user(email, "hunter22").unwrap();
        self.state
            .auth
            .sign_up(&identity.id, name, email)
            .await
            .unwrap();

        let id_token = self
            .directory
            .sign_in_with_password(email, "hunter22")
            .unwrap();
        let cookie = self.state.auth.mint_session(&id_token).await.unwrap();

        let profile = UserProfile {
            id: identity.id,
            name: name.to_string(),
            email: email.to_string(),
        };
        (profile, format!("session={}", cookie.value()))
    }

    pub fn app(&self) -> axum::Router {
        self.router.clone()
    }
}

/// Create a test app with in-memory dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let directory = MemoryDirectory::new();
    let store = MemoryStore::new();
    let generator = Arc::new(StubGenerator::default());

    let sessions = JwtSessionService::new(
        config.session_signing_key.clone(),
        Arc::new(directory.clone()),
        Arc::new(directory.clone()),
    );

    let state = Arc::new(AppState::new(
        config,
        Arc::new(store.clone()),
        Arc::new(directory.clone()),
        Arc::new(sessions),
        generator.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        directory,
        store,
        generator,
    }
}

/// Interview owned by `user_id`.
#[allow(dead_code)]
pub fn interview(id: &str, user_id: &str, created_at: &str) -> InterviewRecord {
    InterviewRecord {
        id: id.to_string(),
        role: "Frontend Developer".to_string(),
        level: "Junior".to_string(),
        interview_type: "Behavioural".to_string(),
        techstack: vec!["React".to_string(), "TypeScript".to_string()],
        questions: vec!["Tell me about a project you are proud of.".to_string()],
        user_id: user_id.to_string(),
        finalized: true,
        cover_image: "/covers/spotify.png".to_string(),
        created_at: created_at.to_string(),
    }
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
