// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PrepWise API Server
//!
//! Accounts, sessions, AI-generated mock interviews and interview feedback.

use prepwise::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseIdTokenVerifier, GeminiClient, IdentityToolkitDirectory, JwtSessionService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        production = config.production,
        "Starting PrepWise API"
    );

    let store = FirestoreDb::new(&config)
        .await
        .expect("Failed to connect to Firestore");

    let directory = Arc::new(
        IdentityToolkitDirectory::new(&config).expect("Failed to initialize identity directory"),
    );
    let id_tokens = Arc::new(
        FirebaseIdTokenVerifier::new(&config.firebase_project_id)
            .expect("Failed to initialize ID token verifier"),
    );
    let sessions = JwtSessionService::new(
        config.session_signing_key.clone(),
        id_tokens,
        directory.clone(),
    );
    tracing::info!(project = %config.firebase_project_id, "Firebase auth initialized");

    let generator = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.upstream_timeout,
    )
    .expect("Failed to initialize Gemini client");
    tracing::info!(model = %config.gemini_model, "Text generator initialized");

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(store),
        directory,
        Arc::new(sessions),
        Arc::new(generator),
    ));

    let app = prepwise::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("prepwise=debug".parse().expect("valid directive"))
                .add_directive("info".parse().expect("valid directive")),
        )
        .with(format)
        .init();
}
