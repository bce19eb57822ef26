// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PrepWise: AI mock-interview backend
//!
//! This crate provides the API for account sign-up and sign-in, session
//! cookies, route guarding, interview question generation and interview
//! feedback.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{
    AuthGateway, CredentialDirectory, FeedbackService, InterviewGenerator, SessionTokenService,
    TextGenerator,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub auth: AuthGateway,
    pub interviews: InterviewGenerator,
    pub feedback: FeedbackService,
}

impl AppState {
    /// Wire the services from their collaborators.
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        directory: Arc<dyn CredentialDirectory>,
        sessions: Arc<dyn SessionTokenService>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let auth = AuthGateway::new(
            directory,
            sessions,
            store.clone(),
            config.production,
            config.upstream_timeout,
        );
        let interviews = InterviewGenerator::new(
            generator.clone(),
            store.clone(),
            config.generation_max_attempts,
            config.upstream_timeout,
        );
        let feedback = FeedbackService::new(generator, store.clone(), config.upstream_timeout);

        Self {
            config,
            store,
            auth,
            interviews,
            feedback,
        }
    }
}
