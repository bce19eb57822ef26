// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (Firebase service account, session signing key, Gemini API key)
//! are injected by the deployment as environment variables and read once at
//! startup.

use std::env;
use std::time::Duration;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-001";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GENERATION_MAX_ATTEMPTS: u32 = 2;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// `APP_ENV=production` enables Secure cookies
    pub production: bool,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Firebase / GCP project ID
    pub firebase_project_id: String,
    /// Gemini model used for text generation
    pub gemini_model: String,
    /// Upper bound for every call to an external collaborator
    pub upstream_timeout: Duration,
    /// Attempts allowed when the model returns unparseable output
    pub generation_max_attempts: u32,

    // --- Secrets ---
    /// Service account email used to call Identity Toolkit
    pub firebase_client_email: String,
    /// Service account private key (PEM, real newlines)
    pub firebase_private_key: String,
    /// HS256 key for session tokens (raw bytes)
    pub session_signing_key: Vec<u8>,
    /// Google Generative Language API key
    pub gemini_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development, a `.env` file is honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let upstream_timeout_secs = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::Invalid("UPSTREAM_TIMEOUT_SECS", e.to_string()))?,
            Err(_) => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        let generation_max_attempts = match env::var("GENERATION_MAX_ATTEMPTS") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts > 0)
                .ok_or_else(|| {
                    ConfigError::Invalid("GENERATION_MAX_ATTEMPTS", raw.clone())
                })?,
            Err(_) => DEFAULT_GENERATION_MAX_ATTEMPTS,
        };

        let session_signing_key = env::var("SESSION_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
            .into_bytes();
        if session_signing_key.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SIGNING_KEY",
                "must be at least 32 bytes".to_string(),
            ));
        }

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            production: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            generation_max_attempts,

            firebase_client_email: env::var("FIREBASE_CLIENT_EMAIL")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_CLIENT_EMAIL"))?,
            firebase_private_key: env::var("FIREBASE_PRIVATE_KEY")
                .map(|v| normalize_private_key(&v))
                .map_err(|_| ConfigError::Missing("FIREBASE_PRIVATE_KEY"))?,
            session_signing_key,
            gemini_api_key: env::var("GOOGLE_GENERATIVE_AI_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_GENERATIVE_AI_API_KEY"))?,
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            production: false,
            frontend_url: "http://localhost:3000".to_string(),
            firebase_project_id: "test-project".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            upstream_timeout: Duration::from_secs(5),
            generation_max_attempts: DEFAULT_GENERATION_MAX_ATTEMPTS,
            firebase_client_email: "firebase-adminsdk@test-project.iam.gserviceaccount.com"
                .to_string(),
            firebase_private_key: String::new(),
            session_signing_key: b"test_session_key_32_bytes_long!!".to_vec(),
            gemini_api_key: "test_gemini_key".to_string(),
        }
    }
}

/// Private keys stored in `.env` files are usually on one line with literal
/// `\n` sequences; PEM parsing needs real line breaks.
pub fn normalize_private_key(raw: &str) -> String {
    raw.trim().trim_matches('"').replace("\\n", "\n")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
