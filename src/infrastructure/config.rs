//! Application configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::domain::value_objects::RetryPolicy;

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telegram Bot API token
    pub telegram_bot_token: String,

    /// Google Generative Language API key
    pub google_api_key: String,
    /// Generative Language API base URL
    pub gemini_base_url: String,
    /// Model used for character generation
    pub gemini_model: String,

    /// Directory for raw generation transcripts
    pub transcript_dir: PathBuf,

    /// Sessions idle longer than this are dropped
    pub session_idle_timeout: Duration,
    /// Attempt budget and delay for generation calls
    pub retry_policy: RetryPolicy,
    /// Long-poll timeout for getUpdates, in seconds
    pub poll_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .context("TELEGRAM_BOT_TOKEN environment variable is required")?,

            google_api_key: env::var("GOOGLE_API_KEY")
                .context("GOOGLE_API_KEY environment variable is required")?,
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash-latest".to_string()),

            transcript_dir: env::var("TRANSCRIPT_DIR")
                .unwrap_or_else(|_| "telegram_bot_generated_characters/texts".to_string())
                .into(),

            session_idle_timeout: Duration::from_secs(
                60 * env::var("SESSION_IDLE_TIMEOUT_MINUTES")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse::<u64>()
                    .context("SESSION_IDLE_TIMEOUT_MINUTES must be a number of minutes")?,
            ),
            retry_policy: RetryPolicy::new(
                env::var("GENERATION_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .context("GENERATION_MAX_ATTEMPTS must be a number")?,
                Duration::from_secs(
                    env::var("GENERATION_RETRY_DELAY_SECS")
                        .unwrap_or_else(|_| "5".to_string())
                        .parse()
                        .context("GENERATION_RETRY_DELAY_SECS must be a number of seconds")?,
                ),
            ),
            poll_timeout_secs: env::var("POLL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("POLL_TIMEOUT_SECS must be a number of seconds")?,
        })
    }
}
