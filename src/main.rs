//! Kharakternik - Telegram bot generating D&D 5e (SRD) characters
//!
//! The bot walks each chat through a short preference dialogue, asks a
//! remote model for a complete character, recovers the structured fields
//! from the reply and returns both the raw profile and a rendered sheet.

mod application;
mod domain;
mod infrastructure;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::services::orchestrator::GenerationOrchestrator;
use crate::application::services::session_flow::SessionFlowService;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::gemini::GeminiClient;
use crate::infrastructure::sheet_renderer::SheetRenderer;
use crate::infrastructure::telegram::{deliver_messages, TelegramClient, UpdateDispatcher};
use crate::infrastructure::transcript::FileTranscriptStore;

const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kharakternik=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Kharakternik bot");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Model: {}", config.gemini_model);
    tracing::info!("  Transcripts: {}", config.transcript_dir.display());

    // Wire the adapters into the session flow
    let model = GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_model,
        &config.google_api_key,
    )
    .context("failed to build Gemini client")?;

    let transcript = FileTranscriptStore::new(&config.transcript_dir);
    transcript
        .init()
        .await
        .context("failed to create transcript directory")?;

    let flow = Arc::new(SessionFlowService::new(
        GenerationOrchestrator::new(model),
        SheetRenderer::new(),
        transcript,
        config.retry_policy,
        config.session_idle_timeout,
    ));

    let client = Arc::new(
        TelegramClient::new(&config.telegram_bot_token)
            .context("failed to build Telegram client")?,
    );

    // Verify the token before entering the poll loop
    let identity = client
        .get_me()
        .await
        .context("getMe failed; check TELEGRAM_BOT_TOKEN")?;
    tracing::info!(
        "Authorized as {} (@{})",
        identity.first_name,
        identity.username.as_deref().unwrap_or("-")
    );

    // Idle sweeper: drop stale sessions and notify their chats
    let idle_sweeper = {
        let flow = Arc::clone(&flow);
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            tracing::info!("Starting idle-session sweeper");
            loop {
                tokio::time::sleep(IDLE_SWEEP_INTERVAL).await;
                for (session, messages) in flow.expire_idle_sessions() {
                    deliver_messages(&client, session.as_i64(), messages).await;
                }
            }
        })
    };

    let dispatcher = UpdateDispatcher::new(Arc::clone(&client), flow, config.poll_timeout_secs);

    tracing::info!("Polling for updates");
    tokio::select! {
        _ = dispatcher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            idle_sweeper.abort();
        }
    }

    Ok(())
}
