//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Gemini: the Generative Language API client behind the model port
//! - Telegram: Bot API client and the long-poll update dispatcher
//! - Sheet renderer: Markdown character-sheet documents
//! - Transcript: per-generation plain-text log files
//! - Config: application configuration

pub mod config;
pub mod gemini;
pub mod sheet_renderer;
pub mod telegram;
pub mod transcript;
