//! Telegram Bot API transport
//!
//! A thin client over the HTTP API plus the long-poll dispatcher that fans
//! updates out to one worker task per chat. Workers keep inputs for one chat
//! in arrival order while distinct chats proceed in parallel.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::application::ports::outbound::{Artifact, ModelPort, RendererPort, TranscriptPort};
use crate::application::services::session_flow::{
    ChatAction, OutboundMessage, ReplyMarkup, SessionFlowService,
};
use crate::domain::value_objects::SessionId;

/// Hard Telegram limit on message length, in characters.
const MESSAGE_CHAR_LIMIT: usize = 4096;
/// Chunk size used when a text exceeds the limit, leaving headroom.
const CHUNK_CHAR_LIMIT: usize = 4090;

const LONG_TEXT_PREAMBLE: &str =
    "Сгенерированный текстовый профиль слишком длинный. Вот его части:";

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TelegramError> {
        if self.ok {
            if let Some(result) = self.result {
                return Ok(result);
            }
        }
        Err(TelegramError::Api(
            self.description
                .unwrap_or_else(|| "malformed API response".to_string()),
        ))
    }
}

/// The bot's own identity, as reported by getMe.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Client for the Telegram Bot API
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self, TelegramError> {
        // The long poll holds the connection open for the whole timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{token}"),
        })
    }

    pub async fn get_me(&self) -> Result<BotIdentity, TelegramError> {
        let response = self
            .client
            .get(format!("{}/getMe", self.base_url))
            .send()
            .await?;
        let reply: ApiResponse<BotIdentity> = response.json().await?;
        reply.into_result()
    }

    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut query = vec![("timeout", timeout_secs.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let response = self
            .client
            .get(format!("{}/getUpdates", self.base_url))
            .query(&query)
            .send()
            .await?;
        let reply: ApiResponse<Vec<Update>> = response.json().await?;
        reply.into_result()
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<(), TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = markup {
            body["reply_markup"] = markup_json(markup);
        }
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&body)
            .send()
            .await?;
        let reply: ApiResponse<serde_json::Value> = response.json().await?;
        reply.into_result().map(|_| ())
    }

    pub async fn send_document(
        &self,
        chat_id: i64,
        artifact: &Artifact,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let part = multipart::Part::bytes(artifact.bytes.clone())
            .file_name(artifact.file_name.clone())
            .mime_str(&artifact.mime_type)?;
        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);
        let response = self
            .client
            .post(format!("{}/sendDocument", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let reply: ApiResponse<serde_json::Value> = response.json().await?;
        reply.into_result().map(|_| ())
    }

    pub async fn send_chat_action(
        &self,
        chat_id: i64,
        action: ChatAction,
    ) -> Result<(), TelegramError> {
        let action = match action {
            ChatAction::Typing => "typing",
            ChatAction::UploadDocument => "upload_document",
        };
        let response = self
            .client
            .post(format!("{}/sendChatAction", self.base_url))
            .json(&json!({"chat_id": chat_id, "action": action}))
            .send()
            .await?;
        let reply: ApiResponse<serde_json::Value> = response.json().await?;
        reply.into_result().map(|_| ())
    }
}

fn markup_json(markup: &ReplyMarkup) -> serde_json::Value {
    match markup {
        ReplyMarkup::Keyboard { rows, placeholder } => json!({
            "keyboard": rows,
            "resize_keyboard": true,
            "one_time_keyboard": true,
            "input_field_placeholder": placeholder,
        }),
        ReplyMarkup::Remove => json!({"remove_keyboard": true}),
    }
}

/// Split a text into chunks of at most `limit` characters, never inside a
/// code point.
fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Deliver a batch of flow replies to one chat. Send failures are logged
/// and the rest of the batch still goes out.
pub async fn deliver_messages(client: &TelegramClient, chat_id: i64, messages: Vec<OutboundMessage>) {
    for message in messages {
        let sent = match message {
            OutboundMessage::Text { text, markup } => {
                if text.chars().count() > MESSAGE_CHAR_LIMIT {
                    let mut result =
                        client.send_message(chat_id, LONG_TEXT_PREAMBLE, None).await;
                    let chunks = chunk_text(&text, CHUNK_CHAR_LIMIT);
                    let last = chunks.len().saturating_sub(1);
                    for (i, chunk) in chunks.iter().enumerate() {
                        let chunk_markup = if i == last { markup.as_ref() } else { None };
                        if let Err(e) = client.send_message(chat_id, chunk, chunk_markup).await {
                            result = Err(e);
                        }
                    }
                    result
                } else {
                    client.send_message(chat_id, &text, markup.as_ref()).await
                }
            }
            OutboundMessage::Document { artifact, caption } => {
                client.send_document(chat_id, &artifact, &caption).await
            }
            OutboundMessage::Action(action) => client.send_chat_action(chat_id, action).await,
        };
        if let Err(e) = sent {
            warn!(chat_id, error = %e, "failed to deliver message");
        }
    }
}

/// What one parsed update asks the session flow to do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatEvent {
    Greet,
    StartCreation,
    Cancel,
    Input(String),
}

/// Map a message text to a flow event. Commands accept a `@botname`
/// suffix; `/start create` opens a session directly.
fn parse_event(text: &str) -> ChatEvent {
    let trimmed = text.trim();
    let Some(stripped) = trimmed.strip_prefix('/') else {
        return ChatEvent::Input(trimmed.to_string());
    };

    let mut words = stripped.split_whitespace();
    let command = words.next().unwrap_or("");
    let command = command.split('@').next().unwrap_or(command);
    let argument = words.next().unwrap_or("");

    match (command, argument) {
        ("start", "create") | ("create", _) => ChatEvent::StartCreation,
        ("start", _) => ChatEvent::Greet,
        ("cancel", _) => ChatEvent::Cancel,
        // Unknown commands fall through to the flow as plain input.
        _ => ChatEvent::Input(trimmed.to_string()),
    }
}

/// Long-poll loop fanning updates out to per-chat workers.
pub struct UpdateDispatcher<M, R, T>
where
    M: ModelPort + 'static,
    R: RendererPort + 'static,
    T: TranscriptPort + 'static,
{
    client: Arc<TelegramClient>,
    flow: Arc<SessionFlowService<M, R, T>>,
    workers: DashMap<i64, mpsc::UnboundedSender<ChatEvent>>,
    poll_timeout_secs: u64,
}

impl<M, R, T> UpdateDispatcher<M, R, T>
where
    M: ModelPort + 'static,
    R: RendererPort + 'static,
    T: TranscriptPort + 'static,
{
    pub fn new(
        client: Arc<TelegramClient>,
        flow: Arc<SessionFlowService<M, R, T>>,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            flow,
            workers: DashMap::new(),
            poll_timeout_secs,
        }
    }

    /// Poll for updates until the task is cancelled.
    pub async fn run(&self) {
        let mut offset: Option<i64> = None;
        loop {
            match self.client.get_updates(offset, self.poll_timeout_secs).await {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.dispatch(update);
                    }
                }
                Err(e) => {
                    error!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    fn dispatch(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };
        let chat_id = message.chat.id;
        let event = parse_event(&text);
        debug!(chat_id, ?event, "dispatching update");

        let sender = self
            .workers
            .entry(chat_id)
            .or_insert_with(|| self.spawn_worker(chat_id))
            .clone();
        if sender.send(event).is_err() {
            // Only happens if the worker task died; a fresh one is spawned
            // for the next update.
            self.workers.remove(&chat_id);
            warn!(chat_id, "chat worker channel closed, dropping update");
        }
    }

    fn spawn_worker(&self, chat_id: i64) -> mpsc::UnboundedSender<ChatEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = Arc::clone(&self.client);
        let flow = Arc::clone(&self.flow);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let id = SessionId::new(chat_id);
                let messages = match event {
                    ChatEvent::Greet => flow.greeting(),
                    ChatEvent::StartCreation => flow.on_session_start(id),
                    ChatEvent::Cancel => flow.on_session_cancel(id),
                    ChatEvent::Input(text) => flow.on_session_input(id, &text).await,
                };
                deliver_messages(&client, chat_id, messages).await;
            }
            info!(chat_id, "chat worker stopped");
        });
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_and_without_bot_suffix() {
        assert_eq!(parse_event("/create"), ChatEvent::StartCreation);
        assert_eq!(parse_event("/create@dnd_bot"), ChatEvent::StartCreation);
        assert_eq!(parse_event("/start"), ChatEvent::Greet);
        assert_eq!(parse_event("/start create"), ChatEvent::StartCreation);
        assert_eq!(parse_event("/cancel@dnd_bot"), ChatEvent::Cancel);
    }

    #[test]
    fn plain_and_unknown_input_routes_to_the_flow() {
        assert_eq!(
            parse_event("  Эльф (Высший) "),
            ChatEvent::Input("Эльф (Высший)".to_string())
        );
        assert_eq!(
            parse_event("/help"),
            ChatEvent::Input("/help".to_string())
        );
    }

    #[test]
    fn chunking_is_char_safe_and_covers_the_whole_text() {
        let text = "я".repeat(25);
        let chunks = chunk_text(&text, 10);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks[2].chars().count(), 5);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn keyboard_markup_serializes_with_placeholder_and_one_time_flags() {
        let markup = ReplyMarkup::Keyboard {
            rows: vec![vec!["Человек".to_string(), "Эльф (Высший)".to_string()]],
            placeholder: "Раса или 'Авто'".to_string(),
        };
        let value = markup_json(&markup);

        assert_eq!(value["keyboard"][0][0], "Человек");
        assert_eq!(value["one_time_keyboard"], true);
        assert_eq!(value["resize_keyboard"], true);
        assert_eq!(value["input_field_placeholder"], "Раса или 'Авто'");
    }

    #[test]
    fn remove_markup_serializes_to_remove_keyboard() {
        assert_eq!(
            markup_json(&ReplyMarkup::Remove),
            serde_json::json!({"remove_keyboard": true})
        );
    }

    #[test]
    fn api_response_errors_carry_the_description() {
        let json = r#"{"ok": false, "description": "Unauthorized"}"#;
        let reply: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();

        let error = reply.into_result().unwrap_err();
        assert!(matches!(error, TelegramError::Api(d) if d == "Unauthorized"));
    }

    #[test]
    fn updates_deserialize_with_optional_message_text() {
        let json = r#"{"ok": true, "result": [
            {"update_id": 10, "message": {"chat": {"id": 77}, "text": "/create"}},
            {"update_id": 11, "message": {"chat": {"id": 78}}}
        ]}"#;
        let reply: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        let updates = reply.into_result().unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().unwrap().chat.id, 77);
        assert_eq!(
            updates[0].message.as_ref().unwrap().text.as_deref(),
            Some("/create")
        );
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
    }
}
