//! Session flow - the multi-step input-collection state machine
//!
//! One session per chat walks through seven questions in a fixed order,
//! stores each answer (or `None` for an auto/skip reply) and, after the
//! last answer, runs the generation pipeline: orchestrator, transcript,
//! extractor, renderer. Sessions are independent: the registry holds one
//! `Arc<Mutex<CreationSession>>` per chat so distinct chats never contend
//! on one lock while inputs within a chat stay strictly serialized.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::ports::outbound::{
    Artifact, ModelPort, RendererPort, TranscriptEntry, TranscriptPort,
};
use crate::application::services::extractor::extract;
use crate::application::services::orchestrator::GenerationOrchestrator;
use crate::application::services::prompt_builder::{
    build_prompt_parts, build_task_description, GENERATION_TEMPERATURE,
};
use crate::domain::value_objects::{
    BlockStage, GenerationOutcome, PreferenceSet, RetryPolicy, SessionId,
};

/// Answers meaning "let the generator decide", matched case-insensitively
/// as substrings. An empty reply counts as auto too.
const AUTO_KEYWORDS: [&str; 5] = ["авто", "случайная", "подходящее", "пропустить", "skip"];

const SRD_RACES: [&str; 10] = [
    "Человек",
    "Эльф (Высший)",
    "Дварф (Холмовой)",
    "Полурослик (Легконогий)",
    "Драконорожденный",
    "Гном (Лесной)",
    "Полуэльф",
    "Полуорк",
    "Тифлинг",
    "Авто (SRD раса)",
];

const SRD_CLASSES: [&str; 13] = [
    "Варвар",
    "Бард",
    "Жрец",
    "Друид",
    "Воин",
    "Монах",
    "Паладин",
    "Следопыт",
    "Плут",
    "Чародей",
    "Колдун (Исчадие)",
    "Волшебник",
    "Авто (SRD класс)",
];

const SRD_BACKGROUNDS: [&str; 14] = [
    "Прислужник",
    "Шарлатан",
    "Преступник",
    "Артист",
    "Народный Герой",
    "Ремесленник Гильдии",
    "Отшельник",
    "Благородный",
    "Чужеземец",
    "Мудрец",
    "Моряк",
    "Солдат",
    "Беспризорник",
    "Авто (SRD предыстория)",
];

const SRD_ALIGNMENTS: [&str; 10] = [
    "Законно-Добрый",
    "Нейтрально-Добрый",
    "Хаотично-Добрый",
    "Законно-Нейтральный",
    "Истинно Нейтральный",
    "Хаотично-Нейтральный",
    "Законно-Злой",
    "Нейтрально-Злой",
    "Хаотично-Злой",
    "Авто (подходящее)",
];

const GREETING: &str = "Привет! Я D&D Генератор Персонажей. \
                        Давай создадим персонажа. Используй /create для начала или /cancel для отмены.";
const NO_SESSION_HINT: &str = "Чтобы создать персонажа, используй /create.";
const BUSY_NOTICE: &str = "Генерация уже выполняется, подожди немного.";
const RESTART_HINT: &str = "Чтобы создать еще одного персонажа, используй /create.";
const CANCELLED_NOTICE: &str = "Создание персонажа отменено. Начать заново: /create.";
const TIMEOUT_NOTICE: &str =
    "Создание персонажа прервано из-за неактивности. Начать заново: /create.";
const RENDER_FALLBACK_NOTICE: &str =
    "Не удалось создать файл персонажа. Пожалуйста, используйте текстовую версию выше.";
const DOCUMENT_CAPTION: &str = "Вот файл с твоим персонажем!";

/// Reply-keyboard instruction accompanying an outbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    /// Advisory one-time keyboard; free text is always accepted.
    Keyboard {
        rows: Vec<Vec<String>>,
        placeholder: String,
    },
    /// Remove any previously shown keyboard.
    Remove,
}

/// Chat action shown while a slow operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadDocument,
}

/// One message for the transport layer to deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Text {
        text: String,
        markup: Option<ReplyMarkup>,
    },
    Document {
        artifact: Artifact,
        caption: String,
    },
    Action(ChatAction),
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            markup: None,
        }
    }

    pub fn text_with_markup(text: impl Into<String>, markup: ReplyMarkup) -> Self {
        Self::Text {
            text: text.into(),
            markup: Some(markup),
        }
    }
}

fn option_keyboard(options: &[&str], per_row: usize, placeholder: &str) -> ReplyMarkup {
    let rows = options
        .chunks(per_row)
        .map(|chunk| chunk.iter().map(|o| o.to_string()).collect())
        .collect();
    ReplyMarkup::Keyboard {
        rows,
        placeholder: placeholder.to_string(),
    }
}

fn is_auto_answer(input: &str) -> bool {
    if input.is_empty() {
        return true;
    }
    let lowered = input.to_lowercase();
    AUTO_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// States of one creation dialogue. The chain is linear: each collecting
/// state consumes exactly one answer and advances to its single successor;
/// `Generating` is terminal and only left by dropping the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    ChoosingRace,
    ChoosingClass,
    ChoosingBackground,
    ChoosingAlignment,
    EnteringLocation,
    EnteringStatsPreference,
    EnteringDetails,
    Generating,
}

impl CreationState {
    fn advance(self) -> CreationState {
        match self {
            CreationState::ChoosingRace => CreationState::ChoosingClass,
            CreationState::ChoosingClass => CreationState::ChoosingBackground,
            CreationState::ChoosingBackground => CreationState::ChoosingAlignment,
            CreationState::ChoosingAlignment => CreationState::EnteringLocation,
            CreationState::EnteringLocation => CreationState::EnteringStatsPreference,
            CreationState::EnteringStatsPreference => CreationState::EnteringDetails,
            CreationState::EnteringDetails => CreationState::Generating,
            CreationState::Generating => CreationState::Generating,
        }
    }

    /// The question asked when the dialogue enters this state.
    fn prompt(self) -> Option<OutboundMessage> {
        let message = match self {
            CreationState::ChoosingRace => OutboundMessage::text_with_markup(
                "Начинаем создание персонажа! 🧙\u{200d}♂\u{fe0f}\nВыбери расу или 'Авто'.",
                option_keyboard(&SRD_RACES, 2, "Раса или 'Авто'"),
            ),
            CreationState::ChoosingClass => OutboundMessage::text_with_markup(
                "Теперь выбери класс или 'Авто'.",
                option_keyboard(&SRD_CLASSES, 2, "Варвар или 'Авто'"),
            ),
            CreationState::ChoosingBackground => OutboundMessage::text_with_markup(
                "Выбери предысторию (background) или 'Авто'.",
                option_keyboard(&SRD_BACKGROUNDS, 2, "Прислужник или 'Авто'"),
            ),
            CreationState::ChoosingAlignment => OutboundMessage::text_with_markup(
                "Какое мировоззрение у твоего персонажа? Или 'Авто'.",
                option_keyboard(&SRD_ALIGNMENTS, 3, "Законно-Добрый или 'Авто'"),
            ),
            CreationState::EnteringLocation => OutboundMessage::text_with_markup(
                "Откуда родом твой персонаж или где он сейчас находится?\n\
                 (например, 'тихая деревня Фандалин')\n\
                 Если не важно, напиши 'авто' или 'пропустить'.",
                ReplyMarkup::Remove,
            ),
            CreationState::EnteringStatsPreference => OutboundMessage::text_with_markup(
                "Есть ли пожелания по характеристикам (статам)?\n\
                 (например, 'главное - высокий Интеллект и Ловкость')\n\
                 Если нет, напиши 'авто' или 'пропустить'.",
                ReplyMarkup::Remove,
            ),
            CreationState::EnteringDetails => OutboundMessage::text_with_markup(
                "И наконец, какие-то особые детали, ключевые моменты предыстории или черты характера?\n\
                 Если нет, напиши 'авто' или 'пропустить'.",
                ReplyMarkup::Remove,
            ),
            CreationState::Generating => return None,
        };
        Some(message)
    }
}

/// What one consumed answer produced.
enum StepOutcome {
    /// Acknowledge the answer and ask the next question.
    Ask {
        ack: String,
        prompt: OutboundMessage,
    },
    /// All seven fields are collected.
    ReadyToGenerate { ack: String },
    /// The terminal generation for this session is already running.
    Busy,
}

/// One in-progress creation dialogue.
struct CreationSession {
    state: CreationState,
    preferences: PreferenceSet,
    last_activity: Instant,
}

impl CreationSession {
    fn new() -> Self {
        Self {
            state: CreationState::ChoosingRace,
            preferences: PreferenceSet::default(),
            last_activity: Instant::now(),
        }
    }

    /// Consume one user reply: store the field for the current state (auto
    /// and empty answers store `None`) and advance the chain.
    fn apply_answer(&mut self, input: &str) -> StepOutcome {
        let trimmed = input.trim();
        let stored = if is_auto_answer(trimmed) {
            None
        } else {
            Some(trimmed.to_string())
        };

        let (display_name, auto_display, slot) = match self.state {
            CreationState::ChoosingRace => ("Раса", "Авто", &mut self.preferences.race),
            CreationState::ChoosingClass => ("Класс", "Авто", &mut self.preferences.class),
            CreationState::ChoosingBackground => (
                "Предыстория (Background)",
                "Авто",
                &mut self.preferences.background,
            ),
            CreationState::ChoosingAlignment => {
                ("Мировоззрение", "Авто", &mut self.preferences.alignment)
            }
            CreationState::EnteringLocation => (
                "Локация/Происхождение",
                "Авто",
                &mut self.preferences.location,
            ),
            CreationState::EnteringStatsPreference => (
                "Пожелания по характеристикам",
                "Авто",
                &mut self.preferences.stats_preference,
            ),
            CreationState::EnteringDetails => (
                "Дополнительные детали",
                "На усмотрение модели",
                &mut self.preferences.details,
            ),
            CreationState::Generating => return StepOutcome::Busy,
        };

        let shown = stored.as_deref().unwrap_or(auto_display);
        let ack = format!("{display_name}: {shown}.");
        *slot = stored;

        let next = self.state.advance();
        self.state = next;
        match next.prompt() {
            Some(prompt) => StepOutcome::Ask { ack, prompt },
            None => StepOutcome::ReadyToGenerate { ack },
        }
    }
}

/// Entry points offered to the chat transport, one registry entry per chat.
pub struct SessionFlowService<M: ModelPort, R: RendererPort, T: TranscriptPort> {
    orchestrator: GenerationOrchestrator<M>,
    renderer: R,
    transcript: T,
    retry_policy: RetryPolicy,
    idle_timeout: Duration,
    sessions: DashMap<SessionId, Arc<Mutex<CreationSession>>>,
}

impl<M: ModelPort, R: RendererPort, T: TranscriptPort> SessionFlowService<M, R, T> {
    pub fn new(
        orchestrator: GenerationOrchestrator<M>,
        renderer: R,
        transcript: T,
        retry_policy: RetryPolicy,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator,
            renderer,
            transcript,
            retry_policy,
            idle_timeout,
            sessions: DashMap::new(),
        }
    }

    /// Reply to a bare greeting command; does not open a session.
    pub fn greeting(&self) -> Vec<OutboundMessage> {
        vec![OutboundMessage::text(GREETING)]
    }

    /// Open (or restart) the creation dialogue for this chat.
    pub fn on_session_start(&self, id: SessionId) -> Vec<OutboundMessage> {
        self.sessions
            .insert(id, Arc::new(Mutex::new(CreationSession::new())));
        info!(session = %id, "creation session started");
        CreationState::ChoosingRace.prompt().into_iter().collect()
    }

    /// Consume one user reply for this chat's session.
    ///
    /// Runs the whole step to completion, including the terminal generation
    /// call, before the session lock is released; a second input for the
    /// same session waits rather than interleaving.
    pub async fn on_session_input(&self, id: SessionId, text: &str) -> Vec<OutboundMessage> {
        let Some(cell) = self.sessions.get(&id).map(|entry| Arc::clone(entry.value())) else {
            return vec![OutboundMessage::text(NO_SESSION_HINT)];
        };

        let mut session = cell.lock().await;
        session.last_activity = Instant::now();

        match session.apply_answer(text) {
            StepOutcome::Busy => vec![OutboundMessage::text(BUSY_NOTICE)],
            StepOutcome::Ask { ack, prompt } => {
                vec![OutboundMessage::text(ack), prompt]
            }
            StepOutcome::ReadyToGenerate { ack } => {
                let mut messages = vec![
                    OutboundMessage::text_with_markup(
                        format!(
                            "{ack}\n\nСпасибо! Начинаю генерацию персонажа. Это может занять до минуты..."
                        ),
                        ReplyMarkup::Remove,
                    ),
                    OutboundMessage::Action(ChatAction::Typing),
                ];
                let preferences = session.preferences.clone();
                messages.extend(self.run_generation(id, &preferences).await);
                messages.push(OutboundMessage::text(RESTART_HINT));
                drop(session);
                self.sessions.remove(&id);
                info!(session = %id, "creation session completed");
                messages
            }
        }
    }

    /// Cancel this chat's session, whatever state it is in.
    pub fn on_session_cancel(&self, id: SessionId) -> Vec<OutboundMessage> {
        if self.sessions.remove(&id).is_some() {
            info!(session = %id, "creation session cancelled");
        }
        vec![OutboundMessage::text_with_markup(
            CANCELLED_NOTICE,
            ReplyMarkup::Remove,
        )]
    }

    /// Drop sessions idle past the configured bound and produce their
    /// timeout notices. Sessions with an in-flight generation hold their
    /// lock and are skipped; they complete on their own.
    pub fn expire_idle_sessions(&self) -> Vec<(SessionId, Vec<OutboundMessage>)> {
        let mut expired = Vec::new();
        for entry in self.sessions.iter() {
            if let Ok(session) = entry.value().try_lock() {
                if session.last_activity.elapsed() >= self.idle_timeout {
                    expired.push(*entry.key());
                }
            }
        }

        expired
            .into_iter()
            .filter_map(|id| {
                self.sessions.remove(&id).map(|_| {
                    info!(session = %id, "creation session expired after inactivity");
                    (id, vec![OutboundMessage::text(TIMEOUT_NOTICE)])
                })
            })
            .collect()
    }

    async fn run_generation(
        &self,
        id: SessionId,
        preferences: &PreferenceSet,
    ) -> Vec<OutboundMessage> {
        let task_description = build_task_description(preferences);
        let prompt_parts = build_prompt_parts(preferences);
        let outcome = self
            .orchestrator
            .generate(&prompt_parts, GENERATION_TEMPERATURE, self.retry_policy)
            .await;

        let error_text = match outcome {
            GenerationOutcome::Success(raw) => {
                return self.deliver_success(id, task_description, raw).await;
            }
            GenerationOutcome::Blocked {
                reason,
                stage: BlockStage::Prompt,
            } => format!("ЗАПРОС ЗАБЛОКИРОВАН: {reason}"),
            GenerationOutcome::Blocked {
                reason,
                stage: BlockStage::Content,
            } => format!("КОНТЕНТ ЗАБЛОКИРОВАН (SAFETY): {reason}"),
            GenerationOutcome::Empty => "Модель не вернула кандидатов.".to_string(),
            GenerationOutcome::QuotaExceeded => "Ошибка квоты API.".to_string(),
            GenerationOutcome::AuthError => "Неверный API ключ или права.".to_string(),
            GenerationOutcome::TransientFailure(message) => {
                format!("ОШИБКА API: Макс. попыток. Ошибка: {message}")
            }
        };

        vec![OutboundMessage::text(format!(
            "Произошла ошибка при генерации: {error_text}\nПопробуйте еще раз: /create"
        ))]
    }

    async fn deliver_success(
        &self,
        id: SessionId,
        task_description: String,
        raw: String,
    ) -> Vec<OutboundMessage> {
        let entry = TranscriptEntry {
            user_id: id.to_string(),
            model_name: self.orchestrator.model_name().to_string(),
            temperature: GENERATION_TEMPERATURE,
            task_description,
            raw_response: raw.clone(),
        };
        if let Err(e) = self.transcript.append(&entry).await {
            warn!(session = %id, error = %e, "failed to append transcript entry");
        }

        let (record, warnings) = extract(&raw);
        for warning in &warnings {
            warn!(session = %id, %warning, "extraction warning");
        }

        let mut messages = vec![OutboundMessage::text(raw)];
        match self.renderer.render(&record).await {
            Ok(artifact) => {
                messages.push(OutboundMessage::Action(ChatAction::UploadDocument));
                messages.push(OutboundMessage::Document {
                    artifact,
                    caption: DOCUMENT_CAPTION.to_string(),
                });
            }
            Err(e) => {
                warn!(session = %id, error = %e, "sheet rendering failed, sending text only");
                messages.push(OutboundMessage::text(RENDER_FALLBACK_NOTICE));
            }
        }
        messages
    }
}
