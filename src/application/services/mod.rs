//! Application services - Use-case logic built on the outbound ports

pub mod extractor;
pub mod orchestrator;
pub mod prompt_builder;
pub mod session_flow;

pub use extractor::{extract, ExtractionWarning};
pub use orchestrator::GenerationOrchestrator;
pub use prompt_builder::{build_prompt_parts, build_task_description, GENERATION_TEMPERATURE};
pub use session_flow::{ChatAction, OutboundMessage, ReplyMarkup, SessionFlowService};
