//! Model port - Interface for the remote generative-model service

use async_trait::async_trait;

/// Port for the remote text-generation model.
///
/// Implementations are constructed once at startup with validated
/// credentials, so "client not initialized" is unrepresentable at runtime.
#[async_trait]
pub trait ModelPort: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Invoke the model with the given prompt parts and sampling temperature.
    async fn invoke(
        &self,
        prompt_parts: &[String],
        temperature: f32,
    ) -> Result<RawModelResponse, Self::Error>;

    /// Name of the concrete model, for logging and the transcript record.
    fn model_name(&self) -> &str;
}

/// The model's reply before any interpretation by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct RawModelResponse {
    /// Set when the prompt was rejected before generation started.
    pub prompt_block_reason: Option<String>,
    /// Zero or more generated candidates; the first one is primary.
    pub candidates: Vec<ModelCandidate>,
}

#[derive(Debug, Clone)]
pub struct ModelCandidate {
    pub text: String,
    pub finish_reason: CandidateFinishReason,
    pub safety_ratings: Vec<SafetyRating>,
}

/// Why a candidate stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateFinishReason {
    Stop,
    Safety,
    Other,
}

/// One per-category moderation score attached to a candidate.
#[derive(Debug, Clone)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
}
