//! Generation orchestrator - wraps a model call with retry and classification
//!
//! The remote model fails in three distinct ways and the split must be kept
//! exact, because each branch maps to a different user-facing message:
//! moderation blocks and missing candidates are terminal on first sight,
//! quota and credential errors are terminal but reported as their own
//! variants, and only transport-level errors are worth retrying.

use tracing::{error, info, warn};

use crate::application::ports::outbound::{CandidateFinishReason, ModelPort};
use crate::domain::value_objects::{BlockStage, GenerationOutcome, RetryPolicy};

/// Message carried by `TransientFailure` when the model keeps returning
/// empty text without an explicit safety stop.
const EMPTY_TEXT_FAILURE: &str = "модель вернула пустой текст без явной причины";

/// Classification of a failed model call, derived from its rendered error
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Quota,
    Auth,
    Transient,
}

fn classify_error(message: &str) -> FailureKind {
    let lowered = message.to_lowercase();
    if message.contains("429") || lowered.contains("quota") || lowered.contains("resource_exhausted")
    {
        return FailureKind::Quota;
    }
    if message.contains("API key not valid") || lowered.contains("permission_denied") {
        return FailureKind::Auth;
    }
    FailureKind::Transient
}

/// Orchestrates one generation request against the model port.
pub struct GenerationOrchestrator<M: ModelPort> {
    model: M,
}

impl<M: ModelPort> GenerationOrchestrator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Run the attempt loop and fold the model's reply into an outcome.
    ///
    /// Only transport errors consume the attempt budget. An empty candidate
    /// without a safety stop is a model anomaly retried on its own counter
    /// with the same bound, so `generate` stays total.
    pub async fn generate(
        &self,
        prompt_parts: &[String],
        temperature: f32,
        policy: RetryPolicy,
    ) -> GenerationOutcome {
        info!(model = self.model.model_name(), temperature, "sending generation request");

        let mut error_attempts = 0u32;
        let mut empty_attempts = 0u32;

        loop {
            match self.model.invoke(prompt_parts, temperature).await {
                Ok(response) => {
                    if let Some(reason) = response.prompt_block_reason {
                        warn!(%reason, "prompt rejected before generation");
                        return GenerationOutcome::Blocked {
                            reason,
                            stage: BlockStage::Prompt,
                        };
                    }

                    let Some(candidate) = response.candidates.first() else {
                        warn!("model returned no candidates");
                        return GenerationOutcome::Empty;
                    };

                    if candidate.finish_reason == CandidateFinishReason::Safety {
                        let detail = if candidate.text.is_empty() {
                            summarize_ratings(&candidate.safety_ratings)
                        } else {
                            candidate.text.clone()
                        };
                        warn!("content stopped by safety filter");
                        return GenerationOutcome::Blocked {
                            reason: detail,
                            stage: BlockStage::Content,
                        };
                    }

                    if !candidate.text.is_empty() {
                        info!(model = self.model.model_name(), "generation succeeded");
                        return GenerationOutcome::Success(candidate.text.clone());
                    }

                    empty_attempts += 1;
                    warn!(
                        attempt = empty_attempts,
                        max = policy.max_attempts(),
                        "empty candidate text without a safety stop"
                    );
                    if empty_attempts >= policy.max_attempts() {
                        return GenerationOutcome::TransientFailure(EMPTY_TEXT_FAILURE.to_string());
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    match classify_error(&message) {
                        FailureKind::Quota => {
                            error!(%message, "quota or rate limit exhausted");
                            return GenerationOutcome::QuotaExceeded;
                        }
                        FailureKind::Auth => {
                            error!(%message, "credentials rejected by the model API");
                            return GenerationOutcome::AuthError;
                        }
                        FailureKind::Transient => {
                            error_attempts += 1;
                            error!(
                                attempt = error_attempts,
                                max = policy.max_attempts(),
                                %message,
                                "model call failed"
                            );
                            if error_attempts >= policy.max_attempts() {
                                return GenerationOutcome::TransientFailure(message);
                            }
                        }
                    }
                }
            }

            tokio::time::sleep(policy.delay_between_attempts()).await;
        }
    }
}

fn summarize_ratings(
    ratings: &[crate::application::ports::outbound::SafetyRating],
) -> String {
    if ratings.is_empty() {
        return "Нет деталей".to_string();
    }
    ratings
        .iter()
        .map(|r| format!("{}: {}", r.category, r.probability))
        .collect::<Vec<_>>()
        .join("; ")
}
