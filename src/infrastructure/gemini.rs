//! Gemini client for character generation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ports::outbound::{
    CandidateFinishReason, ModelCandidate, ModelPort, RawModelResponse, SafetyRating,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status. The status code stays in the message so the
    /// retry classifier can recognize rate-limit replies.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Google API key is empty")]
    MissingApiKey,
}

/// Client for the Generative Language API
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Result<Self, GeminiError> {
        if api_key.trim().is_empty() {
            return Err(GeminiError::MissingApiKey);
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ModelPort for GeminiClient {
    type Error = GeminiError;

    async fn invoke(
        &self,
        prompt_parts: &[String],
        temperature: f32,
    ) -> Result<RawModelResponse, Self::Error> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: prompt_parts
                    .iter()
                    .map(|text| Part { text: text.clone() })
                    .collect(),
            }],
            generation_config: GenerationConfig { temperature },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: SAFETY_THRESHOLD.to_string(),
                })
                .collect(),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!(model = %self.model, "calling generateContent");

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateContentResponse = response.json().await?;
        Ok(reply.into())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    candidates: Vec<CandidateDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateDto {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRatingDto>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct SafetyRatingDto {
    category: String,
    probability: String,
}

impl From<GenerateContentResponse> for RawModelResponse {
    fn from(reply: GenerateContentResponse) -> Self {
        RawModelResponse {
            prompt_block_reason: reply.prompt_feedback.and_then(|f| f.block_reason),
            candidates: reply
                .candidates
                .into_iter()
                .map(|candidate| ModelCandidate {
                    text: candidate
                        .content
                        .map(|content| {
                            content
                                .parts
                                .into_iter()
                                .map(|part| part.text)
                                .collect::<Vec<_>>()
                                .join("")
                        })
                        .unwrap_or_default(),
                    finish_reason: match candidate.finish_reason.as_deref() {
                        Some("STOP") => CandidateFinishReason::Stop,
                        Some("SAFETY") => CandidateFinishReason::Safety,
                        _ => CandidateFinishReason::Other,
                    },
                    safety_ratings: candidate
                        .safety_ratings
                        .into_iter()
                        .map(|rating| SafetyRating {
                            category: rating.category,
                            probability: rating.probability,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_reply_maps_to_stop_candidate() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Имя: "}, {"text": "Тор"}]},
                "finishReason": "STOP"
            }]
        }"#;
        let reply: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let raw: RawModelResponse = reply.into();

        assert_eq!(raw.prompt_block_reason, None);
        assert_eq!(raw.candidates.len(), 1);
        assert_eq!(raw.candidates[0].text, "Имя: Тор");
        assert_eq!(raw.candidates[0].finish_reason, CandidateFinishReason::Stop);
    }

    #[test]
    fn blocked_prompt_carries_the_block_reason() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}, "candidates": []}"#;
        let reply: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let raw: RawModelResponse = reply.into();

        assert_eq!(raw.prompt_block_reason.as_deref(), Some("SAFETY"));
        assert!(raw.candidates.is_empty());
    }

    #[test]
    fn safety_stop_keeps_partial_text_and_ratings() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "частичный текст"}]},
                "finishReason": "SAFETY",
                "safetyRatings": [{"category": "HARM_CATEGORY_HARASSMENT", "probability": "HIGH"}]
            }]
        }"#;
        let reply: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let raw: RawModelResponse = reply.into();

        let candidate = &raw.candidates[0];
        assert_eq!(candidate.finish_reason, CandidateFinishReason::Safety);
        assert_eq!(candidate.text, "частичный текст");
        assert_eq!(candidate.safety_ratings[0].category, "HARM_CATEGORY_HARASSMENT");
        assert_eq!(candidate.safety_ratings[0].probability, "HIGH");
    }

    #[test]
    fn unknown_finish_reason_maps_to_other() {
        let json = r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#;
        let reply: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let raw: RawModelResponse = reply.into();

        assert_eq!(raw.candidates[0].finish_reason, CandidateFinishReason::Other);
        assert_eq!(raw.candidates[0].text, "");
    }

    #[test]
    fn api_error_message_exposes_the_status_code() {
        let error = GeminiError::Api {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert!(error.to_string().contains("429"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            GeminiClient::new("https://example.com", "gemini-1.5-flash-latest", "  "),
            Err(GeminiError::MissingApiKey)
        ));
    }
}
