//! Transcript port - Append-only log of successful generations

use async_trait::async_trait;

/// One record per successful generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub user_id: String,
    pub model_name: String,
    pub temperature: f32,
    pub task_description: String,
    pub raw_response: String,
}

/// Port for persisting transcript entries.
///
/// Write failures are logged by the caller and never propagated as a flow
/// error; the user-visible result does not depend on the transcript.
#[async_trait]
pub trait TranscriptPort: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn append(&self, entry: &TranscriptEntry) -> Result<(), Self::Error>;
}
