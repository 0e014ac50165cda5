//! Renderer port - Interface for the character-sheet document renderer

use async_trait::async_trait;

use crate::domain::value_objects::CharacterRecord;

/// Port for rendering a character record into a document artifact.
///
/// The core always passes a fully-populated record (unresolved fields carry
/// their sentinel text). A render failure is recoverable: the session flow
/// degrades to text-only output.
#[async_trait]
pub trait RendererPort: Send + Sync {
    async fn render(&self, record: &CharacterRecord) -> Result<Artifact, RenderError>;
}

/// An in-memory rendered document ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("rendering failed: {0}")]
    Failed(String),
}
