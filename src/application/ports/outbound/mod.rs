//! Outbound ports - Interfaces that the application requires from external systems

mod model_port;
mod renderer_port;
mod transcript_port;

pub use model_port::{
    CandidateFinishReason, ModelCandidate, ModelPort, RawModelResponse, SafetyRating,
};
pub use renderer_port::{Artifact, RenderError, RendererPort};
pub use transcript_port::{TranscriptEntry, TranscriptPort};
