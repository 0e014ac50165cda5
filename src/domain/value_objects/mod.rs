//! Value objects - Immutable objects defined by their attributes

mod character_record;
mod generation;
mod ids;
mod preference_set;

pub use character_record::{CharacterRecord, FieldKey, BACKSTORY_UNRESOLVED, UNRESOLVED};
pub use generation::{BlockStage, GenerationOutcome, RetryPolicy};
pub use ids::SessionId;
pub use preference_set::PreferenceSet;
