//! User preferences collected by the creation dialogue

use serde::Serialize;

/// The seven optional answers collected before generation.
///
/// Each field is written exactly once, in declaration order, by the session
/// state machine. `None` means "let the generator decide" (the user answered
/// with an auto/skip keyword or an empty message).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreferenceSet {
    pub race: Option<String>,
    pub class: Option<String>,
    pub background: Option<String>,
    pub alignment: Option<String>,
    pub location: Option<String>,
    pub stats_preference: Option<String>,
    pub details: Option<String>,
}
