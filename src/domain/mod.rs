//! Domain layer - Core vocabulary of the character generator
//!
//! This layer contains:
//! - Value Objects: session identity, collected preferences, the parsed
//!   character record and the generation outcome taxonomy

pub mod value_objects;
