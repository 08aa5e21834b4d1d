//! Common types, errors and traits shared by the engine and venue adapters

pub mod errors;
pub mod traits;
pub mod types;
