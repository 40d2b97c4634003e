//! Domain layer types and invariants.

pub mod dates;
pub mod entities;
pub mod error;
pub mod posts;
pub mod reading_time;
pub mod rich_text;
