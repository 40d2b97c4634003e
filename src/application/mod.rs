//! Application services layer.

pub mod article;
pub mod content;
pub mod error;
pub mod listing;
pub mod paths;
pub mod site;
