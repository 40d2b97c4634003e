//! Askama views and template rendering helpers.

pub mod views;
