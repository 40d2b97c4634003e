//! Blog front-end for a headless content API.
//!
//! Articles and listings are pulled from a Prismic repository, rendered with
//! askama templates and either written out as a static site (`build`) or
//! served over HTTP with fallback rendering and timed revalidation (`serve`).

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
