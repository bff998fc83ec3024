//! Core business logic module
//!
//! This module contains the domain models, the three coordinators (session,
//! persistence, video lookup) and the concrete collaborators they talk to.

pub mod config;
pub mod datastore;
pub mod debounce;
pub mod google_oauth;
pub mod llm;
pub mod models;
pub mod persistence;
pub mod session;
pub mod youtube;
pub mod youtube_backend;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod session_tests;

#[cfg(test)]
mod persistence_tests;
