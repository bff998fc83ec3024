//! Tauri command handlers
//!
//! This module contains all the command handlers that can be invoked from the frontend.
//! Commands are organized into different modules based on their functionality.

pub mod auth;
pub mod config;
pub mod llm;
pub mod settings;
pub mod videos;
pub mod youtube;

// Re-export all command functions for easy access
pub use auth::*;
pub use config::*;
pub use llm::*;
pub use settings::*;
pub use videos::*;
pub use youtube::*;
