//! Smart teacher notepad library
//!
//! This library provides a note-taking workspace with markdown content,
//! auto-saving edits, per-note AI chat conversations, and text-to-speech
//! through a hosted synthesis service.

mod assistant;
mod autosave;
mod cleaner;
mod cli;
mod config;
mod errors;
mod notes;
mod selection;
mod session;
mod speech;
mod store;
mod types;
mod wav;

// Re-export key components
pub use assistant::*;
pub use autosave::*;
pub use cleaner::*;
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use notes::*;
pub use selection::*;
pub use session::*;
pub use speech::*;
pub use store::*;
pub use types::*;
pub use wav::*;
