//! Error types for the tutorpad application.
//!
//! This module defines custom error types that categorize different failures
//! that can occur during note management operations. Storage and remote
//! collaborator faults are deliberately absent: those are converted to benign
//! fallback values at the layer where they occur and never propagate here.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the tutorpad application.
#[derive(Error, Debug)]
pub enum PadError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to HTTP transport.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// file not found
    #[error("File not found: {file_path}")]
    FileNotFound { file_path: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },

    #[error("{message}")]
    EditorError { message: String },
}
