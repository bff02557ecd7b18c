//! Core data structures for the tutorpad application.
//!
//! This module contains the primary types used throughout the application,
//! including the Note and ChatMessage structures and the persisted
//! preference enums.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::PadError;

/// A specialized Result type for tutorpad operations.
pub type Result<T> = std::result::Result<T, PadError>;

/// Process-local counter so that ids created within the same millisecond
/// stay unique.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a fresh opaque note/message id.
pub fn generate_id() -> String {
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", Utc::now().timestamp_millis(), seq)
}

/// Represents a single note in our system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier for the note, assigned at creation, immutable
    pub id: String,
    /// Note title, derived from content unless explicitly renamed
    pub title: String,
    /// Note content in Markdown format
    pub content: String,
    /// Last modification time (content edits only; chat updates do not count)
    pub updated_at: DateTime<Utc>,
    /// Per-note conversation with the assistant, insertion-ordered
    pub chat_history: Vec<ChatMessage>,
}

impl Note {
    /// Creates a new empty note with a fresh id and current timestamp.
    pub fn new() -> Self {
        Note {
            id: generate_id(),
            title: String::new(),
            content: String::new(),
            updated_at: Utc::now(),
            chat_history: Vec::new(),
        }
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}

/// Who produced a chat message. Exactly two variants, no others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn in a note's conversation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    /// Optional base64-encoded image payload attached by the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>, image: Option<String>) -> Self {
        ChatMessage {
            id: generate_id(),
            role,
            text: text.into(),
            image,
            timestamp: Utc::now(),
        }
    }
}

/// The current text selection in the active note. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionData {
    /// Selected text, as displayed
    pub text: String,
    /// Start offset in characters
    pub start: usize,
    /// End offset in characters (exclusive)
    pub end: usize,
}

/// Display theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

/// Accent color preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor {
    #[default]
    Emerald,
    Blue,
    Rose,
}

/// The fixed set of prebuilt voices offered by the speech synthesis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
pub enum VoiceName {
    Puck,
    Charon,
    #[default]
    Kore,
    Fenrir,
    Zephyr,
}

impl VoiceName {
    /// The identifier the speech service expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceName::Puck => "Puck",
            VoiceName::Charon => "Charon",
            VoiceName::Kore => "Kore",
            VoiceName::Fenrir => "Fenrir",
            VoiceName::Zephyr => "Zephyr",
        }
    }
}

/// Available subcommands for the tutorpad application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note (optionally seeded with content)
    New {
        /// Initial content for the note, can be markdown formatted
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the note's initial content
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// List notes, newest first
    List {
        /// Limit the number of notes returned
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Only show note IDs and titles
        #[clap(short, long)]
        brief: bool,
    },

    /// View a note by ID
    Show {
        /// ID of the note to view
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit a note's content (title re-derives from the first line)
    Edit {
        /// ID of the note to edit
        id: String,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the new note content
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Open content in the default editor
        #[clap(short, long)]
        editor: bool,
    },

    /// Rename a note (overridden by the derived title on the next edit)
    Rename {
        /// ID of the note to rename
        id: String,

        /// The new title
        title: String,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Search notes by title or content
    Search {
        /// Search query text
        query: String,

        /// Limit the number of search results
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Ask the assistant a question in a note's conversation
    Chat {
        /// ID of the note whose conversation to continue
        id: String,

        /// The question to ask
        message: String,

        /// Path to an image to attach
        #[clap(short, long)]
        image: Option<PathBuf>,
    },

    /// Synthesize speech for a note (or arbitrary text) into a WAV file
    Speak {
        /// ID of the note to read aloud
        #[clap(short = 'i', long, conflicts_with = "text")]
        id: Option<String>,

        /// Arbitrary text to read aloud
        #[clap(short, long)]
        text: Option<String>,

        /// Path for the output WAV file
        #[clap(short, long, default_value = "speech.wav")]
        output: PathBuf,

        /// Voice to use (defaults to the persisted preference)
        #[clap(short, long)]
        voice: Option<VoiceName>,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a setting (theme=dark, accent=blue, voice=Kore)
        #[clap(short, long)]
        set: Option<String>,

        /// Reset persisted settings to defaults
        #[clap(short, long)]
        reset: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn new_note_is_empty_with_fresh_id() {
        let note = Note::new();
        assert!(note.title.is_empty());
        assert!(note.content.is_empty());
        assert!(note.chat_history.is_empty());
        assert!(!note.id.is_empty());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
    }

    #[test]
    fn preference_defaults_match_reference() {
        assert_eq!(Theme::default(), Theme::Dark);
        assert_eq!(AccentColor::default(), AccentColor::Emerald);
        assert_eq!(VoiceName::default(), VoiceName::Kore);
    }
}
