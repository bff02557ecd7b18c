//! Note repository operations.
//!
//! Every operation is a total, pure function over the collection: it returns
//! a new `Vec<Note>` and leaves the input untouched, so callers (who own the
//! collection) always observe either the pre- or post-mutation snapshot.
//! None of these functions fails for an absent id; a non-matching operation
//! is a no-op.

use chrono::Utc;
use log::debug;

use crate::{ChatMessage, Note};

/// Title used when a note's content yields no usable first line.
pub const UNTITLED: &str = "Untitled Note";

/// Maximum length of a derived title, in characters.
pub const TITLE_MAX_CHARS: usize = 30;

/// Derives a note title from its content: first line, leading `#` heading
/// markers stripped, trimmed, truncated to [`TITLE_MAX_CHARS`]. An empty
/// result falls back to [`UNTITLED`].
pub fn derive_title(content: &str) -> String {
    let first_line = content.split('\n').next().unwrap_or("");

    let stripped = if first_line.starts_with('#') {
        first_line.trim_start_matches('#')
    } else {
        first_line
    };

    let title: String = stripped.trim().chars().take(TITLE_MAX_CHARS).collect();
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

/// Builds a fresh empty note and prepends it to the collection, so the
/// collection stays ordered newest-first.
pub fn create_note(notes: &[Note]) -> (Note, Vec<Note>) {
    let note = Note::new();
    debug!("Created note {}", note.id);

    let mut next = Vec::with_capacity(notes.len() + 1);
    next.push(note.clone());
    next.extend_from_slice(notes);
    (note, next)
}

/// Removes the note with the matching id. No-op if absent.
pub fn delete_note(notes: &[Note], id: &str) -> Vec<Note> {
    notes.iter().filter(|n| n.id != id).cloned().collect()
}

/// Replaces the content of the matching note, re-deriving its title and
/// bumping `updated_at`. Non-matching notes pass through unchanged.
pub fn update_content(notes: &[Note], id: &str, content: &str) -> Vec<Note> {
    notes
        .iter()
        .map(|note| {
            if note.id == id {
                let mut updated = note.clone();
                updated.title = derive_title(content);
                updated.content = content.to_string();
                updated.updated_at = Utc::now();
                updated
            } else {
                note.clone()
            }
        })
        .collect()
}

/// Replaces the chat history of the matching note wholesale.
///
/// `updated_at` is deliberately untouched: chat activity does not count as
/// "note edited" for recency purposes.
pub fn update_chat(notes: &[Note], id: &str, messages: Vec<ChatMessage>) -> Vec<Note> {
    notes
        .iter()
        .map(|note| {
            if note.id == id {
                let mut updated = note.clone();
                updated.chat_history = messages.clone();
                updated
            } else {
                note.clone()
            }
        })
        .collect()
}

/// Sets the title of the matching note directly, bypassing derivation.
/// The override is transient: the next `update_content` re-derives.
pub fn rename_note(notes: &[Note], id: &str, title: &str) -> Vec<Note> {
    notes
        .iter()
        .map(|note| {
            if note.id == id {
                let mut updated = note.clone();
                updated.title = title.to_string();
                updated
            } else {
                note.clone()
            }
        })
        .collect()
}
