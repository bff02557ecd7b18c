//! Selection/context tracker.
//!
//! Captures the current text selection in the active note so the chat
//! collaborator can use it as optional context. Only the most recent
//! emission matters; the tracker holds no history and nothing here is ever
//! persisted.

use log::trace;

use crate::SelectionData;

/// Tracks the selection over the currently displayed content.
#[derive(Default)]
pub struct SelectionTracker {
    current: Option<SelectionData>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a selection-change notification. A non-empty range captures
    /// `SelectionData`; a collapsed range (caret only) clears it. Offsets
    /// are character positions into `content`; `end` is clamped to its
    /// length.
    pub fn update(&mut self, content: &str, start: usize, end: usize) {
        let char_count = content.chars().count();
        let end = end.min(char_count);

        if start >= end {
            self.clear();
            return;
        }

        let text: String = content.chars().skip(start).take(end - start).collect();
        trace!("Selection updated: {}..{} ({} chars)", start, end, text.chars().count());
        self.current = Some(SelectionData { text, start, end });
    }

    /// Clears the selection, e.g. when the active note changes.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// The most recent non-empty selection, if any.
    pub fn current(&self) -> Option<&SelectionData> {
        self.current.as_ref()
    }

    /// The selected text, or the empty string when there is no selection.
    pub fn context_text(&self) -> &str {
        self.current.as_ref().map(|s| s.text.as_str()).unwrap_or("")
    }
}
