//! Root application state.
//!
//! The session exclusively owns the note collection; every component asks it
//! for mutations and observes whole-collection snapshots, never partial
//! ones. Each mutation goes through the repository's pure operations and the
//! resulting collection is persisted wholesale through the key-value store.
//! Content edits route through the auto-save pipeline; chat updates and
//! renames commit immediately.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::{
    assistant::Assistant,
    autosave::{Autosave, Commit, SaveStatus},
    clean_text_for_speech, frame_pcm, notes,
    selection::SelectionTracker,
    speech::SpeechClient,
    store::KeyValueStore,
    ChatMessage, Note, PadError, Result, Role, SelectionData, VoiceName, NOTES_KEY,
    SPEECH_SAMPLE_RATE,
};

/// The live workspace: collection, active note, selection, and auto-save.
pub struct Session {
    store: KeyValueStore,
    notes: Vec<Note>,
    active_note_id: Option<String>,
    selection: SelectionTracker,
    autosave: Autosave,
    commit_rx: mpsc::Receiver<Commit>,
}

impl Session {
    /// Opens a session over the given store, loading the persisted
    /// collection (or an empty one).
    pub fn open(store: KeyValueStore, autosave_delay: Duration) -> Self {
        let notes: Vec<Note> = store.read(NOTES_KEY, Vec::new());
        info!("Session opened with {} notes", notes.len());

        let (autosave, commit_rx) = Autosave::new(autosave_delay);
        Self {
            store,
            notes,
            active_note_id: None,
            selection: SelectionTracker::new(),
            autosave,
            commit_rx,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.active_note_id
            .as_deref()
            .and_then(|id| self.note(id))
    }

    pub fn active_note_id(&self) -> Option<&str> {
        self.active_note_id.as_deref()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    pub fn selection(&self) -> Option<&SelectionData> {
        self.selection.current()
    }

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    /// Creates a new empty note, makes it active, and persists.
    pub fn create_note(&mut self) -> String {
        // Creating switches the active note, so settle any buffered edit
        self.autosave.flush();
        self.drain_commits();

        let (note, next) = notes::create_note(&self.notes);
        self.notes = next;
        self.active_note_id = Some(note.id.clone());
        self.selection.clear();
        self.persist();
        note.id
    }

    /// Deletes a note. Deleting the active note clears the active selection
    /// and any edit still buffered for it.
    pub fn delete_note(&mut self, id: &str) {
        if self.autosave.pending_note_id() == Some(id) {
            self.autosave.discard();
        }

        self.notes = notes::delete_note(&self.notes, id);
        if self.active_note_id.as_deref() == Some(id) {
            self.active_note_id = None;
            self.selection.clear();
        }
        self.persist();
    }

    /// Changes the active note. Any buffered edit for the previous note is
    /// flushed and committed before the switch, and the selection resets.
    ///
    /// The reference behavior dropped the buffered edit here; flushing is
    /// the deliberate fix.
    pub fn select_note(&mut self, id: Option<&str>) {
        if self.active_note_id.as_deref() == id {
            return;
        }

        self.autosave.flush();
        self.drain_commits();
        self.selection.clear();
        self.active_note_id = id.map(str::to_string);
    }

    /// Records a keystroke-level content change to the active note. The
    /// commit happens after the debounce window; until then the buffered
    /// content is what [`Session::displayed_content`] shows.
    pub fn edit_active(&mut self, content: &str) {
        match self.active_note_id.clone() {
            Some(id) => self.autosave.edit(&id, content),
            None => debug!("Edit ignored: no active note"),
        }
    }

    /// Applies every commit the auto-save pipeline has delivered so far.
    pub fn drain_commits(&mut self) {
        while let Ok(commit) = self.commit_rx.try_recv() {
            if self.autosave.settle(&commit) {
                self.notes = notes::update_content(&self.notes, &commit.note_id, &commit.content);
                self.persist();
            }
        }
    }

    /// Immediately commits new content for a note, bypassing the debounce.
    pub fn commit_now(&mut self, id: &str, content: &str) -> Result<()> {
        if self.note(id).is_none() {
            return Err(PadError::NoteNotFound { id: id.to_string() });
        }
        self.notes = notes::update_content(&self.notes, id, content);
        self.persist();
        Ok(())
    }

    /// Replaces a note's chat history and persists. Recency (`updated_at`)
    /// is deliberately left alone.
    pub fn update_chat(&mut self, id: &str, messages: Vec<ChatMessage>) {
        self.notes = notes::update_chat(&self.notes, id, messages);
        self.persist();
    }

    /// Renames a note and persists. Non-sticky; the next content commit
    /// re-derives the title.
    pub fn rename_note(&mut self, id: &str, title: &str) -> Result<()> {
        if self.note(id).is_none() {
            return Err(PadError::NoteNotFound { id: id.to_string() });
        }
        self.notes = notes::rename_note(&self.notes, id, title);
        self.persist();
        Ok(())
    }

    /// The content the editing surface should display for the active note:
    /// the buffered edit while one is pending, the committed note otherwise.
    pub fn displayed_content(&self) -> Option<&str> {
        let id = self.active_note_id.as_deref()?;
        if let Some(buffer) = self.autosave.pending_content(id) {
            return Some(buffer);
        }
        self.note(id).map(|n| n.content.as_str())
    }

    /// Records a selection-change notification over the displayed content.
    pub fn update_selection(&mut self, start: usize, end: usize) {
        let content = match self.active_note_id.as_deref() {
            Some(id) => self
                .autosave
                .pending_content(id)
                .or_else(|| self.notes.iter().find(|n| n.id == id).map(|n| n.content.as_str())),
            None => None,
        };

        match content {
            Some(content) => {
                let content = content.to_string();
                self.selection.update(&content, start, end);
            }
            None => self.selection.clear(),
        }
    }

    /// Fuzzy search over titles (weighted double) and content.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Note> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default();
        let mut matched: Vec<(i64, &Note)> = self
            .notes
            .iter()
            .filter_map(|note| {
                let title_score = matcher.fuzzy_match(&note.title, query).unwrap_or(0);
                let content_score = matcher.fuzzy_match(&note.content, query).unwrap_or(0);
                let score = title_score * 2 + content_score;
                (score > 0).then_some((score, note))
            })
            .collect();

        matched.sort_by(|a, b| b.0.cmp(&a.0));
        matched.into_iter().take(limit).map(|(_, n)| n).collect()
    }

    /// Sends a question in a note's conversation: appends the user message,
    /// asks the collaborator with note and selection context, appends the
    /// reply, persisting after each append. Always yields text at this
    /// boundary; remote failures arrive as the fixed fallback string.
    pub async fn ask_assistant(
        &mut self,
        assistant: &Assistant,
        note_id: &str,
        question: &str,
        image: Option<String>,
    ) -> Result<String> {
        if question.trim().is_empty() && image.is_none() {
            return Err(PadError::ApplicationError {
                message: "Nothing to send: empty message and no image".to_string(),
            });
        }

        let note = self
            .note(note_id)
            .ok_or_else(|| PadError::NoteNotFound {
                id: note_id.to_string(),
            })?
            .clone();

        let user_msg = ChatMessage::new(Role::User, question, image);
        let mut history = note.chat_history.clone();
        history.push(user_msg.clone());
        self.update_chat(note_id, history.clone());

        let note_context = format!("Title: {}\nContent:\n{}", note.title, note.content);
        let selected = if self.active_note_id.as_deref() == Some(note_id) {
            self.selection.context_text().to_string()
        } else {
            String::new()
        };

        let reply = assistant
            .reply(
                &user_msg.text,
                &history,
                user_msg.image.as_deref(),
                &note_context,
                &selected,
            )
            .await;

        // The request is scoped to the issuing note: if the note was deleted
        // while the call was in flight, the late reply is discarded.
        match self.note(note_id) {
            Some(current) => {
                let mut history = current.chat_history.clone();
                history.push(ChatMessage::new(Role::Model, reply.clone(), None));
                self.update_chat(note_id, history);
            }
            None => {
                warn!("Note {} deleted during assistant request; reply discarded", note_id);
            }
        }

        Ok(reply)
    }

    /// Produces a playable WAV container for the given text, or `None` when
    /// there is nothing to speak or no audio came back.
    pub async fn speak(
        &self,
        speech: &SpeechClient,
        text: &str,
        voice: VoiceName,
    ) -> Option<Vec<u8>> {
        let cleaned = clean_text_for_speech(text);
        if cleaned.is_empty() {
            debug!("Nothing to speak after cleaning");
            return None;
        }

        let pcm = speech.fetch_pcm(&cleaned, voice).await?;
        Some(frame_pcm(&pcm, SPEECH_SAMPLE_RATE))
    }

    /// Persists the whole collection. Fails soft inside the store.
    fn persist(&self) {
        self.store.write(NOTES_KEY, &self.notes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AUTOSAVE_DELAY;
    use tempfile::tempdir;

    fn session_in(dir: &std::path::Path) -> Session {
        let store = KeyValueStore::open(dir).unwrap();
        Session::open(store, AUTOSAVE_DELAY)
    }

    #[test]
    fn create_prepends_and_activates() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let first = session.create_note();
        let second = session.create_note();

        assert_eq!(session.notes().len(), 2);
        assert_eq!(session.notes()[0].id, second);
        assert_eq!(session.notes()[1].id, first);
        assert_eq!(session.active_note_id(), Some(second.as_str()));
    }

    #[test]
    fn delete_active_note_clears_active_and_selection() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let id = session.create_note();
        session.commit_now(&id, "some selectable text").unwrap();
        session.update_selection(0, 4);
        assert!(session.selection().is_some());

        session.delete_note(&id);
        assert!(session.active_note_id().is_none());
        assert!(session.selection().is_none());
        assert!(session.notes().is_empty());
    }

    #[test]
    fn delete_other_note_leaves_active_selection_untouched() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let other = session.create_note();
        let active = session.create_note();
        session.commit_now(&active, "keep this selection").unwrap();
        session.update_selection(0, 4);

        session.delete_note(&other);
        assert_eq!(session.active_note_id(), Some(active.as_str()));
        assert_eq!(session.selection().unwrap().text, "keep");
    }

    #[tokio::test(start_paused = true)]
    async fn switching_notes_flushes_the_pending_edit() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let first = session.create_note();
        let second = session.create_note();

        session.select_note(Some(&first));
        session.edit_active("typed but not yet committed");
        assert_eq!(session.save_status(), SaveStatus::Saving);

        // Switch before the debounce window elapses
        session.select_note(Some(&second));

        let committed = session.note(&first).unwrap();
        assert_eq!(committed.content, "typed but not yet committed");
        assert_eq!(committed.title, "typed but not yet committed");
        assert_eq!(session.save_status(), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn displayed_content_is_the_local_buffer_while_pending() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let id = session.create_note();
        session.commit_now(&id, "committed").unwrap();
        session.edit_active("buffered keystrokes");

        assert_eq!(session.displayed_content(), Some("buffered keystrokes"));
        assert_eq!(session.note(&id).unwrap().content, "committed");

        tokio::time::sleep(AUTOSAVE_DELAY + Duration::from_millis(100)).await;
        session.drain_commits();
        assert_eq!(session.displayed_content(), Some("buffered keystrokes"));
        assert_eq!(session.note(&id).unwrap().content, "buffered keystrokes");
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_the_edited_note_discards_its_pending_commit() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let keep = session.create_note();
        let doomed = session.create_note();
        session.edit_active("about to vanish");

        session.delete_note(&doomed);
        assert_eq!(session.save_status(), SaveStatus::Saved);

        tokio::time::sleep(AUTOSAVE_DELAY + Duration::from_millis(100)).await;
        session.drain_commits();
        assert!(session.note(&doomed).is_none());
        assert!(session.note(&keep).is_some());
    }

    #[test]
    fn rename_then_commit_rederives_title() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let id = session.create_note();
        session.rename_note(&id, "Manual Title").unwrap();
        assert_eq!(session.note(&id).unwrap().title, "Manual Title");

        session.commit_now(&id, "# Derived Again").unwrap();
        assert_eq!(session.note(&id).unwrap().title, "Derived Again");
    }

    #[test]
    fn search_weights_title_matches() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let in_content = session.create_note();
        session
            .commit_now(&in_content, "first line\nmentions gravity later")
            .unwrap();
        let in_title = session.create_note();
        session.commit_now(&in_title, "# Gravity notes").unwrap();

        let hits = session.search("gravity", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, in_title);
    }

    #[tokio::test]
    async fn empty_question_without_image_is_refused() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        let id = session.create_note();

        let assistant = Assistant::new(None);
        let result = session.ask_assistant(&assistant, &id, "   ", None).await;
        assert!(result.is_err());
        assert!(session.note(&id).unwrap().chat_history.is_empty());
    }

    #[tokio::test]
    async fn failed_assistant_call_still_records_both_turns() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        let id = session.create_note();

        // No credential: the boundary reply is the fixed fallback text
        let assistant = Assistant::new(None);
        let reply = session
            .ask_assistant(&assistant, &id, "what is gravity?", None)
            .await
            .unwrap();
        assert_eq!(reply, crate::assistant::FALLBACK_REPLY);

        let history = &session.note(&id).unwrap().chat_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Model);
        assert_eq!(history[1].text, crate::assistant::FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn speaking_whitespace_only_text_is_a_no_op() {
        let dir = tempdir().unwrap();
        let session = session_in(dir.path());

        let speech = SpeechClient::new(None);
        assert!(session.speak(&speech, "   \n  ", VoiceName::Kore).await.is_none());
    }
}
