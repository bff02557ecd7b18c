//! Auto-save debounce pipeline.
//!
//! Converts a rapid stream of content-change events into a bounded rate of
//! commits. The debounce is an explicit two-state machine: `Idle`, or
//! `Pending` holding the latest buffered content, a sequence number, and an
//! owned timer task. Every edit cancels-and-replaces the previous timer, so
//! at most one commit is ever in flight and only the most recent edit within
//! the delay window survives.
//!
//! Expired (or flushed) commits are delivered over an mpsc channel; the
//! session applies them to the repository and then calls [`Autosave::settle`],
//! which rejects commits that a later edit superseded.

use std::mem;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

/// Delay after the last edit before a commit is attempted.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);

/// User-visible saving status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// No buffered edit; the collection reflects everything typed
    Saved,
    /// An edit is buffered and its commit timer is armed
    Saving,
}

/// A buffered edit ready to be applied to the repository.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Note the edit belongs to
    pub note_id: String,
    /// Full replacement content
    pub content: String,
    /// Sequence number used to reject superseded commits
    seq: u64,
}

/// The debounce state machine.
enum DebounceState {
    Idle,
    Pending {
        note_id: String,
        content: String,
        seq: u64,
        timer: JoinHandle<()>,
    },
}

/// Per-session auto-save pipeline.
pub struct Autosave {
    delay: Duration,
    tx: mpsc::Sender<Commit>,
    state: DebounceState,
    next_seq: u64,
}

impl Autosave {
    /// Creates the pipeline and the channel its commits arrive on.
    pub fn new(delay: Duration) -> (Self, mpsc::Receiver<Commit>) {
        // Cancel-and-replace keeps at most one commit in flight; a small
        // buffer absorbs the flush-right-after-expiry race.
        let (tx, rx) = mpsc::channel(8);
        (
            Self {
                delay,
                tx,
                state: DebounceState::Idle,
                next_seq: 0,
            },
            rx,
        )
    }

    /// Records a content-change event, arming (or re-arming) the commit
    /// timer. Any previously buffered edit is superseded.
    pub fn edit(&mut self, note_id: &str, content: &str) {
        self.cancel_timer();

        let seq = self.next_seq;
        self.next_seq += 1;

        let commit = Commit {
            note_id: note_id.to_string(),
            content: content.to_string(),
            seq,
        };

        let tx = self.tx.clone();
        let delay = self.delay;
        let delayed = commit.clone();
        let timer = tokio::spawn(async move {
            time::sleep(delay).await;
            trace!("Autosave timer expired for note {}", delayed.note_id);
            if tx.send(delayed).await.is_err() {
                warn!("Autosave commit channel closed; edit dropped");
            }
        });

        self.state = DebounceState::Pending {
            note_id: commit.note_id,
            content: commit.content,
            seq,
            timer,
        };
    }

    /// Delivers the buffered edit immediately instead of waiting for the
    /// timer. No-op when idle.
    pub fn flush(&mut self) {
        if let DebounceState::Pending {
            note_id,
            content,
            seq,
            timer,
        } = &self.state
        {
            timer.abort();
            let commit = Commit {
                note_id: note_id.clone(),
                content: content.clone(),
                seq: *seq,
            };
            debug!("Flushing pending edit for note {}", commit.note_id);
            if self.tx.try_send(commit).is_err() {
                warn!("Autosave commit channel full; flushed edit dropped");
            }
        }
    }

    /// Abandons the buffered edit without committing it. Used when the note
    /// being edited is deleted out from under the pipeline.
    pub fn discard(&mut self) {
        if matches!(self.state, DebounceState::Pending { .. }) {
            debug!("Discarding pending edit");
        }
        self.cancel_timer();
    }

    /// Accepts or rejects a delivered commit. Returns `true` exactly when
    /// the commit is the one currently pending; superseded (stale) commits
    /// are rejected so a newer buffered edit is never overwritten.
    pub fn settle(&mut self, commit: &Commit) -> bool {
        match &self.state {
            DebounceState::Pending { seq, .. } if *seq == commit.seq => {
                self.state = DebounceState::Idle;
                true
            }
            _ => {
                debug!(
                    "Rejected stale commit for note {} (seq {})",
                    commit.note_id, commit.seq
                );
                false
            }
        }
    }

    /// The user-visible status: `Saving` while an edit is buffered.
    pub fn status(&self) -> SaveStatus {
        match self.state {
            DebounceState::Idle => SaveStatus::Saved,
            DebounceState::Pending { .. } => SaveStatus::Saving,
        }
    }

    /// The buffered content for `note_id`, if an edit to it is pending.
    /// The editing surface displays this buffer, never the committed note,
    /// so the view cannot lose keystrokes during the debounce window.
    pub fn pending_content(&self, note_id: &str) -> Option<&str> {
        match &self.state {
            DebounceState::Pending {
                note_id: pending_id,
                content,
                ..
            } if pending_id == note_id => Some(content),
            _ => None,
        }
    }

    /// The note the pending edit (if any) belongs to.
    pub fn pending_note_id(&self) -> Option<&str> {
        match &self.state {
            DebounceState::Pending { note_id, .. } => Some(note_id),
            _ => None,
        }
    }

    fn cancel_timer(&mut self) {
        if let DebounceState::Pending { timer, .. } =
            mem::replace(&mut self.state, DebounceState::Idle)
        {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_produce_exactly_one_commit() {
        let (mut autosave, mut rx) = Autosave::new(AUTOSAVE_DELAY);

        autosave.edit("n1", "a");
        autosave.edit("n1", "ab");
        autosave.edit("n1", "abc");
        assert_eq!(autosave.status(), SaveStatus::Saving);

        // Quiet period past the debounce window
        time::sleep(Duration::from_millis(2100)).await;

        let commit = rx.try_recv().expect("one commit expected");
        assert_eq!(commit.note_id, "n1");
        assert_eq!(commit.content, "abc");
        assert!(rx.try_recv().is_err(), "superseded edits must not commit");

        assert!(autosave.settle(&commit));
        assert_eq!(autosave.status(), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn edit_within_window_rearms_the_timer() {
        let (mut autosave, mut rx) = Autosave::new(AUTOSAVE_DELAY);

        autosave.edit("n1", "first");
        time::sleep(Duration::from_millis(1500)).await;
        autosave.edit("n1", "second");

        // 1.5s + 1s: the first timer would have fired by now had it survived
        time::sleep(Duration::from_millis(1000)).await;
        assert!(rx.try_recv().is_err());

        time::sleep(Duration::from_millis(1100)).await;
        let commit = rx.try_recv().expect("re-armed timer fires once");
        assert_eq!(commit.content, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_delivers_without_waiting() {
        let (mut autosave, mut rx) = Autosave::new(AUTOSAVE_DELAY);

        autosave.edit("n1", "buffered");
        autosave.flush();

        let commit = rx.try_recv().expect("flush delivers immediately");
        assert_eq!(commit.content, "buffered");
        assert!(autosave.settle(&commit));

        // The aborted timer must not deliver a second copy
        time::sleep(Duration::from_millis(2100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_commit_is_rejected_after_superseding_edit() {
        let (mut autosave, mut rx) = Autosave::new(AUTOSAVE_DELAY);

        autosave.edit("n1", "old");
        autosave.flush();
        let stale = rx.try_recv().unwrap();

        // A newer edit lands before the flushed commit is applied
        autosave.edit("n1", "new");

        assert!(!autosave.settle(&stale));
        assert_eq!(autosave.status(), SaveStatus::Saving);
        assert_eq!(autosave.pending_content("n1"), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn discard_abandons_the_buffered_edit() {
        let (mut autosave, mut rx) = Autosave::new(AUTOSAVE_DELAY);

        autosave.edit("n1", "doomed");
        autosave.discard();
        assert_eq!(autosave.status(), SaveStatus::Saved);

        time::sleep(Duration::from_millis(2100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_content_tracks_the_latest_buffer() {
        let (mut autosave, _rx) = Autosave::new(AUTOSAVE_DELAY);

        assert_eq!(autosave.pending_content("n1"), None);
        autosave.edit("n1", "draft");
        assert_eq!(autosave.pending_content("n1"), Some("draft"));
        assert_eq!(autosave.pending_content("other"), None);
    }
}
