use crate::dispatch::Request;
use crate::gateway::GatewayResult;
use crate::model::{newest_first, JournalEntry};
use crate::toast::Toasts;
use tracing::warn;

pub const EMPTY_JOURNAL_MESSAGE: &str = "No journal entries yet.";

#[derive(Debug, Default)]
pub struct JournalPanel {
    entries: Vec<JournalEntry>,
    cursor: usize,
}

/// Trimmed draft content, or `None` when there is nothing to submit.
pub fn validate_draft(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl JournalPanel {
    pub fn new() -> Self {
        JournalPanel::default()
    }

    /// Server order is ignored; entries are always shown newest first.
    pub fn apply_loaded(&mut self, result: GatewayResult<Vec<JournalEntry>>, toasts: &mut Toasts) {
        match result {
            Ok(mut entries) => {
                entries.sort_by(newest_first);
                self.entries = entries;
                self.cursor = self.cursor.min(self.entries.len().saturating_sub(1));
            }
            Err(err) => {
                warn!(error = %err, "loading journal failed");
                toasts.error("Could not load journal entries.");
            }
        }
    }

    /// On success, returns the reload to issue.
    pub fn apply_added(
        &mut self,
        result: GatewayResult<JournalEntry>,
        toasts: &mut Toasts,
    ) -> Option<Request> {
        match result {
            Ok(_) => {
                toasts.success("Journal entry added.");
                Some(Request::LoadJournal)
            }
            Err(err) => {
                warn!(error = %err, "adding journal entry failed");
                toasts.error("Could not add the journal entry.");
                None
            }
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
        }
    }
}
