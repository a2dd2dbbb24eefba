use serde::Serialize;

use crate::model::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    /// Local value equals the last known server value.
    Synced,
    /// Edited locally, not yet sent.
    Dirty,
    /// A create/update/delete for this cell is in flight.
    Saving,
    /// Last save failed; the local value is kept for another commit.
    Failed,
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub(crate) server: Option<Score>,
    pub(crate) input: String,
    /// Pending comment edit; `None` means "whatever the server has".
    pub(crate) comment: Option<String>,
    pub(crate) status: CellStatus,
    pub(crate) edit_seq: u64,
    pub(crate) in_flight: Option<u64>,
    /// A commit arrived while a save was in flight.
    pub(crate) queued: bool,
    pub(crate) error: Option<String>,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            server: None,
            input: String::new(),
            comment: None,
            status: CellStatus::Synced,
            edit_seq: 0,
            in_flight: None,
            queued: false,
            error: None,
        }
    }
}

pub fn format_score(v: f64) -> String {
    v.to_string()
}

impl Cell {
    pub fn server(&self) -> Option<&Score> {
        self.server.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> CellStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn server_text(&self) -> String {
        self.server
            .as_ref()
            .map(|s| format_score(s.score))
            .unwrap_or_default()
    }

    pub fn server_comment(&self) -> Option<&str> {
        self.server.as_ref().and_then(|s| s.comment.as_deref())
    }

    /// Comment that would be sent with the next save.
    pub fn effective_comment(&self) -> Option<String> {
        match &self.comment {
            Some(c) => Some(c.clone()),
            None => self.server_comment().map(str::to_string),
        }
    }

    pub fn has_local_changes(&self) -> bool {
        if self.input != self.server_text() {
            return true;
        }
        match &self.comment {
            Some(c) => Some(c.as_str()) != self.server_comment(),
            None => false,
        }
    }

    pub(crate) fn reset_to_server(&mut self) {
        self.input = self.server_text();
        self.comment = None;
        self.status = CellStatus::Synced;
        self.error = None;
    }

    /// Recomputes status after a local edit (`edited`) or after the server
    /// view moved underneath the cell.
    pub(crate) fn settle(&mut self, edited: bool) {
        if let Some(seq) = self.in_flight {
            self.status = if self.edit_seq > seq {
                CellStatus::Dirty
            } else {
                CellStatus::Saving
            };
            return;
        }
        if !self.has_local_changes() {
            self.comment = None;
            self.status = CellStatus::Synced;
            self.error = None;
        } else if edited || self.status != CellStatus::Failed {
            self.status = CellStatus::Dirty;
        }
    }
}
