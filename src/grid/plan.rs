use serde::Serialize;

use crate::api::{BulkScoresRequest, NewScore, ScoreUpdate};
use crate::model::{AssessmentId, ScoreId, StudentId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaveAction {
    Create {
        score: f64,
        comment: Option<String>,
    },
    Update {
        score_id: ScoreId,
        score: f64,
        comment: Option<String>,
    },
    Delete {
        score_id: ScoreId,
    },
}

/// One network mutation for one cell, stamped with the edit it carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveTicket {
    pub student_id: StudentId,
    pub assessment_id: AssessmentId,
    pub seq: u64,
    pub action: SaveAction,
}

impl SaveTicket {
    pub fn key(&self) -> (StudentId, AssessmentId) {
        (self.student_id, self.assessment_id)
    }

    pub fn new_score(&self) -> Option<NewScore> {
        match &self.action {
            SaveAction::Create { score, comment } => Some(NewScore {
                student_id: self.student_id,
                score: *score,
                comment: comment.clone(),
            }),
            _ => None,
        }
    }

    pub fn update(&self) -> Option<(ScoreId, ScoreUpdate)> {
        match &self.action {
            SaveAction::Update {
                score_id,
                score,
                comment,
            } => Some((
                *score_id,
                ScoreUpdate {
                    score: *score,
                    comment: comment.clone(),
                },
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    /// Nothing to send.
    Unchanged,
    /// Blank on blur over a persisted score: local text goes back to the
    /// server value, nothing is deleted.
    Reverted,
    /// A save for this cell is in flight; the commit runs when it lands.
    Deferred,
    Save(SaveTicket),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Applied,
    /// The response was for an older edit; the server view was updated but
    /// the newer local value was kept.
    Superseded,
    Failed(String),
    /// The grid was closed before the response arrived.
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub outcome: SaveOutcome,
    /// Commit that was queued behind the finished save.
    pub follow_up: Option<SaveTicket>,
}

/// Everything one paste wants to send, grouped the way it is sent:
/// one bulk create, then individual updates and deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastePlan {
    pub assessment_id: AssessmentId,
    pub creates: Vec<SaveTicket>,
    pub updates: Vec<SaveTicket>,
    pub deletes: Vec<SaveTicket>,
    /// Non-numeric, out-of-range, or busy lines; those cells are untouched.
    pub skipped: usize,
    /// Lines past the last visible row.
    pub overflow: usize,
    pub unchanged: usize,
}

impl PastePlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn bulk_create_request(&self) -> Option<BulkScoresRequest> {
        if self.creates.is_empty() {
            return None;
        }
        Some(BulkScoresRequest {
            assessment_id: self.assessment_id,
            scores: self
                .creates
                .iter()
                .filter_map(SaveTicket::new_score)
                .collect(),
        })
    }
}
