//! Editable student × assessment grid reconciled against the server.
//!
//! The grid never talks to the network. It hands out [`SaveTicket`]s and a
//! [`PastePlan`]; whoever executes them reports back through
//! [`ScoreGrid::finish_save`] and [`ScoreGrid::apply_snapshot`].
//!
//! Each accepted edit bumps the cell's sequence number. A save response only
//! replaces the local value when it carries the cell's latest sequence, and
//! a cell never has more than one save in flight, so a second commit cannot
//! create a second score for the same pair.

mod cell;
mod plan;
mod view;

pub use cell::{format_score, Cell, CellStatus};
pub use plan::{Commit, Completion, PastePlan, SaveAction, SaveOutcome, SaveTicket};
pub use view::{summarize, CellView, ColumnSummary, GridSort, GridView, RowView, SortBy};

use std::collections::HashMap;
use thiserror::Error;

use crate::model::{Assessment, AssessmentId, ClassId, Score, Student, StudentId, StudentScoreView};
use crate::paste::{parse_paste_column, PasteCell};
use crate::validate::{check_range, parse_score_input, ValidationError};

pub type CellKey = (StudentId, AssessmentId);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("student {0} is not in this grid")]
    UnknownStudent(StudentId),
    #[error("student {0} is hidden by the current filter")]
    HiddenStudent(StudentId),
    #[error("assessment {0} is not in this grid")]
    UnknownAssessment(AssessmentId),
    #[error("a comment needs a saved score first")]
    CommentWithoutScore,
    #[error("grid is closed")]
    Closed,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl GridError {
    pub fn code(&self) -> &'static str {
        match self {
            GridError::UnknownStudent(_)
            | GridError::HiddenStudent(_)
            | GridError::UnknownAssessment(_) => "not_found",
            GridError::CommentWithoutScore => "comment_without_score",
            GridError::Closed => "grid_closed",
            GridError::Validation(_) => "validation_failed",
        }
    }
}

pub struct ScoreGrid {
    class_id: ClassId,
    students: Vec<Student>,
    assessments: Vec<Assessment>,
    cells: HashMap<CellKey, Cell>,
    /// Visible row order after sort and filter.
    order: Vec<StudentId>,
    sort: Option<GridSort>,
    filter: Option<String>,
    next_seq: u64,
    closed: bool,
}

impl ScoreGrid {
    pub fn new(class_id: ClassId, students: Vec<Student>, assessments: Vec<Assessment>) -> Self {
        let mut grid = ScoreGrid {
            class_id,
            students: Vec::new(),
            assessments,
            cells: HashMap::new(),
            order: Vec::new(),
            sort: None,
            filter: None,
            next_seq: 0,
            closed: false,
        };
        grid.replace_roster(students);
        grid
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn assessments(&self) -> &[Assessment] {
        &self.assessments
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn visible_order(&self) -> &[StudentId] {
        &self.order
    }

    /// Unmount: later completions are ignored.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn assessment(&self, assessment_id: AssessmentId) -> Result<&Assessment, GridError> {
        self.assessments
            .iter()
            .find(|a| a.id == assessment_id)
            .ok_or(GridError::UnknownAssessment(assessment_id))
    }

    pub fn cell(&self, student_id: StudentId, assessment_id: AssessmentId) -> Option<&Cell> {
        self.cells.get(&(student_id, assessment_id))
    }

    fn cell_mut(
        &mut self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<&mut Cell, GridError> {
        if !self.students.iter().any(|s| s.id == student_id) {
            return Err(GridError::UnknownStudent(student_id));
        }
        self.assessment(assessment_id)?;
        Ok(self.cells.entry((student_id, assessment_id)).or_default())
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Keystroke edit. No network. Invalid input leaves the previous local
    /// value in place.
    pub fn input(
        &mut self,
        student_id: StudentId,
        assessment_id: AssessmentId,
        raw: &str,
    ) -> Result<CellStatus, GridError> {
        if self.closed {
            return Err(GridError::Closed);
        }
        let total = self.assessment(assessment_id)?.total();
        parse_score_input(raw, total)?;
        let seq = self.bump_seq();
        let cell = self.cell_mut(student_id, assessment_id)?;
        cell.input = raw.trim().to_string();
        cell.edit_seq = seq;
        cell.settle(true);
        Ok(cell.status)
    }

    /// Comment edit; only cells with a persisted score take comments.
    pub fn comment_input(
        &mut self,
        student_id: StudentId,
        assessment_id: AssessmentId,
        comment: &str,
    ) -> Result<CellStatus, GridError> {
        if self.closed {
            return Err(GridError::Closed);
        }
        let seq = self.bump_seq();
        let cell = self.cell_mut(student_id, assessment_id)?;
        if cell.server.is_none() {
            return Err(GridError::CommentWithoutScore);
        }
        let trimmed = comment.trim();
        cell.comment = Some(trimmed.to_string());
        cell.edit_seq = seq;
        cell.settle(true);
        Ok(cell.status)
    }

    /// Blur. Decides between nothing, update and create.
    pub fn commit(
        &mut self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Commit, GridError> {
        if self.closed {
            return Err(GridError::Closed);
        }
        let total = self.assessment(assessment_id)?.total();
        let cell = self.cell_mut(student_id, assessment_id)?;

        if cell.in_flight.is_some() {
            if cell.edit_seq > cell.in_flight.unwrap_or(0) {
                cell.queued = true;
                return Ok(Commit::Deferred);
            }
            return Ok(Commit::Unchanged);
        }

        let value = parse_score_input(&cell.input, total)?;
        let existing = cell.server.clone();
        let Some(value) = value else {
            cell.reset_to_server();
            return Ok(if existing.is_some() {
                Commit::Reverted
            } else {
                Commit::Unchanged
            });
        };

        let comment = cell.effective_comment().filter(|c| !c.is_empty());
        let action = match existing {
            Some(existing) => {
                if existing.score == value && comment == existing.comment {
                    cell.reset_to_server();
                    return Ok(Commit::Unchanged);
                }
                SaveAction::Update {
                    score_id: existing.id,
                    score: value,
                    comment,
                }
            }
            None => SaveAction::Create {
                score: value,
                comment: None,
            },
        };

        cell.in_flight = Some(cell.edit_seq);
        cell.queued = false;
        cell.status = CellStatus::Saving;
        cell.error = None;
        Ok(Commit::Save(SaveTicket {
            student_id,
            assessment_id,
            seq: cell.edit_seq,
            action,
        }))
    }

    /// Reports a save result.
    ///
    /// `Ok(Some(score))` is the server's row after a create or update,
    /// `Ok(None)` means deleted, or accepted without a row to show. The
    /// latter leaves the cell `Dirty` until the next snapshot fills it in.
    pub fn finish_save(
        &mut self,
        ticket: &SaveTicket,
        result: Result<Option<Score>, String>,
    ) -> Completion {
        let detached = Completion {
            outcome: SaveOutcome::Detached,
            follow_up: None,
        };
        if self.closed {
            return detached;
        }
        let Some(cell) = self.cells.get_mut(&ticket.key()) else {
            return detached;
        };
        if cell.in_flight == Some(ticket.seq) {
            cell.in_flight = None;
        }
        let current = cell.edit_seq == ticket.seq;
        // Create accepted, but the response carried no row: the score id is
        // unknown until the column is refetched.
        let mut unconfirmed = false;

        let outcome = match result {
            Ok(score) => {
                match (&ticket.action, score) {
                    (SaveAction::Delete { .. }, _) => cell.server = None,
                    (_, Some(score)) => cell.server = Some(score),
                    (_, None) => {}
                }
                unconfirmed =
                    matches!(ticket.action, SaveAction::Create { .. }) && cell.server.is_none();
                if current {
                    if unconfirmed {
                        cell.status = CellStatus::Dirty;
                        cell.error = None;
                    } else {
                        cell.reset_to_server();
                    }
                    SaveOutcome::Applied
                } else {
                    cell.settle(false);
                    SaveOutcome::Superseded
                }
            }
            Err(message) => {
                tracing::warn!(
                    student_id = ticket.student_id,
                    assessment_id = ticket.assessment_id,
                    error = %message,
                    "score save failed"
                );
                cell.error = Some(message.clone());
                cell.status = if current {
                    CellStatus::Failed
                } else {
                    CellStatus::Dirty
                };
                SaveOutcome::Failed(message)
            }
        };

        // A queued commit behind an unconfirmed create would create again;
        // it stays queued for `resume_queued` after the refetch.
        let queued = !unconfirmed && std::mem::take(&mut cell.queued);
        let follow_up = if queued {
            match self.commit(ticket.student_id, ticket.assessment_id) {
                Ok(Commit::Save(t)) => Some(t),
                _ => None,
            }
        } else {
            None
        };

        Completion { outcome, follow_up }
    }

    /// Issues a commit that was held back by `finish_save`, once the column
    /// has been refetched.
    pub fn resume_queued(
        &mut self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Option<SaveTicket>, GridError> {
        if self.closed {
            return Ok(None);
        }
        let Some(cell) = self.cells.get_mut(&(student_id, assessment_id)) else {
            return Ok(None);
        };
        if cell.in_flight.is_some() || !std::mem::take(&mut cell.queued) {
            return Ok(None);
        }
        match self.commit(student_id, assessment_id)? {
            Commit::Save(t) => Ok(Some(t)),
            _ => Ok(None),
        }
    }

    /// Plans a downward paste anchored at `start_student_id`.
    ///
    /// Blank or `-` lines clear (delete) persisted scores; bad or
    /// out-of-range lines leave their cell alone.
    pub fn paste(
        &mut self,
        start_student_id: StudentId,
        assessment_id: AssessmentId,
        text: &str,
    ) -> Result<PastePlan, GridError> {
        if self.closed {
            return Err(GridError::Closed);
        }
        let total = self.assessment(assessment_id)?.total();
        if !self.students.iter().any(|s| s.id == start_student_id) {
            return Err(GridError::UnknownStudent(start_student_id));
        }
        let anchor = self
            .order
            .iter()
            .position(|id| *id == start_student_id)
            .ok_or(GridError::HiddenStudent(start_student_id))?;

        let mut plan = PastePlan {
            assessment_id,
            ..PastePlan::default()
        };

        for (i, line) in parse_paste_column(text).into_iter().enumerate() {
            let Some(&student_id) = self.order.get(anchor + i) else {
                plan.overflow += 1;
                continue;
            };
            let seq = self.bump_seq();
            let cell = self.cells.entry((student_id, assessment_id)).or_default();
            if cell.in_flight.is_some() {
                plan.skipped += 1;
                continue;
            }

            let existing = cell.server.clone();
            let comment = cell.effective_comment().filter(|c| !c.is_empty());
            let action = match line {
                PasteCell::Clear => match existing {
                    Some(existing) => SaveAction::Delete {
                        score_id: existing.id,
                    },
                    None => {
                        cell.reset_to_server();
                        plan.unchanged += 1;
                        continue;
                    }
                },
                PasteCell::Value(v) => {
                    let Ok(v) = check_range(v, total) else {
                        plan.skipped += 1;
                        continue;
                    };
                    match existing {
                        Some(existing) if existing.score == v && existing.comment == comment => {
                            cell.reset_to_server();
                            plan.unchanged += 1;
                            continue;
                        }
                        Some(existing) => SaveAction::Update {
                            score_id: existing.id,
                            score: v,
                            comment,
                        },
                        None => SaveAction::Create {
                            score: v,
                            comment: None,
                        },
                    }
                }
                PasteCell::Invalid(_) => {
                    plan.skipped += 1;
                    continue;
                }
            };

            cell.input = match &action {
                SaveAction::Create { score, .. } | SaveAction::Update { score, .. } => {
                    format_score(*score)
                }
                SaveAction::Delete { .. } => String::new(),
            };
            // A pending comment rides along with an update until it lands.
            if !matches!(action, SaveAction::Update { .. }) {
                cell.comment = None;
            }
            cell.edit_seq = seq;
            cell.in_flight = Some(seq);
            cell.status = CellStatus::Saving;
            cell.error = None;

            let ticket = SaveTicket {
                student_id,
                assessment_id,
                seq,
                action,
            };
            match ticket.action {
                SaveAction::Create { .. } => plan.creates.push(ticket),
                SaveAction::Update { .. } => plan.updates.push(ticket),
                SaveAction::Delete { .. } => plan.deletes.push(ticket),
            }
        }

        Ok(plan)
    }

    /// Merges a fresh server column. Unsaved local edits survive; everything
    /// else takes the server value.
    pub fn apply_snapshot(
        &mut self,
        assessment_id: AssessmentId,
        rows: &[StudentScoreView],
    ) -> Result<(), GridError> {
        self.assessment(assessment_id)?;
        if self.closed {
            return Ok(());
        }
        let by_student: HashMap<StudentId, &StudentScoreView> =
            rows.iter().map(|r| (r.student_id, r)).collect();

        for student in &self.students {
            let server = by_student
                .get(&student.id)
                .and_then(|r| r.persisted(assessment_id));
            let cell = self.cells.entry((student.id, assessment_id)).or_default();
            cell.server = server;
            match cell.status {
                CellStatus::Synced => cell.reset_to_server(),
                _ => cell.settle(false),
            }
        }
        self.recompute_order();
        Ok(())
    }

    /// Swaps in a refetched roster; cells of remaining students are kept.
    pub fn replace_roster(&mut self, students: Vec<Student>) {
        self.cells
            .retain(|(sid, _), _| students.iter().any(|s| s.id == *sid));
        self.students = students;
        self.recompute_order();
    }

    pub fn set_sort(&mut self, sort: Option<GridSort>) -> Result<(), GridError> {
        if let Some(GridSort {
            by: SortBy::Score(aid),
            ..
        }) = sort
        {
            self.assessment(aid)?;
        }
        self.sort = sort;
        self.recompute_order();
        Ok(())
    }

    /// Case-insensitive substring on the full name; blank clears it.
    pub fn set_filter(&mut self, query: Option<&str>) {
        self.filter = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        self.recompute_order();
    }

    fn server_score(&self, student_id: StudentId, assessment_id: AssessmentId) -> Option<f64> {
        self.cells
            .get(&(student_id, assessment_id))
            .and_then(|c| c.server.as_ref())
            .map(|s| s.score)
    }

    fn recompute_order(&mut self) {
        let mut visible: Vec<&Student> = self
            .students
            .iter()
            .filter(|s| match &self.filter {
                Some(q) => s.full_name().to_lowercase().contains(q.as_str()),
                None => true,
            })
            .collect();

        if let Some(sort) = self.sort {
            visible.sort_by(|a, b| match sort.by {
                SortBy::Name => {
                    let o = view::cmp_names(a, b);
                    if sort.descending {
                        o.reverse()
                    } else {
                        o
                    }
                }
                SortBy::Score(aid) => view::cmp_scores(
                    self.server_score(a.id, aid),
                    self.server_score(b.id, aid),
                    sort.descending,
                )
                .then_with(|| view::cmp_names(a, b)),
            });
        }

        self.order = visible.into_iter().map(|s| s.id).collect();
    }

    pub fn summary(&self, assessment_id: AssessmentId) -> Result<ColumnSummary, GridError> {
        let assessment = self.assessment(assessment_id)?;
        Ok(summarize(
            assessment,
            self.students
                .iter()
                .map(|s| self.server_score(s.id, assessment_id)),
        ))
    }

    pub fn view(&self) -> GridView {
        let by_id: HashMap<StudentId, &Student> =
            self.students.iter().map(|s| (s.id, s)).collect();
        let rows = self
            .order
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|student| RowView {
                student_id: student.id,
                name: student.full_name(),
                grade: student.grade.clone(),
                cells: self
                    .assessments
                    .iter()
                    .map(|a| {
                        let fallback = Cell::default();
                        let cell = self.cells.get(&(student.id, a.id)).unwrap_or(&fallback);
                        let server_score = cell.server.as_ref().map(|s| s.score);
                        CellView {
                            assessment_id: a.id,
                            value: cell.input.clone(),
                            score_id: cell.server.as_ref().map(|s| s.id),
                            server_score,
                            comment: cell.effective_comment(),
                            percent: server_score.and_then(|v| a.percentage(v)),
                            status: cell.status,
                            error: cell.error.clone(),
                        }
                    })
                    .collect(),
            })
            .collect();

        GridView {
            class_id: self.class_id,
            assessments: self.assessments.clone(),
            rows,
            summaries: self
                .assessments
                .iter()
                .map(|a| {
                    summarize(
                        a,
                        self.students.iter().map(|s| self.server_score(s.id, a.id)),
                    )
                })
                .collect(),
            hidden_rows: self.students.len() - self.order.len(),
        }
    }
}
