//! Runs grid tickets, paste plans and bulk imports against a [`MarkbookApi`],
//! then refetches so the server stays the source of truth.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{
    ApiError, BulkImportRequest, BulkScoresRequest, BulkStudentsRequest, ImportConflict,
    ImportRow, MarkbookApi,
};
use crate::grid::{Commit, GridError, SaveAction, SaveOutcome, SaveTicket, ScoreGrid};
use crate::model::{Assessment, AssessmentId, ClassId, Score, Student, StudentId};
use crate::paste::parse_rows;
use crate::roster::{self, RosterDefaults, RosterPreview};
use crate::validate::{check_range, ValidationError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::Grid(e) => e.code(),
            SyncError::Api(e) => e.code(),
            SyncError::Validation(_) => "validation_failed",
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SyncError::Api(ApiError::Unauthorized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitResult {
    Unchanged,
    Reverted,
    Deferred,
    Saved,
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub result: CommitResult,
    pub requests: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFailure {
    pub student_id: StudentId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub overflow: usize,
    pub failures: Vec<SaveFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreImportReport {
    pub submitted: usize,
    pub created: usize,
    pub updated: usize,
    pub conflicts: Vec<ImportConflict>,
    /// Lines that did not parse.
    pub skipped: usize,
    /// Parsed rows outside `[0, total_marks]`.
    pub invalid: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterImportReport {
    pub submitted: usize,
    pub skipped: usize,
    pub preview: RosterPreview,
    pub created: usize,
    pub linked: usize,
    pub students: Vec<Student>,
}

pub fn open_grid<A: MarkbookApi + ?Sized>(
    api: &A,
    class_id: ClassId,
    assessment_ids: Option<&[AssessmentId]>,
) -> Result<ScoreGrid, SyncError> {
    let students = api.list_students(class_id)?;
    let assessments = match assessment_ids {
        Some(ids) => ids
            .iter()
            .map(|id| api.get_assessment(*id))
            .collect::<Result<Vec<_>, _>>()?,
        None => api.list_assessments(class_id)?,
    };
    let ids: Vec<AssessmentId> = assessments.iter().map(|a| a.id).collect();
    let mut grid = ScoreGrid::new(class_id, students, assessments);
    for id in ids {
        refresh_column(api, &mut grid, id)?;
    }
    debug!(
        class_id,
        rows = grid.students().len(),
        cols = grid.assessments().len(),
        "grid opened"
    );
    Ok(grid)
}

/// Invalidate + refetch one assessment column.
pub fn refresh_column<A: MarkbookApi + ?Sized>(
    api: &A,
    grid: &mut ScoreGrid,
    assessment_id: AssessmentId,
) -> Result<(), SyncError> {
    grid.assessment(assessment_id)?;
    let rows = api.students_with_scores(assessment_id, grid.class_id())?;
    grid.apply_snapshot(assessment_id, &rows)?;
    Ok(())
}

/// Refetches the roster, then one column or all of them.
pub fn refresh<A: MarkbookApi + ?Sized>(
    api: &A,
    grid: &mut ScoreGrid,
    assessment_id: Option<AssessmentId>,
) -> Result<(), SyncError> {
    let students = api.list_students(grid.class_id())?;
    grid.replace_roster(students);
    let ids: Vec<AssessmentId> = match assessment_id {
        Some(id) => vec![id],
        None => grid.assessments().iter().map(|a| a.id).collect(),
    };
    for id in ids {
        refresh_column(api, grid, id)?;
    }
    Ok(())
}

fn execute<A: MarkbookApi + ?Sized>(
    api: &A,
    ticket: &SaveTicket,
) -> Result<Option<Score>, ApiError> {
    match &ticket.action {
        SaveAction::Create { .. } => {
            let Some(row) = ticket.new_score() else {
                return Ok(None);
            };
            let created = api.bulk_create_scores(&BulkScoresRequest {
                assessment_id: ticket.assessment_id,
                scores: vec![row],
            })?;
            Ok(created
                .into_iter()
                .find(|s| s.student_id == ticket.student_id))
        }
        SaveAction::Update { .. } => {
            let Some((score_id, update)) = ticket.update() else {
                return Ok(None);
            };
            api.update_score(score_id, &update).map(Some)
        }
        SaveAction::Delete { score_id } => {
            api.delete_score(*score_id)?;
            Ok(None)
        }
    }
}

/// Blur on one cell: create-or-update, plus any commit queued behind it.
/// The column is refetched after the saves. A failed save keeps the local
/// value and is returned as an error.
pub fn commit_cell<A: MarkbookApi + ?Sized>(
    api: &A,
    grid: &mut ScoreGrid,
    student_id: StudentId,
    assessment_id: AssessmentId,
) -> Result<CommitReport, SyncError> {
    let idle = |result| CommitReport {
        result,
        requests: 0,
    };
    let mut next = match grid.commit(student_id, assessment_id)? {
        Commit::Save(t) => Some(t),
        Commit::Unchanged => return Ok(idle(CommitResult::Unchanged)),
        Commit::Reverted => return Ok(idle(CommitResult::Reverted)),
        Commit::Deferred => return Ok(idle(CommitResult::Deferred)),
    };

    let mut report = CommitReport {
        result: CommitResult::Saved,
        requests: 0,
    };
    while let Some(ticket) = next.take() {
        report.requests += 1;
        match execute(api, &ticket) {
            Ok(score) => {
                let done = grid.finish_save(&ticket, Ok(score));
                report.result = match done.outcome {
                    SaveOutcome::Superseded => CommitResult::Superseded,
                    _ => CommitResult::Saved,
                };
                next = done.follow_up;
            }
            Err(e) => {
                let done = grid.finish_save(&ticket, Err(e.to_string()));
                if let Some(follow) = done.follow_up {
                    grid.finish_save(&follow, Err(e.to_string()));
                }
                // The write may have landed even though the response did not.
                if !matches!(e, ApiError::Unauthorized) {
                    if let Err(refetch) = refresh_column(api, grid, assessment_id) {
                        warn!(assessment_id, error = %refetch, "refetch after failed save failed");
                    }
                }
                return Err(e.into());
            }
        }
        if next.is_none() {
            refresh_column(api, grid, assessment_id)?;
            next = grid.resume_queued(student_id, assessment_id)?;
        }
    }

    info!(
        student_id,
        assessment_id,
        requests = report.requests,
        "cell committed"
    );
    Ok(report)
}

/// Paste a clipboard column: one bulk create, individual updates and
/// deletes, then a refetch of the column.
pub fn paste_cells<A: MarkbookApi + ?Sized>(
    api: &A,
    grid: &mut ScoreGrid,
    start_student_id: StudentId,
    assessment_id: AssessmentId,
    text: &str,
) -> Result<PasteReport, SyncError> {
    let plan = grid.paste(start_student_id, assessment_id, text)?;
    let mut report = PasteReport {
        unchanged: plan.unchanged,
        skipped: plan.skipped,
        overflow: plan.overflow,
        ..PasteReport::default()
    };
    let mut auth_lost = false;

    if let Some(req) = plan.bulk_create_request() {
        match api.bulk_create_scores(&req) {
            Ok(created) => {
                for t in &plan.creates {
                    let score = created.iter().find(|s| s.student_id == t.student_id).cloned();
                    grid.finish_save(t, Ok(score));
                    report.created += 1;
                }
            }
            Err(e) => {
                auth_lost = matches!(e, ApiError::Unauthorized);
                for t in &plan.creates {
                    grid.finish_save(t, Err(e.to_string()));
                    report.failures.push(SaveFailure {
                        student_id: t.student_id,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    for t in plan.updates.iter().chain(plan.deletes.iter()) {
        if auth_lost {
            grid.finish_save(t, Err(ApiError::Unauthorized.to_string()));
            continue;
        }
        match execute(api, t) {
            Ok(score) => {
                grid.finish_save(t, Ok(score));
                match t.action {
                    SaveAction::Delete { .. } => report.deleted += 1,
                    _ => report.updated += 1,
                }
            }
            Err(e) => {
                auth_lost = matches!(e, ApiError::Unauthorized);
                grid.finish_save(t, Err(e.to_string()));
                report.failures.push(SaveFailure {
                    student_id: t.student_id,
                    error: e.to_string(),
                });
            }
        }
    }

    if auth_lost {
        return Err(ApiError::Unauthorized.into());
    }
    if !report.failures.is_empty() {
        warn!(
            assessment_id,
            failures = report.failures.len(),
            "some pasted cells failed to save"
        );
    }

    refresh_column(api, grid, assessment_id)?;
    info!(
        assessment_id,
        created = report.created,
        updated = report.updated,
        deleted = report.deleted,
        skipped = report.skipped,
        "paste applied"
    );
    Ok(report)
}

/// Name-matched score import. Bad lines and out-of-range scores never
/// leave the client; conflicts come back per row.
pub fn import_scores<A: MarkbookApi + ?Sized>(
    api: &A,
    assessment: &Assessment,
    text: &str,
) -> Result<ScoreImportReport, SyncError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty("Please paste at least one score row").into());
    }
    let parsed = parse_rows(text);
    let mut report = ScoreImportReport {
        skipped: parsed.skipped,
        ..ScoreImportReport::default()
    };

    let total = assessment.total();
    let rows: Vec<ImportRow> = parsed
        .rows
        .into_iter()
        .filter_map(|r| match check_range(r.score, total) {
            Ok(score) => Some(ImportRow {
                student_name: r.student_name,
                score,
            }),
            Err(_) => {
                report.invalid += 1;
                None
            }
        })
        .collect();
    if rows.is_empty() {
        return Err(ValidationError::Empty("No valid score rows to import").into());
    }

    report.submitted = rows.len();
    let resp = api.bulk_import_scores(&BulkImportRequest {
        assessment_id: assessment.id,
        rows,
    })?;
    report.created = resp.created;
    report.updated = resp.updated;
    report.conflicts = resp.conflicts;

    if !report.conflicts.is_empty() {
        warn!(
            assessment_id = assessment.id,
            conflicts = report.conflicts.len(),
            "score import reported conflicts"
        );
    }
    info!(
        assessment_id = assessment.id,
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        invalid = report.invalid,
        "scores imported"
    );
    Ok(report)
}

/// Bulk roster add. The server links rows matching an existing student on
/// (normalized name, grade) and creates the rest.
pub fn import_roster<A: MarkbookApi + ?Sized>(
    api: &A,
    class_id: ClassId,
    text: &str,
    defaults: &RosterDefaults,
) -> Result<RosterImportReport, SyncError> {
    let parsed = roster::parse_roster_text(text, defaults);
    roster::require_rows(text, &parsed)?;

    let current = api.list_students(class_id)?;
    let preview = roster::preview(&parsed.rows, &current);

    let req = BulkStudentsRequest {
        students: parsed.rows.iter().map(|r| r.raw_line.clone()).collect(),
        default_grade: defaults.grade.clone(),
        default_gender: defaults.gender,
    };
    let resp = api.bulk_add_students(class_id, &req)?;

    info!(
        class_id,
        submitted = req.students.len(),
        created = resp.created,
        linked = resp.linked,
        "roster imported"
    );
    Ok(RosterImportReport {
        submitted: req.students.len(),
        skipped: parsed.skipped,
        preview,
        created: resp.created,
        linked: resp.linked,
        students: resp.students,
    })
}
