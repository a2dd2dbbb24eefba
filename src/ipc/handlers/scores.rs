use crate::api::MarkbookApi;
use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::respond;
use crate::ipc::params::{req_i64, req_str};
use crate::ipc::types::{AppState, Request};
use crate::paste::parse_rows;
use crate::sync;
use crate::validate::ValidationError;
use serde_json::json;

fn handle_parse_preview(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let text = req_str(&req.params, "text")?;
    let parsed = parse_rows(text);
    Ok(json!({
        "rows": parsed.rows,
        "skipped": parsed.skipped,
    }))
}

fn handle_bulk_import(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let assessment_id = req_i64(&req.params, "assessmentId")?;
    let text = req_str(&req.params, "text")?;
    if text.trim().is_empty() {
        return Err(ValidationError::Empty("Please paste at least one score row").into());
    }
    if parse_rows(text).rows.is_empty() {
        return Err(ValidationError::Empty("No valid score rows to import").into());
    }
    let api = state.api()?;
    let assessment = api
        .get_assessment(assessment_id)
        .map_err(|e| HandlerErr::from(sync::SyncError::from(e)))?;
    let report = sync::import_scores(&api, &assessment, text)?;

    // Open grids showing this assessment are now stale.
    for grid in state.grids.values_mut() {
        if grid.assessment(assessment_id).is_ok() {
            if let Err(e) = sync::refresh_column(&api, grid, assessment_id) {
                tracing::warn!(assessment_id, error = %e, "grid refresh after import failed");
            }
        }
    }

    Ok(json!({ "import": report }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "scores.parsePreview" => handle_parse_preview(req),
        "scores.bulkImport" => handle_bulk_import(state, req),
        _ => return None,
    };
    Some(respond(state, &req.id, result))
}
