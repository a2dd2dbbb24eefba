use crate::api::MarkbookApi;
use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::respond;
use crate::ipc::params::{opt_str, req_i64, req_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Gender;
use crate::roster::{self, RosterDefaults};
use crate::sync::{self, SyncError};
use serde_json::json;

fn defaults_from(params: &serde_json::Value) -> Result<RosterDefaults, HandlerErr> {
    let gender = match opt_str(params, "defaultGender") {
        Some(raw) => match Gender::parse_loose(raw) {
            Some(g) => Some(g),
            None => {
                return Err(HandlerErr::bad_params("defaultGender must be Male or Female")
                    .with_details(json!({ "defaultGender": raw })))
            }
        },
        None => None,
    };
    Ok(RosterDefaults {
        grade: opt_str(params, "defaultGrade").map(str::to_string),
        gender,
    })
}

fn api_err(e: crate::api::ApiError) -> HandlerErr {
    HandlerErr::from(SyncError::from(e))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = req_i64(&req.params, "classId")?;
    let api = state.api()?;
    let students = api.list_students(class_id).map_err(api_err)?;
    Ok(json!({ "students": students }))
}

fn handle_students_add(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = req_i64(&req.params, "classId")?;
    let student_id = req_i64(&req.params, "studentId")?;
    let api = state.api()?;
    api.add_student(class_id, student_id).map_err(api_err)?;
    Ok(json!({ "classId": class_id, "studentId": student_id }))
}

fn handle_parse_preview(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let text = req_str(&req.params, "text")?;
    let defaults = defaults_from(&req.params)?;
    let parsed = roster::parse_roster_text(text, &defaults);
    let preview = roster::preview(&parsed.rows, &[]);
    Ok(json!({
        "rows": parsed.rows,
        "skipped": parsed.skipped,
        "duplicates": preview.duplicate_count,
    }))
}

fn handle_bulk_add(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = req_i64(&req.params, "classId")?;
    let text = req.params.get("text").and_then(|v| v.as_str()).unwrap_or("");
    let defaults = defaults_from(&req.params)?;
    // Empty input is rejected before a session is even required.
    roster::require_rows(text, &roster::parse_roster_text(text, &defaults))?;
    let api = state.api()?;
    let report = sync::import_roster(&api, class_id, text, &defaults)?;

    for grid in state.grids.values_mut() {
        if grid.class_id() == class_id {
            if let Err(e) = sync::refresh(&api, grid, None) {
                tracing::warn!(class_id, error = %e, "grid refresh after roster import failed");
            }
        }
    }

    Ok(json!({ "import": report }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_students_list(state, req),
        "students.add" => handle_students_add(state, req),
        "students.parsePreview" => handle_parse_preview(req),
        "students.bulkAdd" => handle_bulk_add(state, req),
        _ => return None,
    };
    Some(respond(state, &req.id, result))
}
