use crate::grid::{GridSort, ScoreGrid, SortBy};
use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::respond;
use crate::ipc::params::{opt_i64_list, opt_str, req_i64, req_str};
use crate::ipc::types::{AppState, Request};
use crate::sync;
use serde_json::json;
use uuid::Uuid;

const GRID_OPEN_MAX_ASSESSMENTS: usize = 64;
const GRID_PASTE_MAX_LINES: usize = 2000;

fn grid_id(req: &Request) -> Result<String, HandlerErr> {
    req_str(&req.params, "gridId").map(str::to_string)
}

fn grid_mut<'a>(state: &'a mut AppState, id: &str) -> Result<&'a mut ScoreGrid, HandlerErr> {
    state
        .grids
        .get_mut(id)
        .ok_or_else(|| HandlerErr::new("not_found", "grid not found").with_details(json!({ "gridId": id })))
}

fn cell_target(req: &Request) -> Result<(String, i64, i64), HandlerErr> {
    Ok((
        grid_id(req)?,
        req_i64(&req.params, "studentId")?,
        req_i64(&req.params, "assessmentId")?,
    ))
}

fn cell_json(grid: &ScoreGrid, student_id: i64, assessment_id: i64) -> serde_json::Value {
    match grid.cell(student_id, assessment_id) {
        Some(c) => json!({
            "studentId": student_id,
            "assessmentId": assessment_id,
            "value": c.input(),
            "scoreId": c.server().map(|s| s.id),
            "status": c.status(),
            "error": c.error(),
        }),
        None => json!({
            "studentId": student_id,
            "assessmentId": assessment_id,
            "value": "",
            "scoreId": null,
            "status": "synced",
            "error": null,
        }),
    }
}

fn handle_grid_open(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = req_i64(&req.params, "classId")?;
    let assessment_ids = opt_i64_list(&req.params, "assessmentIds")?;
    if let Some(ids) = &assessment_ids {
        if ids.len() > GRID_OPEN_MAX_ASSESSMENTS {
            return Err(HandlerErr::bad_params("too many assessments requested").with_details(
                json!({ "requested": ids.len(), "max": GRID_OPEN_MAX_ASSESSMENTS }),
            ));
        }
    }

    let api = state.api()?;
    let grid = sync::open_grid(&api, class_id, assessment_ids.as_deref())?;
    let view = grid.view();
    let id = Uuid::new_v4().to_string();
    state.grids.insert(id.clone(), grid);
    Ok(json!({ "gridId": id, "grid": view }))
}

fn handle_grid_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let id = grid_id(req)?;
    let grid = grid_mut(state, &id)?;
    Ok(json!({ "grid": grid.view() }))
}

fn handle_grid_input(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (id, student_id, assessment_id) = cell_target(req)?;
    let value = req
        .params
        .get("value")
        .map(|v| match v {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();
    let grid = grid_mut(state, &id)?;
    grid.input(student_id, assessment_id, &value)?;
    Ok(json!({ "cell": cell_json(grid, student_id, assessment_id) }))
}

fn handle_grid_comment(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (id, student_id, assessment_id) = cell_target(req)?;
    let comment = req
        .params
        .get("comment")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let grid = grid_mut(state, &id)?;
    grid.comment_input(student_id, assessment_id, comment)?;
    Ok(json!({ "cell": cell_json(grid, student_id, assessment_id) }))
}

fn handle_grid_commit(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (id, student_id, assessment_id) = cell_target(req)?;
    let api = state.api()?;
    let grid = grid_mut(state, &id)?;
    match sync::commit_cell(&api, grid, student_id, assessment_id) {
        Ok(report) => Ok(json!({
            "commit": report,
            "cell": cell_json(grid, student_id, assessment_id),
        })),
        Err(e) => {
            let cell = cell_json(grid, student_id, assessment_id);
            let mut he = HandlerErr::from(e);
            let mut details = he.details.take().unwrap_or_else(|| json!({}));
            details["cell"] = cell;
            Err(he.with_details(details))
        }
    }
}

fn handle_grid_paste(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (id, student_id, assessment_id) = cell_target(req)?;
    let text = req_str(&req.params, "text")?;
    let lines = text.lines().count();
    if lines > GRID_PASTE_MAX_LINES {
        return Err(HandlerErr::bad_params("paste is too large")
            .with_details(json!({ "lines": lines, "max": GRID_PASTE_MAX_LINES })));
    }
    let api = state.api()?;
    let grid = grid_mut(state, &id)?;
    let report = sync::paste_cells(&api, grid, student_id, assessment_id, text)?;
    Ok(json!({ "paste": report, "grid": grid.view() }))
}

fn handle_grid_refresh(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let id = grid_id(req)?;
    let assessment_id = req.params.get("assessmentId").and_then(|v| v.as_i64());
    let api = state.api()?;
    let grid = grid_mut(state, &id)?;
    sync::refresh(&api, grid, assessment_id)?;
    Ok(json!({ "grid": grid.view() }))
}

fn handle_grid_sort(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let id = grid_id(req)?;
    let descending = req
        .params
        .get("descending")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let sort = match opt_str(&req.params, "by") {
        None | Some("none") => None,
        Some("name") => Some(GridSort {
            by: SortBy::Name,
            descending,
        }),
        Some("score") => Some(GridSort {
            by: SortBy::Score(req_i64(&req.params, "assessmentId")?),
            descending,
        }),
        Some(other) => {
            return Err(HandlerErr::bad_params("by must be one of: name, score, none")
                .with_details(json!({ "by": other })))
        }
    };
    let grid = grid_mut(state, &id)?;
    grid.set_sort(sort)?;
    Ok(json!({ "order": grid.visible_order() }))
}

fn handle_grid_filter(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let id = grid_id(req)?;
    let query = opt_str(&req.params, "query").map(str::to_string);
    let grid = grid_mut(state, &id)?;
    grid.set_filter(query.as_deref());
    Ok(json!({ "order": grid.visible_order() }))
}

fn handle_grid_close(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let id = grid_id(req)?;
    let Some(mut grid) = state.grids.remove(&id) else {
        return Err(HandlerErr::new("not_found", "grid not found"));
    };
    grid.close();
    Ok(json!({ "closed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grid.open" => handle_grid_open(state, req),
        "grid.get" => handle_grid_get(state, req),
        "grid.input" => handle_grid_input(state, req),
        "grid.comment" => handle_grid_comment(state, req),
        "grid.commit" => handle_grid_commit(state, req),
        "grid.paste" => handle_grid_paste(state, req),
        "grid.refresh" => handle_grid_refresh(state, req),
        "grid.sort" => handle_grid_sort(state, req),
        "grid.filter" => handle_grid_filter(state, req),
        "grid.close" => handle_grid_close(state, req),
        _ => return None,
    };
    Some(respond(state, &req.id, result))
}
