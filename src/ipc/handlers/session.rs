use crate::ipc::error::{err, ok};
use crate::ipc::params::opt_str;
use crate::ipc::types::{AppState, Request};
use crate::session::{self, Session};
use serde_json::json;

fn handle_session_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(token) = opt_str(&req.params, "token") else {
        return err(&req.id, "bad_params", "missing token", None);
    };
    let base_url = opt_str(&req.params, "baseUrl")
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|| state.config.api_base_url.clone());
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return err(
            &req.id,
            "bad_params",
            "baseUrl must be an http(s) URL",
            Some(json!({ "baseUrl": base_url })),
        );
    }

    let s = Session::new(base_url.clone(), token);
    let mut persisted = false;
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = session::save(conn, &s) {
            return err(&req.id, "db_query_failed", e.to_string(), None);
        }
        persisted = true;
    }
    state.session = Some(s);
    ok(
        &req.id,
        json!({ "baseUrl": base_url, "persisted": persisted }),
    )
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "active": state.session.is_some(),
            "baseUrl": state.session.as_ref().map(|s| s.base_url.clone()),
        }),
    )
}

fn handle_session_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.clear_session();
    ok(&req.id, json!({ "active": false }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.set" => Some(handle_session_set(state, req)),
        "session.get" => Some(handle_session_get(state, req)),
        "session.clear" => Some(handle_session_clear(state, req)),
        _ => None,
    }
}
