pub mod core;
pub mod grid;
pub mod scores;
pub mod session;
pub mod students;

use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::AppState;

/// Shapes a handler result into a response, dropping the session on 401.
pub(crate) fn respond(
    state: &mut AppState,
    id: &str,
    result: Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => {
            if e.unauthorized {
                tracing::warn!("session cleared after 401");
                state.clear_session();
            }
            e.response(id)
        }
    }
}
