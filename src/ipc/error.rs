use serde_json::json;

use crate::grid::GridError;
use crate::sync::SyncError;
use crate::validate::ValidationError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
    /// Set when the API answered 401; the session must be dropped.
    pub unauthorized: bool,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
            unauthorized: false,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ValidationError> for HandlerErr {
    fn from(e: ValidationError) -> Self {
        let reason = e.code();
        HandlerErr::new("validation_failed", e.to_string())
            .with_details(json!({ "reason": reason }))
    }
}

impl From<GridError> for HandlerErr {
    fn from(e: GridError) -> Self {
        match e {
            GridError::Validation(v) => v.into(),
            other => HandlerErr::new(other.code(), other.to_string()),
        }
    }
}

impl From<SyncError> for HandlerErr {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Grid(g) => g.into(),
            SyncError::Validation(v) => v.into(),
            SyncError::Api(a) => {
                let mut out = HandlerErr::new(a.code(), a.to_string());
                if let Some(status) = a.status() {
                    out.details = Some(json!({ "status": status }));
                }
                out.unauthorized = a.status() == Some(401);
                out
            }
        }
    }
}
