//! Explicit session context: which API to talk to and with which token.
//! Persisted in the workspace settings store when one is open.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db;

const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub base_url: String,
    pub token: String,
}

impl Session {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Session {
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

pub fn load(conn: &Connection) -> anyhow::Result<Option<Session>> {
    match db::settings_get_json(conn, SESSION_KEY)? {
        Some(v) => Ok(serde_json::from_value(v).ok()),
        None => Ok(None),
    }
}

pub fn save(conn: &Connection, session: &Session) -> anyhow::Result<()> {
    db::settings_set_json(conn, SESSION_KEY, &serde_json::to_value(session)?)
}

pub fn forget(conn: &Connection) -> anyhow::Result<()> {
    db::settings_delete(conn, SESSION_KEY)
}
