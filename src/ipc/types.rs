use std::collections::HashMap;
use std::path::PathBuf;

use reqwest::blocking::Client;
use rusqlite::Connection;
use serde::Deserialize;

use crate::api::{build_client, HttpApi};
use crate::config::Config;
use crate::grid::ScoreGrid;
use crate::ipc::error::HandlerErr;
use crate::session::{self, Session};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Session>,
    pub grids: HashMap<String, ScoreGrid>,
    http: Option<Client>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config,
            workspace: None,
            db: None,
            session: None,
            grids: HashMap::new(),
            http: None,
        }
    }

    /// API capability for the current session.
    pub fn api(&mut self) -> Result<HttpApi, HandlerErr> {
        let Some(session) = self.session.as_ref() else {
            return Err(HandlerErr::new("no_session", "set a session token first"));
        };
        let client = match &self.http {
            Some(c) => c.clone(),
            None => {
                let c = build_client(self.config.http_timeout)
                    .map_err(|e| HandlerErr::new(e.code(), e.to_string()))?;
                self.http = Some(c.clone());
                c
            }
        };
        Ok(HttpApi::with_client(client, &session.base_url, &session.token))
    }

    /// 401 from the API: drop the token here and in the workspace store.
    /// Redirecting to a login screen is the front-end's job.
    pub fn clear_session(&mut self) {
        self.session = None;
        if let Some(conn) = self.db.as_ref() {
            if let Err(e) = session::forget(conn) {
                tracing::warn!(error = %e, "failed to forget persisted session");
            }
        }
    }
}
