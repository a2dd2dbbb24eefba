//! Bulk score and roster editing for a markbook front-end.
//!
//! The engine is split so it can be driven without a network: `paste` and
//! `roster` parse clipboard text, `grid` holds per-cell edit state and
//! decides what to send, and `sync` runs those decisions against a
//! [`api::MarkbookApi`]. The `markgridd` binary wraps all of it in a
//! newline-delimited JSON sidecar.

pub mod api;
pub mod config;
pub mod db;
pub mod grid;
pub mod ipc;
pub mod model;
pub mod paste;
pub mod roster;
pub mod session;
pub mod sync;
pub mod telemetry;
pub mod validate;
