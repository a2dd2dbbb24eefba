//! Freeform roster text → student rows.
//!
//! One student per line: `Full Name[, gender-or-grade[, grade]]`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{Gender, Student};
use crate::paste::{tokenize_lines, BlankLines, Line, Parsed};
use crate::validate::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterDefaults {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub raw_line: String,
    pub raw_name: String,
    pub first_name: String,
    pub last_name: String,
    pub grade: Option<String>,
    pub gender: Option<Gender>,
}

impl RosterRow {
    pub fn match_key(&self) -> (String, String) {
        match_key(&self.raw_name, self.grade.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowMatch {
    New,
    Existing,
    DuplicateInBatch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPreview {
    pub statuses: Vec<RowMatch>,
    pub new_count: usize,
    pub existing_count: usize,
    pub duplicate_count: usize,
}

/// Lowercased with whitespace runs collapsed.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Two students are the same person when normalized name and grade agree.
pub fn match_key(full_name: &str, grade: &str) -> (String, String) {
    (normalize_name(full_name), grade.trim().to_lowercase())
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

pub fn parse_roster_line(line: &str, defaults: &RosterDefaults) -> Option<RosterRow> {
    let mut tokens = line.split(',');
    let raw_name = tokens
        .next()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    if raw_name.is_empty() {
        return None;
    }
    let (first_name, last_name) = match raw_name.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (raw_name.clone(), String::new()),
    };

    let mut grade: Option<String> = None;
    let mut gender: Option<Gender> = None;
    if let Some(second) = tokens.next() {
        match Gender::parse_loose(second) {
            Some(g) => gender = Some(g),
            None => grade = non_empty(second),
        }
    }
    if let Some(third) = tokens.next() {
        if let Some(g) = non_empty(third) {
            grade = Some(g);
        }
    }

    Some(RosterRow {
        raw_line: line.trim().to_string(),
        raw_name,
        first_name,
        last_name,
        grade: grade.or_else(|| defaults.grade.as_deref().and_then(non_empty)),
        gender: gender.or(defaults.gender),
    })
}

pub fn parse_roster_text(text: &str, defaults: &RosterDefaults) -> Parsed<RosterRow> {
    let mut parsed = Parsed::default();
    for line in tokenize_lines(text, BlankLines::Drop) {
        let Line::Text(t) = line else {
            continue;
        };
        match parse_roster_line(t, defaults) {
            Some(row) => parsed.rows.push(row),
            None => parsed.skipped += 1,
        }
    }
    parsed
}

/// Rejects input that would send an empty bulk request.
pub fn require_rows(text: &str, parsed: &Parsed<RosterRow>) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty("Please enter student names"));
    }
    if parsed.rows.is_empty() {
        return Err(ValidationError::Empty(
            "Please enter at least one student name",
        ));
    }
    Ok(())
}

/// Classifies rows the way the server's matching policy will treat them.
pub fn preview(rows: &[RosterRow], roster: &[Student]) -> RosterPreview {
    let existing: HashSet<(String, String)> = roster
        .iter()
        .map(|s| match_key(&s.full_name(), &s.grade))
        .collect();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = RosterPreview::default();

    for row in rows {
        let key = row.match_key();
        let status = if !seen.insert(key.clone()) {
            out.duplicate_count += 1;
            RowMatch::DuplicateInBatch
        } else if existing.contains(&key) {
            out.existing_count += 1;
            RowMatch::Existing
        } else {
            out.new_count += 1;
            RowMatch::New
        };
        out.statuses.push(status);
    }
    out
}
