use serde::Serialize;
use std::cmp::Ordering;

use super::cell::CellStatus;
use crate::model::{Assessment, AssessmentId, ClassId, ScoreId, Student, StudentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Name,
    Score(AssessmentId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSort {
    pub by: SortBy,
    pub descending: bool,
}

/// Last name, then first name, case-insensitive.
pub fn cmp_names(a: &Student, b: &Student) -> Ordering {
    a.last_name
        .to_lowercase()
        .cmp(&b.last_name.to_lowercase())
        .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
}

/// Unscored rows sort after scored ones in either direction.
pub fn cmp_scores(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let o = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if descending {
                o.reverse()
            } else {
                o
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub assessment_id: AssessmentId,
    pub scored: usize,
    pub unscored: usize,
    pub average: Option<f64>,
    pub average_percent: Option<f64>,
}

pub fn summarize<I>(assessment: &Assessment, scores: I) -> ColumnSummary
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut scored: usize = 0;
    let mut unscored: usize = 0;
    let mut sum: f64 = 0.0;
    for s in scores {
        match s {
            Some(v) => {
                scored += 1;
                sum += v;
            }
            None => unscored += 1,
        }
    }
    let average = (scored > 0).then(|| sum / scored as f64);
    ColumnSummary {
        assessment_id: assessment.id,
        scored,
        unscored,
        average,
        average_percent: average.and_then(|a| assessment.percentage(a)),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub assessment_id: AssessmentId,
    pub value: String,
    pub score_id: Option<ScoreId>,
    pub server_score: Option<f64>,
    pub comment: Option<String>,
    pub percent: Option<f64>,
    pub status: CellStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    pub student_id: StudentId,
    pub name: String,
    pub grade: String,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub class_id: ClassId,
    pub assessments: Vec<Assessment>,
    pub rows: Vec<RowView>,
    pub summaries: Vec<ColumnSummary>,
    pub hidden_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssessmentType;
    use chrono::NaiveDate;

    #[test]
    fn summary_ignores_unscored() {
        let a = Assessment {
            id: 1,
            title: "Quiz".into(),
            kind: AssessmentType::Quiz,
            total_marks: 20,
            date_assigned: NaiveDate::from_ymd_opt(2026, 9, 1).expect("date"),
            date_due: None,
        };
        let s = summarize(&a, vec![Some(10.0), None, Some(20.0)]);
        assert_eq!(s.scored, 2);
        assert_eq!(s.unscored, 1);
        assert_eq!(s.average, Some(15.0));
        assert_eq!(s.average_percent, Some(75.0));
    }

    #[test]
    fn unscored_last_both_directions() {
        assert_eq!(cmp_scores(None, Some(1.0), false), Ordering::Greater);
        assert_eq!(cmp_scores(None, Some(1.0), true), Ordering::Greater);
        assert_eq!(cmp_scores(Some(2.0), Some(1.0), true), Ordering::Less);
    }
}
