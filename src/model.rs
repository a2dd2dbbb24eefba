use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type ClassId = i64;
pub type StudentId = i64;
pub type AssessmentId = i64;
pub type ScoreId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentType {
    Quiz,
    Homework,
    Project,
    Test,
    Exam,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: AssessmentType,
    pub total_marks: u32,
    pub date_assigned: NaiveDate,
    #[serde(default)]
    pub date_due: Option<NaiveDate>,
}

impl Assessment {
    pub fn total(&self) -> f64 {
        f64::from(self.total_marks)
    }

    /// Display-only percentage; never written back.
    pub fn percentage(&self, score: f64) -> Option<f64> {
        if self.total_marks == 0 {
            return None;
        }
        Some(score / self.total() * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Accepts `M`, `Male`, `F`, `Female` in any case.
    pub fn parse_loose(raw: &str) -> Option<Gender> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Some(Gender::Male),
            "f" | "female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub parent_contact: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        let first = self.first_name.trim();
        let last = self.last_name.trim();
        if last.is_empty() {
            first.to_string()
        } else {
            format!("{first} {last}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: ScoreId,
    pub student_id: StudentId,
    pub assessment_id: AssessmentId,
    pub score: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// One row of `GET /assessments/{id}/students-with-scores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentScoreView {
    pub student_id: StudentId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub score_id: Option<ScoreId>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl StudentScoreView {
    pub fn persisted(&self, assessment_id: AssessmentId) -> Option<Score> {
        match (self.score_id, self.score) {
            (Some(id), Some(score)) => Some(Score {
                id,
                student_id: self.student_id,
                assessment_id,
                score,
                comment: self.comment.clone(),
            }),
            _ => None,
        }
    }
}
