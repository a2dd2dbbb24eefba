//! The REST contract the engine consumes.
//!
//! The engine never reaches for credentials itself; it is handed something
//! implementing [`MarkbookApi`].

mod error;
mod http;

pub use error::ApiError;
pub use http::{build_client, HttpApi};

use serde::{Deserialize, Serialize};

use crate::model::{
    Assessment, AssessmentId, ClassId, Gender, Score, ScoreId, Student, StudentId,
    StudentScoreView,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewScore {
    pub student_id: StudentId,
    pub score: f64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkScoresRequest {
    pub assessment_id: AssessmentId,
    pub scores: Vec<NewScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreUpdate {
    pub score: f64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRow {
    pub student_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkImportRequest {
    pub assessment_id: AssessmentId,
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConflict {
    pub student_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkImportResponse {
    #[serde(default)]
    pub created: usize,
    #[serde(default)]
    pub updated: usize,
    #[serde(default)]
    pub conflicts: Vec<ImportConflict>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkStudentsRequest {
    pub students: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_gender: Option<Gender>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkStudentsResponse {
    #[serde(default)]
    pub created: usize,
    #[serde(default)]
    pub linked: usize,
    #[serde(default)]
    pub students: Vec<Student>,
}

pub trait MarkbookApi {
    fn list_students(&self, class_id: ClassId) -> Result<Vec<Student>, ApiError>;

    fn add_student(&self, class_id: ClassId, student_id: StudentId) -> Result<(), ApiError>;

    /// Server matches on (normalized full name, grade); a match is linked,
    /// anything else is created and then linked.
    fn bulk_add_students(
        &self,
        class_id: ClassId,
        req: &BulkStudentsRequest,
    ) -> Result<BulkStudentsResponse, ApiError>;

    fn list_assessments(&self, class_id: ClassId) -> Result<Vec<Assessment>, ApiError>;

    fn get_assessment(&self, assessment_id: AssessmentId) -> Result<Assessment, ApiError>;

    fn students_with_scores(
        &self,
        assessment_id: AssessmentId,
        class_id: ClassId,
    ) -> Result<Vec<StudentScoreView>, ApiError>;

    /// Create-only.
    fn bulk_create_scores(&self, req: &BulkScoresRequest) -> Result<Vec<Score>, ApiError>;

    fn bulk_import_scores(&self, req: &BulkImportRequest) -> Result<BulkImportResponse, ApiError>;

    fn update_score(&self, score_id: ScoreId, update: &ScoreUpdate) -> Result<Score, ApiError>;

    fn delete_score(&self, score_id: ScoreId) -> Result<(), ApiError>;
}
