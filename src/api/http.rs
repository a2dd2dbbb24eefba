use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{
    ApiError, BulkImportRequest, BulkImportResponse, BulkScoresRequest, BulkStudentsRequest,
    BulkStudentsResponse, MarkbookApi, ScoreUpdate,
};
use crate::model::{
    Assessment, AssessmentId, ClassId, Score, ScoreId, Student, StudentId, StudentScoreView,
};

/// Blocking JSON client for one API base URL and bearer token.
pub struct HttpApi {
    client: Client,
    base_url: String,
    token: String,
}

/// `POST /assessments/scores/bulk` answers either a bare array or `{scores}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CreatedScores {
    Bare(Vec<Score>),
    Wrapped { scores: Vec<Score> },
}

pub fn build_client(timeout: Duration) -> Result<Client, ApiError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ApiError::Network(e.to_string()))
}

impl HttpApi {
    pub fn with_client(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let response = req.bearer_auth(&self.token).send()?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("API rejected bearer token");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn parse<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(req)?;
        response
            .json::<T>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl MarkbookApi for HttpApi {
    fn list_students(&self, class_id: ClassId) -> Result<Vec<Student>, ApiError> {
        self.parse(
            self.client
                .get(self.url(&format!("/classes/{class_id}/students"))),
        )
    }

    fn add_student(&self, class_id: ClassId, student_id: StudentId) -> Result<(), ApiError> {
        self.send(
            self.client
                .post(self.url(&format!("/classes/{class_id}/students")))
                .json(&json!({ "student_id": student_id })),
        )?;
        Ok(())
    }

    fn bulk_add_students(
        &self,
        class_id: ClassId,
        req: &BulkStudentsRequest,
    ) -> Result<BulkStudentsResponse, ApiError> {
        self.parse(
            self.client
                .post(self.url(&format!("/classes/{class_id}/students/bulk")))
                .json(req),
        )
    }

    fn list_assessments(&self, class_id: ClassId) -> Result<Vec<Assessment>, ApiError> {
        self.parse(
            self.client
                .get(self.url(&format!("/classes/{class_id}/assessments"))),
        )
    }

    fn get_assessment(&self, assessment_id: AssessmentId) -> Result<Assessment, ApiError> {
        self.parse(
            self.client
                .get(self.url(&format!("/assessments/{assessment_id}"))),
        )
    }

    fn students_with_scores(
        &self,
        assessment_id: AssessmentId,
        class_id: ClassId,
    ) -> Result<Vec<StudentScoreView>, ApiError> {
        self.parse(
            self.client
                .get(self.url(&format!(
                    "/assessments/{assessment_id}/students-with-scores"
                )))
                .query(&[("class_id", class_id)]),
        )
    }

    fn bulk_create_scores(&self, req: &BulkScoresRequest) -> Result<Vec<Score>, ApiError> {
        let created: CreatedScores = self.parse(
            self.client
                .post(self.url("/assessments/scores/bulk"))
                .json(req),
        )?;
        Ok(match created {
            CreatedScores::Bare(v) => v,
            CreatedScores::Wrapped { scores } => scores,
        })
    }

    fn bulk_import_scores(&self, req: &BulkImportRequest) -> Result<BulkImportResponse, ApiError> {
        self.parse(
            self.client
                .post(self.url("/assessments/scores/bulk-import"))
                .json(req),
        )
    }

    fn update_score(&self, score_id: ScoreId, update: &ScoreUpdate) -> Result<Score, ApiError> {
        self.parse(
            self.client
                .put(self.url(&format!("/assessments/scores/{score_id}")))
                .json(update),
        )
    }

    fn delete_score(&self, score_id: ScoreId) -> Result<(), ApiError> {
        self.send(
            self.client
                .delete(self.url(&format!("/assessments/scores/{score_id}"))),
        )?;
        Ok(())
    }
}
