#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use chrono::NaiveDate;
use markgridd::api::{
    ApiError, BulkImportRequest, BulkImportResponse, BulkScoresRequest, BulkStudentsRequest,
    BulkStudentsResponse, ImportConflict, MarkbookApi, ScoreUpdate,
};
use markgridd::model::{
    Assessment, AssessmentId, AssessmentType, ClassId, Score, ScoreId, Student, StudentId,
    StudentScoreView,
};
use markgridd::roster::{match_key, normalize_name, parse_roster_line, RosterDefaults};

#[derive(Default)]
struct Store {
    students: Vec<Student>,
    rosters: HashMap<ClassId, Vec<StudentId>>,
    assessments: Vec<(ClassId, Assessment)>,
    scores: Vec<Score>,
    next_id: i64,
}

impl Store {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn roster(&self, class_id: ClassId) -> Vec<Student> {
        let ids = self.rosters.get(&class_id).cloned().unwrap_or_default();
        ids.iter()
            .filter_map(|id| self.students.iter().find(|s| s.id == *id).cloned())
            .collect()
    }

    fn link(&mut self, class_id: ClassId, student_id: StudentId) {
        let roster = self.rosters.entry(class_id).or_default();
        if !roster.contains(&student_id) {
            roster.push(student_id);
        }
    }

    fn class_of(&self, assessment_id: AssessmentId) -> Option<ClassId> {
        self.assessments
            .iter()
            .find(|(_, a)| a.id == assessment_id)
            .map(|(c, _)| *c)
    }

    fn score_for(&self, student_id: StudentId, assessment_id: AssessmentId) -> Option<&Score> {
        self.scores
            .iter()
            .find(|s| s.student_id == student_id && s.assessment_id == assessment_id)
    }
}

/// In-memory stand-in for the REST API.
///
/// Enforces one score per (student, assessment): a create for a scored pair
/// is a 409, the way the real endpoint answers.
#[derive(Default)]
pub struct FakeApi {
    store: RefCell<Store>,
    pub calls: RefCell<Vec<String>>,
    pub fail_updates: Cell<bool>,
    pub fail_creates: Cell<bool>,
    /// Bulk create persists but answers `[]`.
    pub silent_creates: Cell<bool>,
    /// Bulk create persists but the body does not decode.
    pub garbled_creates: Cell<bool>,
    pub revoked: Cell<bool>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&self, class_id: ClassId, first: &str, last: &str, grade: &str) -> StudentId {
        let mut st = self.store.borrow_mut();
        let id = st.id();
        st.students.push(Student {
            id,
            first_name: first.into(),
            last_name: last.into(),
            grade: grade.into(),
            gender: None,
            parent_contact: None,
        });
        st.link(class_id, id);
        id
    }

    pub fn add_assessment(&self, class_id: ClassId, title: &str, total_marks: u32) -> AssessmentId {
        let mut st = self.store.borrow_mut();
        let id = st.id();
        st.assessments.push((
            class_id,
            Assessment {
                id,
                title: title.into(),
                kind: AssessmentType::Test,
                total_marks,
                date_assigned: NaiveDate::from_ymd_opt(2026, 10, 1).expect("date"),
                date_due: None,
            },
        ));
        id
    }

    pub fn seed_score(&self, student_id: StudentId, assessment_id: AssessmentId, score: f64) -> ScoreId {
        let mut st = self.store.borrow_mut();
        let id = st.id();
        st.scores.push(Score {
            id,
            student_id,
            assessment_id,
            score,
            comment: None,
        });
        id
    }

    pub fn scores_for(&self, assessment_id: AssessmentId) -> Vec<Score> {
        self.store
            .borrow()
            .scores
            .iter()
            .filter(|s| s.assessment_id == assessment_id)
            .cloned()
            .collect()
    }

    pub fn score_of(&self, student_id: StudentId, assessment_id: AssessmentId) -> Option<f64> {
        self.store
            .borrow()
            .score_for(student_id, assessment_id)
            .map(|s| s.score)
    }

    pub fn all_students(&self) -> Vec<Student> {
        self.store.borrow().students.clone()
    }

    pub fn roster(&self, class_id: ClassId) -> Vec<Student> {
        self.store.borrow().roster(class_id)
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn mutating_calls(&self) -> usize {
        self.count_calls("bulk_create")
            + self.count_calls("update")
            + self.count_calls("delete")
            + self.count_calls("bulk_import")
            + self.count_calls("bulk_add")
    }

    fn record(&self, call: impl Into<String>) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(call.into());
        if self.revoked.get() {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }
}

impl MarkbookApi for FakeApi {
    fn list_students(&self, class_id: ClassId) -> Result<Vec<Student>, ApiError> {
        self.record("list_students")?;
        Ok(self.store.borrow().roster(class_id))
    }

    fn add_student(&self, class_id: ClassId, student_id: StudentId) -> Result<(), ApiError> {
        self.record("add_student")?;
        let mut st = self.store.borrow_mut();
        if !st.students.iter().any(|s| s.id == student_id) {
            return Err(ApiError::Http {
                status: 404,
                body: "student not found".into(),
            });
        }
        st.link(class_id, student_id);
        Ok(())
    }

    fn bulk_add_students(
        &self,
        class_id: ClassId,
        req: &BulkStudentsRequest,
    ) -> Result<BulkStudentsResponse, ApiError> {
        self.record("bulk_add")?;
        let defaults = RosterDefaults {
            grade: req.default_grade.clone(),
            gender: req.default_gender,
        };
        let mut st = self.store.borrow_mut();
        let mut resp = BulkStudentsResponse::default();
        for line in &req.students {
            let Some(row) = parse_roster_line(line, &defaults) else {
                continue;
            };
            let key = row.match_key();
            let existing = st
                .students
                .iter()
                .find(|s| match_key(&s.full_name(), &s.grade) == key)
                .cloned();
            let student = match existing {
                Some(s) => {
                    resp.linked += 1;
                    s
                }
                None => {
                    let id = st.id();
                    let s = Student {
                        id,
                        first_name: row.first_name.clone(),
                        last_name: row.last_name.clone(),
                        grade: row.grade.clone().unwrap_or_default(),
                        gender: row.gender,
                        parent_contact: None,
                    };
                    st.students.push(s.clone());
                    resp.created += 1;
                    s
                }
            };
            st.link(class_id, student.id);
            resp.students.push(student);
        }
        Ok(resp)
    }

    fn list_assessments(&self, class_id: ClassId) -> Result<Vec<Assessment>, ApiError> {
        self.record("list_assessments")?;
        Ok(self
            .store
            .borrow()
            .assessments
            .iter()
            .filter(|(c, _)| *c == class_id)
            .map(|(_, a)| a.clone())
            .collect())
    }

    fn get_assessment(&self, assessment_id: AssessmentId) -> Result<Assessment, ApiError> {
        self.record("get_assessment")?;
        self.store
            .borrow()
            .assessments
            .iter()
            .find(|(_, a)| a.id == assessment_id)
            .map(|(_, a)| a.clone())
            .ok_or(ApiError::Http {
                status: 404,
                body: "assessment not found".into(),
            })
    }

    fn students_with_scores(
        &self,
        assessment_id: AssessmentId,
        class_id: ClassId,
    ) -> Result<Vec<StudentScoreView>, ApiError> {
        self.record("students_with_scores")?;
        let st = self.store.borrow();
        Ok(st
            .roster(class_id)
            .into_iter()
            .map(|s| {
                let score = st.score_for(s.id, assessment_id);
                StudentScoreView {
                    student_id: s.id,
                    first_name: s.first_name.clone(),
                    last_name: s.last_name.clone(),
                    score_id: score.map(|x| x.id),
                    score: score.map(|x| x.score),
                    comment: score.and_then(|x| x.comment.clone()),
                }
            })
            .collect())
    }

    fn bulk_create_scores(&self, req: &BulkScoresRequest) -> Result<Vec<Score>, ApiError> {
        self.record(format!("bulk_create:{}", req.scores.len()))?;
        if self.fail_creates.get() {
            return Err(ApiError::Http {
                status: 500,
                body: "create failed".into(),
            });
        }
        let mut st = self.store.borrow_mut();
        for row in &req.scores {
            if st.score_for(row.student_id, req.assessment_id).is_some() {
                return Err(ApiError::Http {
                    status: 409,
                    body: format!("student {} already scored", row.student_id),
                });
            }
        }
        let mut created = Vec::new();
        for row in &req.scores {
            let id = st.id();
            let score = Score {
                id,
                student_id: row.student_id,
                assessment_id: req.assessment_id,
                score: row.score,
                comment: row.comment.clone(),
            };
            st.scores.push(score.clone());
            created.push(score);
        }
        if self.garbled_creates.get() {
            return Err(ApiError::Decode("expected a list of scores".into()));
        }
        if self.silent_creates.get() {
            return Ok(Vec::new());
        }
        Ok(created)
    }

    fn bulk_import_scores(&self, req: &BulkImportRequest) -> Result<BulkImportResponse, ApiError> {
        self.record("bulk_import")?;
        let mut st = self.store.borrow_mut();
        let Some(class_id) = st.class_of(req.assessment_id) else {
            return Err(ApiError::Http {
                status: 404,
                body: "assessment not found".into(),
            });
        };
        let roster = st.roster(class_id);
        let mut resp = BulkImportResponse::default();
        for row in &req.rows {
            let wanted = normalize_name(&row.student_name);
            let matches: Vec<&Student> = roster
                .iter()
                .filter(|s| normalize_name(&s.full_name()) == wanted)
                .collect();
            let student_id = match matches.as_slice() {
                [one] => one.id,
                [] => {
                    resp.conflicts.push(ImportConflict {
                        student_name: row.student_name.clone(),
                        error: "no matching student".into(),
                    });
                    continue;
                }
                _ => {
                    resp.conflicts.push(ImportConflict {
                        student_name: row.student_name.clone(),
                        error: "ambiguous student name".into(),
                    });
                    continue;
                }
            };
            let existing = st
                .scores
                .iter()
                .position(|s| s.student_id == student_id && s.assessment_id == req.assessment_id);
            match existing {
                Some(i) => {
                    st.scores[i].score = row.score;
                    resp.updated += 1;
                }
                None => {
                    let id = st.id();
                    st.scores.push(Score {
                        id,
                        student_id,
                        assessment_id: req.assessment_id,
                        score: row.score,
                        comment: None,
                    });
                    resp.created += 1;
                }
            }
        }
        Ok(resp)
    }

    fn update_score(&self, score_id: ScoreId, update: &ScoreUpdate) -> Result<Score, ApiError> {
        self.record(format!("update:{score_id}"))?;
        if self.fail_updates.get() {
            return Err(ApiError::Http {
                status: 503,
                body: "try again".into(),
            });
        }
        let mut st = self.store.borrow_mut();
        let Some(s) = st.scores.iter_mut().find(|s| s.id == score_id) else {
            return Err(ApiError::Http {
                status: 404,
                body: "score not found".into(),
            });
        };
        s.score = update.score;
        s.comment = update.comment.clone();
        Ok(s.clone())
    }

    fn delete_score(&self, score_id: ScoreId) -> Result<(), ApiError> {
        self.record(format!("delete:{score_id}"))?;
        let mut st = self.store.borrow_mut();
        let before = st.scores.len();
        st.scores.retain(|s| s.id != score_id);
        if st.scores.len() == before {
            return Err(ApiError::Http {
                status: 404,
                body: "score not found".into(),
            });
        }
        Ok(())
    }
}
