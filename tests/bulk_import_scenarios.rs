mod common;

use common::FakeApi;
use markgridd::api::MarkbookApi;
use markgridd::model::Gender;
use markgridd::roster::{RosterDefaults, RowMatch};
use markgridd::sync::{self, SyncError};
use markgridd::validate::ValidationError;

const CLASS: i64 = 41;
const OTHER_CLASS: i64 = 42;

#[test]
fn score_import_conflicts_are_row_scoped() {
    let api = FakeApi::new();
    let john = api.add_student(CLASS, "John", "Brown", "10-9");
    let kayla = api.add_student(CLASS, "Kayla", "Smith", "10-9");
    let test = api.add_assessment(CLASS, "Quiz 3", 20);
    let assessment = api.get_assessment(test).expect("assessment");

    let text = "John Brown\t18\nNobody Here\t10\nKayla Smith\t25\njust words\n\nkayla   smith,19\n";
    let report = sync::import_scores(&api, &assessment, text).expect("import");

    assert_eq!(report.skipped, 1);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.submitted, 3);
    assert_eq!(report.created, 2);
    assert_eq!(report.updated, 0);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].student_name, "Nobody Here");

    assert_eq!(api.score_of(john, test), Some(18.0));
    assert_eq!(api.score_of(kayla, test), Some(19.0));
}

#[test]
fn reimporting_scores_updates_in_place() {
    let api = FakeApi::new();
    let john = api.add_student(CLASS, "John", "Brown", "10-9");
    let test = api.add_assessment(CLASS, "Quiz 3", 20);
    let assessment = api.get_assessment(test).expect("assessment");

    sync::import_scores(&api, &assessment, "John Brown, 12").expect("first import");
    let report = sync::import_scores(&api, &assessment, "John Brown  15").expect("second import");

    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(api.scores_for(test).len(), 1);
    assert_eq!(api.score_of(john, test), Some(15.0));
}

#[test]
fn score_import_rejects_empty_input_without_calls() {
    let api = FakeApi::new();
    let test = api.add_assessment(CLASS, "Quiz 3", 20);
    let assessment = api.get_assessment(test).expect("assessment");
    api.calls.borrow_mut().clear();

    let err = sync::import_scores(&api, &assessment, "  \n ").expect_err("blank");
    assert!(matches!(
        err,
        SyncError::Validation(ValidationError::Empty("Please paste at least one score row"))
    ));
    let err = sync::import_scores(&api, &assessment, "no scores here\nJohn Brown 99").expect_err("none valid");
    assert!(matches!(
        err,
        SyncError::Validation(ValidationError::Empty("No valid score rows to import"))
    ));
    assert!(api.calls.borrow().is_empty());
}

#[test]
fn roster_import_links_existing_students_instead_of_duplicating() {
    let api = FakeApi::new();
    let defaults = RosterDefaults::default();
    let text = "John Brown, M, 10-9\nJohn Brown, M, 10-9";

    let first = sync::import_roster(&api, CLASS, text, &defaults).expect("first run");
    assert_eq!(first.submitted, 2);
    assert_eq!(
        first.preview.statuses,
        vec![RowMatch::New, RowMatch::DuplicateInBatch]
    );
    assert_eq!(first.created, 1);
    assert_eq!(first.linked, 1);
    assert_eq!(api.all_students().len(), 1);
    assert_eq!(api.roster(CLASS).len(), 1);

    let second = sync::import_roster(&api, CLASS, text, &defaults).expect("second run");
    assert_eq!(
        second.preview.statuses,
        vec![RowMatch::Existing, RowMatch::DuplicateInBatch]
    );
    assert_eq!(second.created, 0);
    assert_eq!(second.linked, 2);
    assert_eq!(api.all_students().len(), 1);

    let student = &api.all_students()[0];
    assert_eq!(student.first_name, "John");
    assert_eq!(student.last_name, "Brown");
    assert_eq!(student.grade, "10-9");
    assert_eq!(student.gender, Some(Gender::Male));
}

#[test]
fn roster_match_ignores_case_and_spacing_but_not_grade() {
    let api = FakeApi::new();
    let existing = api.add_student(OTHER_CLASS, "John", "Brown", "10-9");

    let report = sync::import_roster(
        &api,
        CLASS,
        "john   BROWN, 10-9\nJohn Brown, 11-2",
        &RosterDefaults::default(),
    )
    .expect("import");

    assert_eq!(report.linked, 1);
    assert_eq!(report.created, 1);
    assert_eq!(api.all_students().len(), 2);
    let roster = api.roster(CLASS);
    assert!(roster.iter().any(|s| s.id == existing));
    assert!(roster.iter().any(|s| s.grade == "11-2"));
}

#[test]
fn roster_defaults_fill_missing_fields() {
    let api = FakeApi::new();
    let defaults = RosterDefaults {
        grade: Some("9-1".into()),
        gender: Some(Gender::Female),
    };

    let report =
        sync::import_roster(&api, CLASS, "Ana Lima\n,\nBea Cruz, M", &defaults).expect("import");
    assert_eq!(report.submitted, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.created, 2);

    let students = api.roster(CLASS);
    let ana = students.iter().find(|s| s.first_name == "Ana").expect("ana");
    assert_eq!(ana.grade, "9-1");
    assert_eq!(ana.gender, Some(Gender::Female));
    let bea = students.iter().find(|s| s.first_name == "Bea").expect("bea");
    assert_eq!(bea.grade, "9-1");
    assert_eq!(bea.gender, Some(Gender::Male));
}

#[test]
fn roster_import_rejects_empty_input_without_calls() {
    let api = FakeApi::new();

    let err = sync::import_roster(&api, CLASS, "   \n\t", &RosterDefaults::default())
        .expect_err("blank");
    assert!(matches!(
        err,
        SyncError::Validation(ValidationError::Empty("Please enter student names"))
    ));
    let err = sync::import_roster(&api, CLASS, ",\n , ,", &RosterDefaults::default())
        .expect_err("no names");
    assert!(matches!(
        err,
        SyncError::Validation(ValidationError::Empty("Please enter at least one student name"))
    ));
    assert!(api.calls.borrow().is_empty());
}

#[test]
fn roster_import_refreshes_an_open_grid() {
    let api = FakeApi::new();
    api.add_student(CLASS, "John", "Brown", "10-9");
    api.add_assessment(CLASS, "Quiz 1", 10);
    let mut grid = sync::open_grid(&api, CLASS, None).expect("open grid");
    assert_eq!(grid.students().len(), 1);

    sync::import_roster(&api, CLASS, "Kayla Smith, F, 10-9", &RosterDefaults::default())
        .expect("import");
    sync::refresh(&api, &mut grid, None).expect("refresh");

    assert_eq!(grid.students().len(), 2);
    assert_eq!(grid.view().rows.len(), 2);
}
