mod common;

use common::*;
use serde_json::json;
use study_pacer::{
    catalog::{CatalogClient, courses_from_body, subjects_from_body},
    error::CallError,
};

#[test]
fn subject_listing_sends_page_size() {
    let cfg = test_config();
    let browser = RecordingBrowser::default();
    let ctx = context(&browser);
    let api = ScriptedApi::new().route(
        SUBJECTS,
        listing(vec![
            json!({"id": 7, "name": "Ethics", "courseCount": 4}),
            json!({"id": "8"}),
        ]),
    );

    let subjects = CatalogClient::new(&cfg, &api, &ctx).list_subjects();

    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[0].id, "7");
    assert_eq!(subjects[0].name, "Ethics");
    assert_eq!(subjects[0].course_count, 4);
    assert_eq!(subjects[1].name, "unknown subject");
    assert_eq!(subjects[1].course_count, 0);

    let call = &api.calls_to(SUBJECTS)[0];
    assert_eq!(call.payload, json!({"pagesize": 12, "pagenum": 0}));
}

#[test]
fn failed_subject_listing_is_empty() {
    let cfg = test_config();
    let browser = RecordingBrowser::default();
    let ctx = context(&browser);
    let api = ScriptedApi::new().push(SUBJECTS, Err(CallError::Timeout));

    assert!(CatalogClient::new(&cfg, &api, &ctx).list_subjects().is_empty());
    assert!(subjects_from_body(&json!({"success": true})).is_empty());
    assert!(subjects_from_body(&json!({"success": false, "datalist": [{"id": 1}]})).is_empty());
}

#[test]
fn course_listing_carries_identity() {
    let cfg = test_config();
    let browser = RecordingBrowser::default();
    let ctx = context(&browser);
    let api = ScriptedApi::new().route(COURSES, listing(vec![course_row("c1", "10:00", "0")]));

    let courses = CatalogClient::new(&cfg, &api, &ctx).list_courses("s9");

    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].duration_seconds, 600);
    assert!(courses[0].need_study);
    assert!(!courses[0].has_test);
    let call = &api.calls_to(COURSES)[0];
    assert_eq!(
        call.payload,
        json!({"subjectId": "s9", "pagesize": 1000, "pagenum": 0, "idCardHash": HASH})
    );
}

#[test]
fn studied_by_status_code_or_marker_text() {
    let cfg = test_config();
    let body = listing(vec![
        json!({"id": 1, "name": "a", "studyStatus": 2, "showCourseDuration": "05:00"}),
        json!({"id": 2, "name": "b", "studyStatus": "1", "showStatusMsg": "已学习", "showCourseDuration": "05:00"}),
        json!({"id": 3, "name": "c", "studyStatus": "1", "showCourseDuration": "05:00"}),
    ]);

    let courses = courses_from_body(&cfg, &body);

    assert!(!courses[0].need_study);
    assert!(!courses[1].need_study);
    assert!(courses[2].need_study);
}

#[test]
fn assessment_type_other_than_none_means_test() {
    let cfg = test_config();
    let body = listing(vec![
        json!({"id": 1, "name": "a", "assessementType": "1", "showCourseDuration": "05:00"}),
        json!({"id": 2, "name": "b", "assessementType": "2", "showCourseDuration": "05:00"}),
        json!({"id": 3, "name": "c", "assessementType": 0, "showCourseDuration": "05:00"}),
        json!({"id": 4, "name": "d", "showCourseDuration": "05:00"}),
    ]);

    let courses = courses_from_body(&cfg, &body);

    assert!(!courses[0].has_test);
    assert!(courses[1].has_test);
    assert!(courses[2].has_test);
    assert!(!courses[3].has_test);
    assert!(!courses[1].is_eligible());
}

#[test]
fn unparseable_rows_are_kept_with_defaults() {
    let cfg = test_config();
    let body = listing(vec![
        json!("garbage"),
        json!({"id": 5, "name": 12, "showCourseDuration": "05:00"}),
        json!({"id": 6, "name": "x", "showCourseDuration": "about an hour"}),
    ]);

    let courses = courses_from_body(&cfg, &body);

    assert_eq!(courses.len(), 3);
    for c in &courses {
        assert!(c.need_study);
        assert_eq!(c.duration_seconds, 0);
        assert!(!c.is_studyable());
    }
    assert_eq!(courses[0].title, "unknown course");
    assert_eq!(courses[1].title, "unknown course");
    assert_eq!(courses[2].id, "6");
}
