use crate::{
    config::Config,
    context::SessionContext,
    error::FailureKind,
    remote::{RemoteApi, envelope},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

const UNKNOWN_SUBJECT: &str = "unknown subject";
const UNKNOWN_COURSE: &str = "unknown course";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub course_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub need_study: bool,
    pub duration_seconds: u64,
    pub has_test: bool,
}

impl Course {
    pub fn is_studyable(&self) -> bool {
        self.need_study && !self.has_test && self.duration_seconds > 0
    }

    pub fn is_eligible(&self) -> bool {
        self.need_study && !self.has_test
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SubjectRow {
    id: Option<Value>,
    name: Option<String>,
    course_count: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CourseRow {
    id: Option<Value>,
    name: Option<String>,
    study_status: Option<Value>,
    show_status_msg: Option<String>,
    show_course_duration: Option<String>,
    // Field name is spelled this way by the service.
    assessement_type: Option<Value>,
}

pub struct CatalogClient<'a> {
    cfg: &'a Config,
    api: &'a dyn RemoteApi,
    ctx: &'a SessionContext,
}

impl<'a> CatalogClient<'a> {
    pub fn new(cfg: &'a Config, api: &'a dyn RemoteApi, ctx: &'a SessionContext) -> Self {
        Self { cfg, api, ctx }
    }

    pub fn list_subjects(&self) -> Vec<Subject> {
        let url = self.cfg.api.url(&self.cfg.api.subject_query_path);
        let payload = json!({
            "pagesize": self.cfg.api.subject_page_size,
            "pagenum": 0,
        });
        match self.api.call(&url, &payload, self.cfg.timeouts.default_call()) {
            Ok(body) => subjects_from_body(&body),
            Err(err) => {
                warn!(endpoint = %url, kind = ?err.kind(), "subject listing failed: {err}");
                Vec::new()
            }
        }
    }

    pub fn list_courses(&self, subject_id: &str) -> Vec<Course> {
        let url = self.cfg.api.url(&self.cfg.api.course_query_path);
        let payload = json!({
            "subjectId": subject_id,
            "pagesize": self.cfg.api.course_page_size,
            "pagenum": 0,
            "idCardHash": self.ctx.identity.id_card_hash,
        });
        match self.api.call(&url, &payload, self.cfg.timeouts.default_call()) {
            Ok(body) => courses_from_body(self.cfg, &body),
            Err(err) => {
                warn!(subject_id, endpoint = %url, kind = ?err.kind(), "course listing failed: {err}");
                Vec::new()
            }
        }
    }
}

fn listing(body: &Value) -> Option<&Vec<Value>> {
    if !envelope::acknowledged(body) {
        return None;
    }
    let rows = body.get("datalist").and_then(Value::as_array);
    if rows.is_none() {
        warn!(kind = ?FailureKind::Data, "listing body has no datalist");
    }
    rows
}

pub fn subjects_from_body(body: &Value) -> Vec<Subject> {
    let Some(rows) = listing(body) else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            let row: SubjectRow = serde_json::from_value(row.clone()).unwrap_or_default();
            Subject {
                id: row.id.as_ref().and_then(envelope::loose_text).unwrap_or_default(),
                name: row.name.unwrap_or_else(|| UNKNOWN_SUBJECT.to_string()),
                course_count: row
                    .course_count
                    .as_ref()
                    .and_then(envelope::loose_number)
                    .map(|n| n.max(0.0) as u64)
                    .unwrap_or(0),
            }
        })
        .collect()
}

pub fn courses_from_body(cfg: &Config, body: &Value) -> Vec<Course> {
    let Some(rows) = listing(body) else {
        return Vec::new();
    };
    rows.iter()
        .map(|raw| {
            let row: CourseRow = serde_json::from_value(raw.clone()).unwrap_or_else(|err| {
                debug!("defaulting unparseable course row: {err}");
                CourseRow::default()
            });
            course_from_row(cfg, row)
        })
        .collect()
}

fn course_from_row(cfg: &Config, row: CourseRow) -> Course {
    let rules = &cfg.completion;
    let status = row
        .study_status
        .as_ref()
        .and_then(envelope::loose_text)
        .unwrap_or_else(|| "0".to_string());
    // Either signal marks the course as done; they are not reconciled.
    let studied = status == rules.studied_status_code
        || row.show_status_msg.as_deref() == Some(rules.studied_status_text.as_str());
    let has_test = row
        .assessement_type
        .as_ref()
        .and_then(envelope::loose_text)
        .is_some_and(|t| !t.is_empty() && t != rules.no_assessment_type);

    Course {
        id: row.id.as_ref().and_then(envelope::loose_text).unwrap_or_default(),
        title: row.name.unwrap_or_else(|| UNKNOWN_COURSE.to_string()),
        need_study: !studied,
        duration_seconds: row
            .show_course_duration
            .as_deref()
            .map(parse_duration)
            .unwrap_or(0),
        has_test,
    }
}

/// `MM:SS` or `HH:MM:SS` to seconds; anything else is 0.
pub fn parse_duration(raw: &str) -> u64 {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let nums: Option<Vec<u64>> = parts.iter().map(|p| p.trim().parse().ok()).collect();
    let [h, m, s] = match nums.as_deref() {
        Some(&[m, s]) => [0, m, s],
        Some(&[h, m, s]) => [h, m, s],
        _ => return 0,
    };
    h.checked_mul(3600)
        .zip(m.checked_mul(60))
        .and_then(|(h, m)| h.checked_add(m))
        .and_then(|hm| hm.checked_add(s))
        .unwrap_or(0)
}
