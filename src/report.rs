use crate::{
    catalog::Course,
    session::{CourseOutcome, CourseRun, SessionState},
    verifier::OverallProgress,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started: String,
    pub finished: String,
    pub initial_progress: OverallProgress,
    pub final_progress: Option<OverallProgress>,
    pub subjects: Vec<SubjectReport>,
    pub stopped_on_completion: bool,
}

impl RunReport {
    pub fn studied(&self) -> usize {
        self.courses().filter(|c| c.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.courses()
            .filter(|c| matches!(c.outcome, CourseOutcome::Failed { .. }))
            .count()
    }

    pub fn courses(&self) -> impl Iterator<Item = &CourseReport> {
        self.subjects.iter().flat_map(|s| s.courses.iter())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectReport {
    pub subject_id: String,
    pub name: String,
    pub eligible: usize,
    pub courses: Vec<CourseReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseReport {
    pub course_id: String,
    pub title: String,
    pub duration_seconds: u64,
    pub outcome: CourseOutcome,
    pub final_state: SessionState,
    pub reported_seconds: u64,
    pub reports_planned: u32,
}

impl CourseReport {
    pub fn new(course: &Course, run: CourseRun) -> Self {
        Self {
            course_id: course.id.clone(),
            title: course.title.clone(),
            duration_seconds: course.duration_seconds,
            outcome: run.outcome,
            final_state: run.final_state,
            reported_seconds: run.reported_seconds,
            reports_planned: run.reports_planned,
        }
    }
}
