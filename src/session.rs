use crate::{
    catalog::{CatalogClient, Course},
    config::{Config, Pacing},
    context::SessionContext,
    error::{CallError, StudyError},
    remote::{RemoteApi, envelope},
    reporter::ProgressReporter,
    util::{Sleeper, secs},
    verifier::{CompletionVerifier, OverallProgress},
};
use anyhow::anyhow;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Opened,
    Started,
    Reporting(u32),
    Finalizing,
    Ended,
    Verified,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CourseOutcome {
    Studied {
        verified: bool,
        reports_accepted: u32,
    },
    GloballyComplete {
        verified: bool,
        reports_accepted: u32,
        progress: OverallProgress,
    },
    AlreadyStudied,
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

impl CourseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            CourseOutcome::Studied { .. } | CourseOutcome::GloballyComplete { .. }
        )
    }

    pub fn stops_run(&self) -> bool {
        self.completed_progress().is_some()
    }

    pub fn completed_progress(&self) -> Option<&OverallProgress> {
        match self {
            CourseOutcome::GloballyComplete { progress, .. } => Some(progress),
            _ => None,
        }
    }
}

/// Number of explicit reports for a course: the duration minus the reserved
/// tail, in steps of `progress_duration_seconds`, rounded up.
pub fn planned_reports(duration_seconds: u64, pacing: &Pacing) -> u32 {
    let step = pacing.progress_duration_seconds.max(1);
    let claimable = duration_seconds.saturating_sub(pacing.last_report_before_end_seconds);
    claimable.div_ceil(step) as u32
}

#[derive(Debug, Clone, Serialize)]
pub struct StudySession {
    pub course_id: String,
    pub subject_id: String,
    pub total_duration: u64,
    pub reported_seconds: u64,
    pub report_index: u32,
    pub report_count_planned: u32,
    pub state: SessionState,
    #[serde(skip)]
    step: u64,
    #[serde(skip)]
    limit: u64,
}

impl StudySession {
    pub fn new(course: &Course, subject_id: &str, pacing: &Pacing) -> Self {
        Self {
            course_id: course.id.clone(),
            subject_id: subject_id.to_string(),
            total_duration: course.duration_seconds,
            reported_seconds: 0,
            report_index: 0,
            report_count_planned: planned_reports(course.duration_seconds, pacing),
            state: SessionState::Idle,
            step: pacing.progress_duration_seconds.max(1),
            limit: course
                .duration_seconds
                .saturating_sub(pacing.last_report_before_end_seconds),
        }
    }

    fn advance(&mut self, to: SessionState) {
        debug!("session {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    pub fn next_tick(&mut self) -> Option<u64> {
        if self.report_index >= self.report_count_planned {
            return None;
        }
        self.report_index += 1;
        self.reported_seconds = (self.reported_seconds + self.step).min(self.limit);
        self.advance(SessionState::Reporting(self.report_index));
        Some(self.reported_seconds)
    }

    pub fn is_last_tick(&self) -> bool {
        self.report_index >= self.report_count_planned
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseRun {
    pub outcome: CourseOutcome,
    pub final_state: SessionState,
    pub reported_seconds: u64,
    pub reports_planned: u32,
}

impl CourseRun {
    fn without_session(outcome: CourseOutcome) -> Self {
        Self {
            outcome,
            final_state: SessionState::Idle,
            reported_seconds: 0,
            reports_planned: 0,
        }
    }

    fn from_session(session: &StudySession, outcome: CourseOutcome) -> Self {
        Self {
            outcome,
            final_state: session.state,
            reported_seconds: session.reported_seconds,
            reports_planned: session.report_count_planned,
        }
    }
}

pub struct SessionMachine<'a> {
    cfg: &'a Config,
    api: &'a dyn RemoteApi,
    ctx: &'a SessionContext,
    sleeper: &'a dyn Sleeper,
}

impl<'a> SessionMachine<'a> {
    pub fn new(
        cfg: &'a Config,
        api: &'a dyn RemoteApi,
        ctx: &'a SessionContext,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            cfg,
            api,
            ctx,
            sleeper,
        }
    }

    /// Only an authentication loss comes back as `Err`; every other failure
    /// resolves the course to `Failed`.
    pub fn run(&self, course: &Course, subject_id: &str) -> Result<CourseRun, StudyError> {
        let span = info_span!("course", course_id = %course.id, subject_id);
        let _enter = span.enter();
        info!("studying: {}", course.title);

        if !course.need_study {
            info!("already studied, skipping");
            return Ok(CourseRun::without_session(CourseOutcome::AlreadyStudied));
        }
        if course.has_test {
            info!("course has an assessment, skipping");
            return Ok(CourseRun::without_session(CourseOutcome::Skipped {
                reason: "course has an assessment".into(),
            }));
        }
        if course.duration_seconds == 0 {
            warn!("course duration is 0, skipping");
            return Ok(CourseRun::without_session(CourseOutcome::Skipped {
                reason: "course duration is 0".into(),
            }));
        }

        let mut session = StudySession::new(course, subject_id, &self.cfg.pacing);
        match self.drive(course, &mut session) {
            Ok(outcome) => Ok(CourseRun::from_session(&session, outcome)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                error!("course attempt aborted: {err:#}");
                session.advance(SessionState::Failed);
                self.go_home();
                Ok(CourseRun::from_session(
                    &session,
                    CourseOutcome::Failed {
                        reason: err.to_string(),
                    },
                ))
            }
        }
    }

    fn drive(
        &self,
        course: &Course,
        session: &mut StudySession,
    ) -> Result<CourseOutcome, StudyError> {
        if course.id.is_empty() {
            return Err(anyhow!("course '{}' has no id", course.title).into());
        }
        let course_id = course.id.as_str();
        let pacing = &self.cfg.pacing;

        if let Err(err) = self
            .ctx
            .browser
            .open_course_page(course_id, &session.subject_id)
        {
            warn!("opening course page failed, starting anyway: {err:#}");
        }
        session.advance(SessionState::Opened);

        let started = self.start_study(course_id);
        if !envelope::succeeded(&started) {
            let reason = envelope::failure_reason(&started);
            warn!("start-study failed: {reason}");
            return Ok(self.fail(session, reason));
        }
        session.advance(SessionState::Started);
        info!(
            "course duration {}s ({}m{}s), {} reports of {}s planned, last {}s left to playback",
            session.total_duration,
            session.total_duration / 60,
            session.total_duration % 60,
            session.report_count_planned,
            pacing.progress_duration_seconds,
            pacing.last_report_before_end_seconds
        );

        let reporter = ProgressReporter::new(self.cfg, self.api, self.ctx, self.sleeper);
        let mut accepted = 0;
        while let Some(cumulative) = session.next_tick() {
            let ok = reporter.report(course_id, cumulative)?;
            let percent = cumulative as f64 / session.total_duration as f64 * 100.0;
            if ok {
                accepted += 1;
                info!(
                    "report {}/{} accepted: {cumulative}s ({percent:.1}%)",
                    session.report_index, session.report_count_planned
                );
            } else {
                warn!(
                    "report {}/{} not accepted: {cumulative}s ({percent:.1}%)",
                    session.report_index, session.report_count_planned
                );
            }
            if !session.is_last_tick() {
                self.sleeper.sleep(secs(pacing.progress_interval_seconds));
            }
        }

        session.advance(SessionState::Finalizing);
        if let Err(err) = self.ctx.browser.refresh_and_resume_playback() {
            warn!("resuming playback failed: {err:#}");
        }
        let tail = pacing.final_wait();
        info!("waiting {}s for playback to reach the end", tail.as_secs());
        self.sleeper.sleep(tail);

        let ended = self.end_study(course_id);
        if !envelope::succeeded(&ended) {
            let reason = envelope::failure_reason(&ended);
            error!("end-study failed: {reason}");
            return Ok(self.fail(session, reason));
        }
        session.advance(SessionState::Ended);
        info!("end-study accepted");

        self.sleeper.sleep(secs(pacing.settle_delay_seconds));
        let verified = self.verify(course_id, &session.subject_id);
        if verified {
            session.advance(SessionState::Verified);
            info!("course confirmed complete: {}", course.title);
        } else {
            warn!("course may not be fully complete: {}", course.title);
        }
        self.go_home();

        if self.cfg.completion.check_progress_after_course {
            let progress = CompletionVerifier::new(self.cfg, self.api, self.ctx).overall_progress();
            if progress.reached(self.cfg.completion.stop_at_percent) {
                info!("overall progress reached the stop threshold");
                return Ok(CourseOutcome::GloballyComplete {
                    verified,
                    reports_accepted: accepted,
                    progress,
                });
            }
        }

        Ok(CourseOutcome::Studied {
            verified,
            reports_accepted: accepted,
        })
    }

    fn start_study(&self, course_id: &str) -> Result<Value, CallError> {
        let url = self.cfg.api.url(&self.cfg.api.study_start_path);
        let payload = json!({
            "courseId": course_id,
            "idCardHash": self.ctx.identity.id_card_hash,
            "studyType": "VIDEO",
        });
        self.api.call(&url, &payload, self.cfg.timeouts.default_call())
    }

    fn end_study(&self, course_id: &str) -> Result<Value, CallError> {
        let url = self.cfg.api.url(&self.cfg.api.study_end_path);
        let payload = json!({
            "courseId": course_id,
            "idCardHash": self.ctx.identity.id_card_hash,
        });
        self.api.call(&url, &payload, self.cfg.timeouts.default_call())
    }

    fn verify(&self, course_id: &str, subject_id: &str) -> bool {
        let courses = CatalogClient::new(self.cfg, self.api, self.ctx).list_courses(subject_id);
        match courses.iter().find(|c| c.id == course_id) {
            Some(c) => !c.need_study,
            None => {
                warn!("course not found in listing during verification");
                false
            }
        }
    }

    fn fail(&self, session: &mut StudySession, reason: String) -> CourseOutcome {
        session.advance(SessionState::Failed);
        self.go_home();
        CourseOutcome::Failed { reason }
    }

    fn go_home(&self) {
        if let Err(err) = self.ctx.browser.navigate_home() {
            warn!("navigating home failed: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(duration: u64) -> Course {
        Course {
            id: "c1".into(),
            title: "t".into(),
            need_study: true,
            duration_seconds: duration,
            has_test: false,
        }
    }

    #[test]
    fn report_counts() {
        let pacing = Pacing::default();
        assert_eq!(planned_reports(0, &pacing), 0);
        assert_eq!(planned_reports(60, &pacing), 0);
        assert_eq!(planned_reports(61, &pacing), 1);
        assert_eq!(planned_reports(185, &pacing), 1);
        assert_eq!(planned_reports(360, &pacing), 1);
        assert_eq!(planned_reports(361, &pacing), 2);
        assert_eq!(planned_reports(965, &pacing), 4);
    }

    #[test]
    fn ticks_are_monotonic_and_capped() {
        let pacing = Pacing::default();
        for duration in [61, 185, 360, 361, 965, 3723] {
            let mut s = StudySession::new(&course(duration), "s1", &pacing);
            let mut prev = 0;
            let mut n = 0;
            while let Some(cum) = s.next_tick() {
                assert!(cum >= prev);
                assert!(cum <= duration - 60);
                prev = cum;
                n += 1;
            }
            assert_eq!(n, planned_reports(duration, &pacing));
            assert_eq!(prev, duration - 60);
        }
    }

    #[test]
    fn short_course_has_no_ticks() {
        let mut s = StudySession::new(&course(45), "s1", &Pacing::default());
        assert_eq!(s.next_tick(), None);
        assert_eq!(s.reported_seconds, 0);
    }
}
