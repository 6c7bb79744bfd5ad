use crate::{
    catalog::{CatalogClient, Subject},
    config::Config,
    context::SessionContext,
    error::StudyError,
    remote::RemoteApi,
    report::{CourseReport, RunReport, SubjectReport},
    session::SessionMachine,
    util::{Sleeper, ThreadSleeper, now_rfc3339, secs},
    verifier::{CompletionVerifier, OverallProgress},
};
use tracing::{info, warn};

pub struct Orchestrator<A: RemoteApi> {
    cfg: Config,
    api: A,
    ctx: SessionContext,
    sleeper: Box<dyn Sleeper>,
}

impl<A: RemoteApi> Orchestrator<A> {
    pub fn new(cfg: &Config, api: A, ctx: SessionContext) -> Self {
        Self {
            cfg: cfg.clone(),
            api,
            ctx,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn run(&self) -> Result<RunReport, StudyError> {
        let started = now_rfc3339();
        let verifier = CompletionVerifier::new(&self.cfg, &self.api, &self.ctx);
        let threshold = self.cfg.completion.stop_at_percent;

        let initial = verifier.overall_progress();
        let mut report = RunReport {
            started,
            finished: String::new(),
            initial_progress: initial.clone(),
            final_progress: None,
            subjects: Vec::new(),
            stopped_on_completion: false,
        };

        if initial.reached(threshold) {
            info!("study already complete ({:.1}%)", initial.percent);
            report.stopped_on_completion = true;
            report.finished = now_rfc3339();
            return Ok(report);
        }
        info!("current progress {:.1}%", initial.percent);

        let catalog = CatalogClient::new(&self.cfg, &self.api, &self.ctx);
        let subjects = catalog.list_subjects();
        if subjects.is_empty() {
            info!("no subjects listed, nothing to do");
        }

        for subject in &subjects {
            let (subject_report, completed) = self.run_subject(&catalog, subject)?;
            report.subjects.push(subject_report);
            if let Some(progress) = completed {
                info!("all study complete, stopping");
                report.final_progress = Some(progress);
                report.stopped_on_completion = true;
                break;
            }

            let progress = verifier.overall_progress();
            let reached = progress.reached(threshold);
            report.final_progress = Some(progress);
            if reached {
                info!("all study complete after subject {}", subject.name);
                report.stopped_on_completion = true;
                break;
            }
        }

        report.finished = now_rfc3339();
        info!(
            "run finished: {} studied, {} failed",
            report.studied(),
            report.failed()
        );
        Ok(report)
    }

    fn run_subject(
        &self,
        catalog: &CatalogClient<'_>,
        subject: &Subject,
    ) -> Result<(SubjectReport, Option<OverallProgress>), StudyError> {
        info!(subject_id = %subject.id, "subject: {}", subject.name);
        let eligible: Vec<_> = catalog
            .list_courses(&subject.id)
            .into_iter()
            .filter(|c| c.is_eligible())
            .collect();

        let mut subject_report = SubjectReport {
            subject_id: subject.id.clone(),
            name: subject.name.clone(),
            eligible: eligible.len(),
            courses: Vec::new(),
        };

        if eligible.is_empty() {
            info!(subject_id = %subject.id, "no courses to study");
            return Ok((subject_report, None));
        }
        info!(subject_id = %subject.id, "{} courses to study", eligible.len());

        let machine = SessionMachine::new(&self.cfg, &self.api, &self.ctx, self.sleeper.as_ref());
        let mut studied = 0;
        for (i, course) in eligible.iter().enumerate() {
            let run = machine.run(course, &subject.id)?;
            let outcome = run.outcome.clone();
            subject_report.courses.push(CourseReport::new(course, run));

            if let Some(progress) = outcome.completed_progress() {
                return Ok((subject_report, Some(progress.clone())));
            }
            if outcome.is_success() {
                studied += 1;
                info!(subject_id = %subject.id, "subject progress {studied}/{}", eligible.len());
                if i + 1 < eligible.len() {
                    info!(
                        "next course in {}s",
                        self.cfg.pacing.course_interval_seconds
                    );
                    self.sleeper
                        .sleep(secs(self.cfg.pacing.course_interval_seconds));
                }
            } else {
                warn!(subject_id = %subject.id, course_id = %course.id, ?outcome, "course not studied");
            }
        }

        info!(subject_id = %subject.id, "subject done: {studied}/{}", eligible.len());
        Ok((subject_report, None))
    }
}
