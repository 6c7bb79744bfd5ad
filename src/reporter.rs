use crate::{
    config::Config,
    context::SessionContext,
    error::{CallError, StudyError},
    remote::{RemoteApi, envelope},
    util::Sleeper,
};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOutcome {
    pub endpoint_ok: bool,
    pub transport_failed: bool,
    pub auth_failed: bool,
}

pub fn classify(result: &Result<Value, CallError>, auth_markers: &[String]) -> ReportOutcome {
    let body = match result {
        Ok(body) => Some(body),
        Err(err) => err.body(),
    };
    ReportOutcome {
        endpoint_ok: envelope::succeeded(result),
        transport_failed: matches!(result, Err(err) if err.is_connection_failure()),
        auth_failed: body.is_some_and(|b| envelope::find_marker(b, auth_markers).is_some()),
    }
}

/// Only the authoritative endpoint decides the result.
pub struct ProgressReporter<'a> {
    cfg: &'a Config,
    api: &'a dyn RemoteApi,
    ctx: &'a SessionContext,
    sleeper: &'a dyn Sleeper,
}

impl<'a> ProgressReporter<'a> {
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

    pub fn report(&self, course_id: &str, cumulative_seconds: u64) -> Result<bool, StudyError> {
        self.report_legacy(course_id, cumulative_seconds);
        self.report_authoritative(course_id, cumulative_seconds)
    }

    fn report_legacy(&self, course_id: &str, cumulative_seconds: u64) {
        let url = self.cfg.api.url(&self.cfg.api.legacy_progress_path);
        let payload = json!({
            "userId": self.ctx.identity.id_card_hash,
            "courseCode": course_id,
            "studyTimes": cumulative_seconds,
        });
        let timeout = self.cfg.timeouts.report();
        let markers = &self.cfg.completion.auth_failure_markers;

        let first = self.api.call(&url, &payload, timeout);
        let outcome = classify(&first, markers);
        if !outcome.transport_failed {
            debug!(course_id, ok = outcome.endpoint_ok, "legacy progress report sent");
            return;
        }

        let delay = Duration::from_millis(self.cfg.pacing.legacy_retry_delay_ms);
        warn!(course_id, endpoint = %url, "legacy progress connection dropped, retrying in {delay:?}");
        self.sleeper.sleep(delay);

        let retry = self.api.call(&url, &payload, timeout);
        if classify(&retry, markers).transport_failed {
            warn!(course_id, "legacy progress retry dropped again, continuing");
        } else {
            info!(course_id, "legacy progress retry went through");
        }
    }

    fn report_authoritative(
        &self,
        course_id: &str,
        cumulative_seconds: u64,
    ) -> Result<bool, StudyError> {
        let url = self.cfg.api.url(&self.cfg.api.study_progress_path);
        let payload = json!({
            "courseId": course_id,
            "idCardHash": self.ctx.identity.id_card_hash,
            "studyTimes": cumulative_seconds,
        });
        let result = self.api.call(&url, &payload, self.cfg.timeouts.report());
        let outcome = classify(&result, &self.cfg.completion.auth_failure_markers);

        if outcome.auth_failed {
            let message = match &result {
                Ok(body) => Some(body),
                Err(err) => err.body(),
            }
            .and_then(|b| envelope::find_marker(b, &self.cfg.completion.auth_failure_markers))
            .map(|(msg, _)| msg)
            .unwrap_or_default();
            error!(course_id, endpoint = %url, "authentication failed: {message}");
            return Err(StudyError::AuthenticationLost {
                course_id: course_id.to_string(),
                message,
            });
        }

        if let Err(err) = &result {
            warn!(course_id, endpoint = %url, kind = ?err.kind(), "progress report failed: {err}");
        }
        Ok(outcome.endpoint_ok)
    }
}
