use crate::{
    config::Config,
    context::SessionContext,
    error::FailureKind,
    remote::{RemoteApi, envelope},
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallProgress {
    pub total_hours: String,
    pub completed_hours: String,
    pub percent: f64,
}

impl OverallProgress {
    pub fn unknown() -> Self {
        Self {
            total_hours: "0".into(),
            completed_hours: "0".into(),
            percent: 0.0,
        }
    }

    pub fn reached(&self, threshold: f64) -> bool {
        self.percent >= threshold
    }
}

pub struct CompletionVerifier<'a> {
    cfg: &'a Config,
    api: &'a dyn RemoteApi,
    ctx: &'a SessionContext,
}

impl<'a> CompletionVerifier<'a> {
    pub fn new(cfg: &'a Config, api: &'a dyn RemoteApi, ctx: &'a SessionContext) -> Self {
        Self { cfg, api, ctx }
    }

    pub fn overall_progress(&self) -> OverallProgress {
        let url = self.cfg.api.url(&self.cfg.api.statistics_path);
        let payload = json!({
            "year": self.cfg.api.year(),
            "idCardHash": self.ctx.identity.id_card_hash,
        });
        let parsed = match self.api.call(&url, &payload, self.cfg.timeouts.statistics()) {
            Ok(body) => progress_from_body(&body),
            Err(err) => {
                warn!(endpoint = %url, kind = ?err.kind(), "statistics request failed: {err}");
                None
            }
        };

        match parsed {
            Some(p) => {
                info!(
                    "study hours total={} completed={} progress={:.1}%",
                    p.total_hours, p.completed_hours, p.percent
                );
                p
            }
            None => {
                warn!("study hours unavailable, assuming 0%");
                OverallProgress::unknown()
            }
        }
    }
}

/// Reads `data.ANALYSIS_HOURS_NUM` and `data.totalHours`.
pub fn progress_from_body(body: &Value) -> Option<OverallProgress> {
    if !envelope::acknowledged(body) {
        return None;
    }
    let Some(data) = body.get("data").filter(|d| d.is_object()) else {
        warn!(kind = ?FailureKind::Data, "statistics body has no data object");
        return None;
    };
    let total_raw = data.get("ANALYSIS_HOURS_NUM")?;
    let completed_raw = data.get("totalHours")?;
    let total = envelope::loose_number(total_raw)?;
    let completed = envelope::loose_number(completed_raw)?;
    if !total.is_finite() || !completed.is_finite() {
        return None;
    }
    let percent = if total > 0.0 {
        completed / total * 100.0
    } else {
        0.0
    };
    Some(OverallProgress {
        total_hours: envelope::loose_text(total_raw)?,
        completed_hours: envelope::loose_text(completed_raw)?,
        percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_from_numeric_strings() {
        let body = json!({"data": {"ANALYSIS_HOURS_NUM": "50", "totalHours": 25}});
        let p = progress_from_body(&body).unwrap();
        assert_eq!(p.total_hours, "50");
        assert_eq!(p.completed_hours, "25");
        assert!((p.percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        let body = json!({"data": {"ANALYSIS_HOURS_NUM": "0", "totalHours": "3"}});
        assert_eq!(progress_from_body(&body).unwrap().percent, 0.0);
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        let body = json!({"data": {"ANALYSIS_HOURS_NUM": "lots", "totalHours": 1}});
        assert!(progress_from_body(&body).is_none());
        assert!(progress_from_body(&json!({"data": {}})).is_none());
    }
}
