mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use study_pacer::{
    error::CallError,
    verifier::{CompletionVerifier, OverallProgress},
};

#[test]
fn progress_is_derived_from_hours() {
    let cfg = test_config();
    let browser = RecordingBrowser::default();
    let ctx = context(&browser);
    let api = ScriptedApi::new().route(STATS, stats("40", "30"));

    let progress = CompletionVerifier::new(&cfg, &api, &ctx).overall_progress();

    assert_eq!(progress.total_hours, "40");
    assert_eq!(progress.completed_hours, "30");
    assert!((progress.percent - 75.0).abs() < 1e-9);

    let call = &api.calls_to(STATS)[0];
    assert_eq!(call.payload, json!({"year": 2025, "idCardHash": HASH}));
    assert_eq!(call.timeout, Duration::from_secs(60));
}

#[test]
fn timeout_yields_unknown_progress() {
    let cfg = test_config();
    let browser = RecordingBrowser::default();
    let ctx = context(&browser);
    let api = ScriptedApi::new().push(STATS, Err(CallError::Timeout));

    let verifier = CompletionVerifier::new(&cfg, &api, &ctx);

    assert_eq!(verifier.overall_progress(), OverallProgress::unknown());
}

#[test]
fn malformed_statistics_yield_unknown_progress() {
    let cfg = test_config();
    let browser = RecordingBrowser::default();
    let ctx = context(&browser);

    for body in [
        json!({"success": false}),
        json!({"success": true, "data": "n/a"}),
        json!({"success": true, "data": {"ANALYSIS_HOURS_NUM": "x", "totalHours": 2}}),
    ] {
        let api = ScriptedApi::new().route(STATS, body);
        let verifier = CompletionVerifier::new(&cfg, &api, &ctx);
        assert_eq!(verifier.overall_progress(), OverallProgress::unknown());
        assert!(!verifier.overall_progress().reached(cfg.completion.stop_at_percent));
    }
}
