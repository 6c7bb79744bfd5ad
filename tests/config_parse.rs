use study_pacer::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../study-pacer.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    cfg.validate().expect("example config is valid");
    assert_eq!(cfg.pacing.progress_duration_seconds, 300);
    assert_eq!(cfg.pacing.last_report_before_end_seconds, 60);
    assert_eq!(cfg.timeouts.report_ms, 15_000);
    assert!(cfg.api.legacy_progress_path.starts_with("https://"));
    assert_eq!(cfg.completion.auth_failure_markers.len(), 2);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[api]\nbase_url = \"https://api.test\"\n").expect("parse TOML");
    assert_eq!(cfg.api.subject_page_size, 12);
    assert_eq!(cfg.api.course_page_size, 1000);
    assert_eq!(cfg.timeouts.statistics_ms, 60_000);
    assert_eq!(cfg.pacing.course_interval_seconds, 5);
    assert!(cfg.browser.webdriver_url.is_empty());
}
