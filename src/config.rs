use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub pacing: Pacing,
    #[serde(default)]
    pub completion: Completion,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url must be set");
        }
        let base = self
            .api
            .base()
            .with_context(|| format!("api.base_url is not a valid URL: {}", self.api.base_url))?;
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            bail!("api.base_url must be an http(s) URL with a host: {base}");
        }
        for path in self.api.endpoint_paths() {
            self.api
                .endpoint(path)
                .with_context(|| format!("invalid endpoint path: {path}"))?;
        }
        if self.pacing.progress_duration_seconds == 0 {
            bail!("pacing.progress_duration_seconds must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Api {
    pub base_url: String,
    pub subject_query_path: String,
    pub course_query_path: String,
    pub study_start_path: String,
    pub study_progress_path: String,
    /// Usually an absolute URL on another host.
    pub legacy_progress_path: String,
    pub study_end_path: String,
    pub user_info_path: String,
    pub statistics_path: String,
    pub study_year: Option<i32>,
    pub subject_page_size: u32,
    pub course_page_size: u32,
    pub headers: BTreeMap<String, String>,
}
impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: "".into(),
            subject_query_path: "subject/query".into(),
            course_query_path: "subject/queryCourse".into(),
            study_start_path: "study/start".into(),
            study_progress_path: "study/progress".into(),
            legacy_progress_path: "study/progress2".into(),
            study_end_path: "study/v2/end".into(),
            user_info_path: "user/info".into(),
            statistics_path: "personal/totalStatistics".into(),
            study_year: None,
            subject_page_size: 12,
            course_page_size: 1000,
            headers: Default::default(),
        }
    }
}

impl Api {
    /// `base_url` with a trailing slash so joins append to its path.
    pub fn base(&self) -> Result<Url, url::ParseError> {
        let mut base = Url::parse(self.base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base)
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        resolve(&self.base()?, path.trim_start_matches('/'))
    }

    pub fn url(&self, path: &str) -> String {
        self.endpoint(path)
            .map(String::from)
            .unwrap_or_else(|_| path.to_string())
    }

    pub fn site_root(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base()?.origin().ascii_serialization())
    }

    fn endpoint_paths(&self) -> [&str; 8] {
        [
            self.subject_query_path.as_str(),
            self.course_query_path.as_str(),
            self.study_start_path.as_str(),
            self.study_progress_path.as_str(),
            self.legacy_progress_path.as_str(),
            self.study_end_path.as_str(),
            self.user_info_path.as_str(),
            self.statistics_path.as_str(),
        ]
    }

    pub fn year(&self) -> i32 {
        self.study_year
            .unwrap_or_else(|| time::OffsetDateTime::now_utc().year())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub id_card_hash: String,
    pub id_card_hash_env: String,
    pub cookie: String,
    pub cookie_env: String,
    pub resolve_retry_count: u32,
    pub resolve_retry_delay_seconds: u64,
}
impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            id_card_hash: "".into(),
            id_card_hash_env: "STUDY_PACER_ID_CARD_HASH".into(),
            cookie: "".into(),
            cookie_env: "STUDY_PACER_COOKIE".into(),
            resolve_retry_count: 3,
            resolve_retry_delay_seconds: 3,
        }
    }
}

impl IdentityConfig {
    pub fn configured_hash(&self) -> Option<String> {
        non_empty(&self.id_card_hash).or_else(|| env_value(&self.id_card_hash_env))
    }

    pub fn configured_cookie(&self) -> Option<String> {
        non_empty(&self.cookie).or_else(|| env_value(&self.cookie_env))
    }
}

fn resolve(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    match Url::parse(path) {
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(path),
        other => other,
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

fn env_value(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    std::env::var(name).ok().and_then(|v| non_empty(&v))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub default_ms: u64,
    pub report_ms: u64,
    pub statistics_ms: u64,
}
impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_ms: 30_000,
            report_ms: 15_000,
            statistics_ms: 60_000,
        }
    }
}

impl Timeouts {
    pub fn default_call(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    pub fn report(&self) -> Duration {
        Duration::from_millis(self.report_ms)
    }

    pub fn statistics(&self) -> Duration {
        Duration::from_millis(self.statistics_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub progress_interval_seconds: u64,
    pub progress_duration_seconds: u64,
    pub last_report_before_end_seconds: u64,
    pub final_wait_margin_seconds: u64,
    pub course_interval_seconds: u64,
    pub settle_delay_seconds: u64,
    pub legacy_retry_delay_ms: u64,
    pub auth_exit_grace_seconds: u64,
}
impl Default for Pacing {
    fn default() -> Self {
        Self {
            progress_interval_seconds: 3,
            progress_duration_seconds: 300,
            last_report_before_end_seconds: 60,
            final_wait_margin_seconds: 1,
            course_interval_seconds: 5,
            settle_delay_seconds: 5,
            legacy_retry_delay_ms: 500,
            auth_exit_grace_seconds: 2,
        }
    }
}

impl Pacing {
    pub fn final_wait(&self) -> Duration {
        Duration::from_secs(self.last_report_before_end_seconds + self.final_wait_margin_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Completion {
    pub check_progress_after_course: bool,
    pub stop_at_percent: f64,
    pub studied_status_code: String,
    pub studied_status_text: String,
    pub no_assessment_type: String,
    pub auth_failure_markers: Vec<String>,
}
impl Default for Completion {
    fn default() -> Self {
        Self {
            check_progress_after_course: true,
            stop_at_percent: 100.0,
            studied_status_code: "2".into(),
            studied_status_text: "已学习".into(),
            no_assessment_type: "1".into(),
            auth_failure_markers: vec!["请求未认证".into(), "登录超时".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub course_page_template: String,
    pub home_url: String,
    pub headless: bool,
    pub user_agent: String,
    pub player_settle_seconds: u64,
    pub play_button_selectors: Vec<String>,
}
impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "".into(),
            course_page_template:
                "content#/commend/coursedetail?courseId={course_id}&flag=zt&courseListId={subject_id}"
                    .into(),
            home_url: "".into(),
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            player_settle_seconds: 5,
            play_button_selectors: vec![
                "button.vjs-big-play-button".into(),
                "button.vjs-play-control".into(),
            ],
        }
    }
}

impl BrowserConfig {
    pub fn course_page_url(
        &self,
        site_root: &Url,
        course_id: &str,
        subject_id: &str,
    ) -> Result<Url, url::ParseError> {
        let page = self
            .course_page_template
            .replace("{course_id}", course_id)
            .replace("{subject_id}", subject_id);
        resolve(site_root, &page)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub print_summary: bool,
    pub report_path: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            print_summary: true,
            report_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "study-pacer.log".into(),
        }
    }
}
