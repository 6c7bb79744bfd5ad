#![allow(dead_code)]

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use study_pacer::{
    browser::Browser, config::Config, context::SessionContext, error::CallError,
    identity::Identity, remote::RemoteApi, util::Sleeper,
};

pub const BASE: &str = "https://api.test";
pub const HASH: &str = "hash-1";

pub const SUBJECTS: &str = "subject/query";
pub const COURSES: &str = "subject/queryCourse";
pub const START: &str = "study/start";
pub const PROGRESS: &str = "study/progress";
pub const LEGACY: &str = "study/progress2";
pub const END: &str = "study/v2/end";
pub const STATS: &str = "personal/totalStatistics";
pub const USER_INFO: &str = "user/info";

pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.api.base_url = BASE.into();
    cfg.api.study_year = Some(2025);
    cfg.identity.id_card_hash = HASH.into();
    cfg.identity.id_card_hash_env = String::new();
    cfg.identity.cookie_env = String::new();
    cfg
}

#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: String,
    pub payload: Value,
    pub timeout: Duration,
}

/// Answers calls per endpoint: queued results first, then the endpoint's
/// fixed reply. Unrouted endpoints fail as dropped connections.
#[derive(Default)]
pub struct ScriptedApi {
    queued: RefCell<HashMap<String, VecDeque<Result<Value, CallError>>>>,
    fixed: HashMap<String, Value>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, endpoint: &str, body: Value) -> Self {
        self.fixed.insert(endpoint.to_string(), body);
        self
    }

    pub fn push(self, endpoint: &str, result: Result<Value, CallError>) -> Self {
        self.queued
            .borrow_mut()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == endpoint)
            .collect()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.endpoint).collect()
    }
}

impl RemoteApi for ScriptedApi {
    fn call(&self, url: &str, payload: &Value, timeout: Duration) -> Result<Value, CallError> {
        let endpoint = url
            .strip_prefix(BASE)
            .unwrap_or(url)
            .trim_start_matches('/')
            .to_string();
        self.calls.borrow_mut().push(Call {
            endpoint: endpoint.clone(),
            payload: payload.clone(),
            timeout,
        });
        if let Some(result) = self
            .queued
            .borrow_mut()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        match self.fixed.get(&endpoint) {
            Some(body) => Ok(body.clone()),
            None => Err(CallError::Transport(format!("no route for {endpoint}"))),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingBrowser {
    pub actions: Rc<RefCell<Vec<String>>>,
    pub fail_open: bool,
}

impl RecordingBrowser {
    pub fn actions(&self) -> Vec<String> {
        self.actions.borrow().clone()
    }
}

impl Browser for RecordingBrowser {
    fn open_course_page(&self, course_id: &str, subject_id: &str) -> Result<()> {
        self.actions
            .borrow_mut()
            .push(format!("open {course_id} {subject_id}"));
        if self.fail_open {
            return Err(anyhow!("player did not load"));
        }
        Ok(())
    }

    fn refresh_and_resume_playback(&self) -> Result<()> {
        self.actions.borrow_mut().push("refresh".into());
        Ok(())
    }

    fn navigate_home(&self) -> Result<()> {
        self.actions.borrow_mut().push("home".into());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingSleeper {
    pub sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn seconds(&self) -> Vec<f64> {
        self.sleeps.borrow().iter().map(Duration::as_secs_f64).collect()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

pub fn context(browser: &RecordingBrowser) -> SessionContext {
    SessionContext::new(Identity::new(HASH), Box::new(browser.clone()))
}

pub fn ok() -> Value {
    json!({"success": true, "data": {}})
}

pub fn listing(rows: Vec<Value>) -> Value {
    json!({"success": true, "datalist": rows})
}

pub fn course_row(id: &str, duration: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Course {id}"),
        "studyStatus": status,
        "showStatusMsg": "",
        "showCourseDuration": duration,
        "assessementType": "1",
    })
}

pub fn stats(total: &str, completed: &str) -> Value {
    json!({"success": true, "data": {"ANALYSIS_HOURS_NUM": total, "totalHours": completed}})
}
