use super::Browser;
use crate::config::{BrowserConfig, Config};
use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;
use tracing::{debug, info, warn};

const PLAY_SCRIPT: &str = r#"
const selectors = arguments[0];
for (const sel of selectors) {
    const button = document.querySelector(sel);
    if (button) { button.click(); return sel; }
}
const generic = Array.from(document.querySelectorAll('button')).find(
    (b) => /play/i.test(b.className) || /播放|Play/.test(b.textContent)
);
if (generic) { generic.click(); return 'generic'; }
return null;
"#;

pub struct WebDriverBrowser {
    client: Client,
    session_url: String,
    home_url: String,
    site_root: Url,
    pages: BrowserConfig,
    player_settle: Duration,
}

impl WebDriverBrowser {
    pub fn connect(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeouts.default_call())
            .build()
            .with_context(|| "building WebDriver client")?;
        let endpoint = cfg.browser.webdriver_url.trim_end_matches('/').to_string();

        let mut args = vec![
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-background-timer-throttling".to_string(),
            "--disable-backgrounding-occluded-windows".to_string(),
            "--disable-renderer-backgrounding".to_string(),
        ];
        if !cfg.browser.user_agent.is_empty() {
            args.push(format!("--user-agent={}", cfg.browser.user_agent));
        }
        if cfg.browser.headless {
            args.push("--headless".to_string());
        }

        let caps = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-automation"],
                    }
                }
            }
        });
        let reply = send(client.post(format!("{endpoint}/session")).json(&caps))
            .with_context(|| format!("creating WebDriver session at {endpoint}"))?;
        let session_id = reply
            .pointer("/value/sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("WebDriver reply carried no sessionId"))?;
        info!("WebDriver session {session_id} started");

        let site_root = cfg
            .api
            .site_root()
            .with_context(|| format!("deriving site root from {}", cfg.api.base_url))?;
        let home_url = if cfg.browser.home_url.is_empty() {
            site_root.to_string()
        } else {
            cfg.browser.home_url.clone()
        };

        let browser = Self {
            client,
            session_url: format!("{endpoint}/session/{session_id}"),
            home_url,
            site_root,
            pages: cfg.browser.clone(),
            player_settle: Duration::from_secs(cfg.browser.player_settle_seconds),
        };

        if let Some(cookie) = cfg.identity.configured_cookie() {
            browser.install_cookies(&cookie)?;
        }
        Ok(browser)
    }

    fn command(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.session_url, path);
        send(self.client.post(&url).json(&body))
            .with_context(|| format!("WebDriver command {path}"))
    }

    fn navigate(&self, url: &str) -> Result<()> {
        self.command("url", json!({ "url": url }))?;
        Ok(())
    }

    fn install_cookies(&self, header: &str) -> Result<()> {
        self.navigate(&self.home_url)?;
        for pair in header.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            self.command(
                "cookie",
                json!({ "cookie": { "name": name.trim(), "value": value.trim() } }),
            )?;
        }
        self.command("refresh", json!({}))?;
        debug!("session cookies installed");
        Ok(())
    }

    fn click_play(&self) -> Result<()> {
        std::thread::sleep(self.player_settle);
        let reply = self.command(
            "execute/sync",
            json!({ "script": PLAY_SCRIPT, "args": [self.pages.play_button_selectors] }),
        )?;
        match reply.get("value").and_then(Value::as_str) {
            Some(selector) => {
                info!("clicked play button: {selector}");
                Ok(())
            }
            None => Err(anyhow!("no play button found")),
        }
    }
}

impl Browser for WebDriverBrowser {
    fn open_course_page(&self, course_id: &str, subject_id: &str) -> Result<()> {
        let url = self
            .pages
            .course_page_url(&self.site_root, course_id, subject_id)?;
        info!("opening course page {url}");
        self.navigate(url.as_str())?;
        self.click_play()
    }

    fn refresh_and_resume_playback(&self) -> Result<()> {
        info!("refreshing page and resuming playback");
        self.command("refresh", json!({}))?;
        self.click_play()
    }

    fn navigate_home(&self) -> Result<()> {
        if let Err(err) = self.navigate(&self.home_url) {
            warn!("navigate home failed, refreshing instead: {err:#}");
            self.command("refresh", json!({}))?;
        }
        debug!("back on home page");
        Ok(())
    }
}

impl Drop for WebDriverBrowser {
    fn drop(&mut self) {
        match self.client.delete(&self.session_url).send() {
            Ok(_) => info!("WebDriver session closed"),
            Err(err) => warn!("closing WebDriver session failed: {err}"),
        }
    }
}

fn send(req: reqwest::blocking::RequestBuilder) -> Result<Value> {
    let response = req.send()?;
    let status = response.status();
    let body: Value = response.json().unwrap_or(Value::Null);
    if !status.is_success() {
        let message = body
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or("no message");
        return Err(anyhow!("WebDriver returned {status}: {message}"));
    }
    Ok(body)
}
