use super::RemoteApi;
use crate::config::Config;
use crate::error::CallError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct HttpApi {
    client: Client,
}

impl HttpApi {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        if !cfg.browser.user_agent.is_empty() {
            headers.insert(
                USER_AGENT,
                HeaderValue::from_str(&cfg.browser.user_agent).with_context(|| "user agent")?,
            );
        }
        if let Some(cookie) = cfg.identity.configured_cookie() {
            let mut value = HeaderValue::from_str(&cookie).with_context(|| "cookie header")?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }
        for (k, v) in &cfg.api.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .with_context(|| format!("header name: {k}"))?;
            let value = HeaderValue::from_str(v).with_context(|| format!("header value: {k}"))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(cfg.timeouts.default_call())
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self { client })
    }
}

impl RemoteApi for HttpApi {
    fn call(&self, url: &str, payload: &Value, timeout: Duration) -> Result<Value, CallError> {
        debug!("POST {url} timeout={timeout:?}");
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(payload)
            .send()
            .map_err(classify)?;

        let status = response.status();
        let bytes = response.bytes().map_err(classify)?;

        if !status.is_success() {
            return Err(CallError::HttpStatus {
                status: status.as_u16(),
                body: serde_json::from_slice(&bytes).ok(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| CallError::Parse(e.to_string()))
    }
}

fn classify(err: reqwest::Error) -> CallError {
    if err.is_timeout() {
        CallError::Timeout
    } else if err.is_decode() {
        CallError::Parse(err.to_string())
    } else {
        CallError::Transport(err.to_string())
    }
}
