use crate::{
    config::Config,
    remote::{RemoteApi, envelope},
    util::{Sleeper, secs},
};
use anyhow::{Result, anyhow};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id_card_hash: String,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(id_card_hash: impl Into<String>) -> Self {
        Self {
            id_card_hash: id_card_hash.into(),
            display_name: None,
        }
    }

    pub fn resolve(cfg: &Config, api: &dyn RemoteApi, sleeper: &dyn Sleeper) -> Result<Self> {
        if let Some(hash) = cfg.identity.configured_hash() {
            info!("using configured identity");
            return Ok(Self::new(hash));
        }

        let url = cfg.api.url(&cfg.api.user_info_path);
        let attempts = cfg.identity.resolve_retry_count.max(1);
        for attempt in 1..=attempts {
            match api.call(&url, &json!({}), cfg.timeouts.default_call()) {
                Ok(body) => {
                    if let Some(identity) = from_user_info(&body) {
                        info!(
                            "identity resolved for {} (attempt {attempt}/{attempts})",
                            identity.display_name.as_deref().unwrap_or("unknown user")
                        );
                        return Ok(identity);
                    }
                    warn!("user info response carried no idCardHash (attempt {attempt}/{attempts})");
                }
                Err(err) => {
                    warn!(kind = ?err.kind(), "user info request failed (attempt {attempt}/{attempts}): {err}");
                }
            }
            if attempt < attempts {
                sleeper.sleep(secs(cfg.identity.resolve_retry_delay_seconds));
            }
        }

        Err(anyhow!(
            "could not resolve idCardHash after {attempts} attempts; set identity.id_card_hash or ${}",
            cfg.identity.id_card_hash_env
        ))
    }
}

fn from_user_info(body: &Value) -> Option<Identity> {
    if !envelope::acknowledged(body) {
        return None;
    }
    let data = body.get("data")?;
    let hash = data.get("idCardHash").and_then(envelope::loose_text)?;
    if hash.is_empty() {
        return None;
    }
    Some(Identity {
        id_card_hash: hash,
        display_name: data.get("name").and_then(Value::as_str).map(str::to_string),
    })
}
