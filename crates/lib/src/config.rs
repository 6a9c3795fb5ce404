//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.persona/config.json`) and environment.
//! The only external setting the app needs is where the remote agent lives.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Remote agent endpoint settings.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Remote agent endpoint and degraded-mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Base URL of the agent service; requests go to `{baseUrl}/call_agent`. Overridden by PERSONA_AGENT_URL env.
    #[serde(default = "default_agent_base_url")]
    pub base_url: String,

    /// When true (default), a failed round-trip is answered by the local demo responder instead of an error.
    #[serde(default = "default_fallback")]
    pub fallback: bool,

    /// Request timeout in seconds. Unset = whatever the HTTP client defaults to.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_agent_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_fallback() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_agent_base_url(),
            fallback: default_fallback(),
            timeout_secs: None,
        }
    }
}

/// Resolve the agent base URL: env PERSONA_AGENT_URL overrides config.
pub fn resolve_agent_base_url(config: &Config) -> String {
    let env = std::env::var("PERSONA_AGENT_URL").ok();
    pick_base_url(env.as_deref(), config)
}

/// First non-blank of `env`, then `agent.baseUrl`, then the built-in default. Values are trimmed.
pub fn pick_base_url(env: Option<&str>, config: &Config) -> String {
    env.and_then(non_empty)
        .or_else(|| non_empty(&config.agent.base_url))
        .unwrap_or_else(default_agent_base_url)
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PERSONA_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".persona").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or PERSONA_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
