//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.csuite/config.json`) and environment.
//! Secrets and channel ids are usually supplied through the environment; env values win over the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Log filter passed to env_logger (e.g. "info", "debug"). Overridden by LOG_LEVEL env.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dashboard API bind and port.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Slack workspace credentials and the c-suite channel.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Active persona and reply keywords.
    #[serde(default)]
    pub agents: AgentsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dashboard: DashboardConfig::default(),
            slack: SlackConfig::default(),
            agents: AgentsConfig::default(),
        }
    }
}

/// Dashboard HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// Port for the dashboard API (default 3001).
    #[serde(default = "default_dashboard_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_dashboard_bind")]
    pub bind: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_dashboard_port() -> u16 {
    3001
}

fn default_dashboard_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_dashboard_port(),
            bind: default_dashboard_bind(),
        }
    }
}

/// Slack app credentials. Every field can be overridden from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfig {
    /// Bot token (xoxb-...). Overridden by SLACK_BOT_TOKEN env.
    pub bot_token: Option<String>,
    /// App-level token (xapp-...) used to open Socket Mode connections. Overridden by SLACK_APP_TOKEN env.
    pub app_token: Option<String>,
    /// Request signing secret. Overridden by SLACK_SIGNING_SECRET env. Not needed in Socket Mode.
    pub signing_secret: Option<String>,
    /// Channel the agent listens to for strategy discussions. Overridden by CSUITE_CHANNEL_ID env.
    pub csuite_channel_id: Option<String>,
}

/// Agent persona selection and keyword sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    /// Roster id of the persona to run (default "ceo").
    pub active: Option<String>,
    /// Keywords that select the strategic reply for mentions and direct messages.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Keywords that make the agent answer in the c-suite channel.
    #[serde(default = "default_csuite_keywords")]
    pub csuite_keywords: Vec<String>,
    /// Model provider API key. Overridden by OPENAI_API_KEY env. Replies are rule-based; the key is only reported.
    pub model_api_key: Option<String>,
}

fn default_keywords() -> Vec<String> {
    vec!["strategy".to_string()]
}

fn default_csuite_keywords() -> Vec<String> {
    vec!["strategy".to_string(), "decision".to_string()]
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            active: None,
            keywords: default_keywords(),
            csuite_keywords: default_csuite_keywords(),
            model_api_key: None,
        }
    }
}

const DEFAULT_PERSONA: &str = "ceo";

/// Trimmed, non-empty value from env; falls back to the trimmed, non-empty config value.
fn env_or_config(env_value: Option<String>, config_value: Option<&str>) -> Option<String> {
    env_value
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config_value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Resolve the Slack bot token: env SLACK_BOT_TOKEN overrides config.
pub fn resolve_slack_bot_token(config: &Config) -> Option<String> {
    env_or_config(env_var("SLACK_BOT_TOKEN"), config.slack.bot_token.as_deref())
}

/// Resolve the Slack app-level token: env SLACK_APP_TOKEN overrides config.
pub fn resolve_slack_app_token(config: &Config) -> Option<String> {
    env_or_config(env_var("SLACK_APP_TOKEN"), config.slack.app_token.as_deref())
}

/// Resolve the Slack signing secret: env SLACK_SIGNING_SECRET overrides config.
pub fn resolve_slack_signing_secret(config: &Config) -> Option<String> {
    env_or_config(
        env_var("SLACK_SIGNING_SECRET"),
        config.slack.signing_secret.as_deref(),
    )
}

/// Resolve the c-suite channel id: env CSUITE_CHANNEL_ID overrides config.
pub fn resolve_csuite_channel(config: &Config) -> Option<String> {
    env_or_config(
        env_var("CSUITE_CHANNEL_ID"),
        config.slack.csuite_channel_id.as_deref(),
    )
}

/// Resolve the model provider key: env OPENAI_API_KEY overrides config.
pub fn resolve_model_api_key(config: &Config) -> Option<String> {
    env_or_config(
        env_var("OPENAI_API_KEY"),
        config.agents.model_api_key.as_deref(),
    )
}

/// Resolve the log filter: env LOG_LEVEL overrides config, "info" when both are empty.
pub fn resolve_log_level(config: &Config) -> String {
    env_or_config(env_var("LOG_LEVEL"), Some(config.log_level.as_str()))
        .unwrap_or_else(default_log_level)
}

/// Roster id of the persona to run; "ceo" when unset.
pub fn resolve_active_persona(config: &Config) -> String {
    env_or_config(None, config.agents.active.as_deref())
        .unwrap_or_else(|| DEFAULT_PERSONA.to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CSUITE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".csuite").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (CSUITE_CONFIG_PATH or ~/.csuite/config.json).
/// Missing file => default config. Returns the config and the path that was used.
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
