// src/config.rs
//! Agent configuration: TOML file with field defaults, plus env-var
//! overrides for the SMTP transport so credentials stay out of the file.
//!
//! Resolution order for the file itself:
//! 1) `--config <path>` (handled by the CLI)
//! 2) $MIXSITE_CONFIG_PATH
//! 3) config/agent.toml, if present
//! 4) built-in defaults

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const ENV_CONFIG_PATH: &str = "MIXSITE_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

fn default_username() -> String {
    "djjackspace".to_string()
}
fn default_index_file() -> PathBuf {
    PathBuf::from("index.html")
}
fn default_database_file() -> PathBuf {
    PathBuf::from("mixsite_agent.db")
}
fn default_log_file() -> PathBuf {
    PathBuf::from("mixsite_agent.log")
}
fn default_fetch_limit() -> usize {
    20
}
fn default_check_interval_secs() -> u64 {
    1800
}
fn default_backup_retention_days() -> u64 {
    7
}
fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Mixcloud profile the agent watches.
    #[serde(default = "default_username")]
    pub username: String,
    /// Override the feed URL derived from `username`.
    #[serde(default)]
    pub feed_url: Option<String>,
    /// Override the profile page URL derived from `username`.
    #[serde(default)]
    pub profile_url: Option<String>,
    /// Public site URL, linked from notifications when set.
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
    #[serde(default = "default_database_file")]
    pub database_file: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_backup_retention_days")]
    pub backup_retention_days: u64,
    /// Absent means notifications are disabled.
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            feed_url: None,
            profile_url: None,
            site_url: None,
            index_file: default_index_file(),
            database_file: default_database_file(),
            log_file: default_log_file(),
            fetch_limit: default_fetch_limit(),
            check_interval_secs: default_check_interval_secs(),
            backup_retention_days: default_backup_retention_days(),
            smtp: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            user: String::new(),
            pass: String::new(),
            from: String::new(),
            to: String::new(),
        }
    }
}

impl AgentConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AgentConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config at {}", path.display()))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Env var path, then the conventional location, then pure defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// SMTP settings may come entirely from the environment (SMTP_HOST,
    /// SMTP_PORT, SMTP_USER, SMTP_PASS, NOTIFY_EMAIL_FROM,
    /// NOTIFY_EMAIL_TO); env values win over file values.
    fn apply_env_overrides(&mut self) {
        if env::var("SMTP_HOST").is_ok() && self.smtp.is_none() {
            self.smtp = Some(SmtpConfig::default());
        }
        if let Some(smtp) = self.smtp.as_mut() {
            if let Ok(v) = env::var("SMTP_HOST") {
                smtp.host = v;
            }
            if let Ok(v) = env::var("SMTP_PORT") {
                if let Ok(p) = v.parse() {
                    smtp.port = p;
                }
            }
            if let Ok(v) = env::var("SMTP_USER") {
                smtp.user = v;
            }
            if let Ok(v) = env::var("SMTP_PASS") {
                smtp.pass = v;
            }
            if let Ok(v) = env::var("NOTIFY_EMAIL_FROM") {
                smtp.from = v;
            }
            if let Ok(v) = env::var("NOTIFY_EMAIL_TO") {
                smtp.to = v;
            }
        }
    }

    pub fn feed_url(&self) -> String {
        self.feed_url
            .clone()
            .unwrap_or_else(|| format!("https://www.mixcloud.com/{}/feed/", self.username))
    }

    pub fn profile_url(&self) -> String {
        self.profile_url
            .clone()
            .unwrap_or_else(|| format!("https://www.mixcloud.com/{}/", self.username))
    }
}
