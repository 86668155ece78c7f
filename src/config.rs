//! Tool configuration.
//!
//! Settings come from an optional YAML file; anything not set there takes
//! its default. API credentials come from the environment, or from a `.env`
//! file in the working directory.

use crate::error::{CatalogError, Result};
use crate::schedule::{BroadcastSchedule, StartHour};
use crate::social::{KnownHandles, QuerySpec};
use crate::synth::{default_tag_rules, TagRule};
use chrono::{Duration, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Local config file name, looked up in the working directory.
pub const LOCAL_CONFIG: &str = "ilof.yaml";

pub const TOKEN_VAR: &str = "TWITTER_TOKEN";
pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the published episode site.
    pub site_url: String,
    /// The audio feed.
    pub feed_url: String,
    pub episode_dir: PathBuf,
    pub guest_file: PathBuf,

    pub host_handle: String,
    pub show_handle: String,
    pub trigger_phrases: Vec<String>,
    pub show_keyword: String,
    /// Handles that are never treated as guests.
    pub known_handles: Vec<String>,

    pub broadcast_days: Vec<Weekday>,
    /// IANA timezone name for the broadcast hour.
    pub broadcast_timezone: String,
    pub broadcast_hour: u32,
    pub grace_minutes: i64,
    pub min_poll_minutes: i64,
    pub max_poll_minutes: i64,
    pub poll_divisor: u32,

    /// Expected repository name of the `origin` remote; empty to skip.
    pub check_repo: String,
    pub tag_rules: Vec<TagRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: "https://inlieuof.fun".to_string(),
            feed_url: "https://feeds.acast.com/public/shows/in-lieu-of-fun".to_string(),
            episode_dir: PathBuf::from("_episodes"),
            guest_file: PathBuf::from("_data/guests.yaml"),
            host_handle: "benjaminwittes".to_string(),
            show_handle: "inlieuoffunshow".to_string(),
            trigger_phrases: vec!["today on".into(), "tonight on".into(), "tomorrow on".into()],
            show_keyword: "tonight".to_string(),
            known_handles: [
                "benjaminwittes",
                "klonick",
                "inlieuoffunshow",
                "lawfareblog",
                "youtube",
                "crowdcasthq",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            broadcast_days: vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
            broadcast_timezone: "America/New_York".to_string(),
            broadcast_hour: 17,
            grace_minutes: 60,
            min_poll_minutes: 1,
            max_poll_minutes: 90,
            poll_divisor: 7,
            check_repo: "inlieuoffun.github.io".to_string(),
            tag_rules: default_tag_rules(),
        }
    }
}

impl Config {
    /// Parses configuration text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| CatalogError::Config(e.to_string()))
    }

    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Otherwise `ilof.yaml` in the working
    /// directory is tried, then `ilof/config.yaml` under the user config
    /// directory. With no file at all, defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CatalogError::Config(format!("{}: {}", path.display(), e)))?;
            log::info!("Loaded config from {}", path.display());
            return Self::from_yaml(&text);
        }

        let mut candidates = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("ilof").join("config.yaml"));
        }
        for candidate in candidates {
            match std::fs::read_to_string(&candidate) {
                Ok(text) => {
                    log::info!("Loaded config from {}", candidate.display());
                    return Self::from_yaml(&text);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(CatalogError::Config(format!("{}: {}", candidate.display(), e)));
                }
            }
        }
        log::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// The broadcast schedule, with the start hour taken in the configured
    /// timezone.
    pub fn schedule(&self) -> Result<BroadcastSchedule> {
        let tz: Tz = self.broadcast_timezone.parse().map_err(|_| {
            CatalogError::Config(format!("unknown timezone {:?}", self.broadcast_timezone))
        })?;
        BroadcastSchedule::new(
            self.broadcast_days.clone(),
            StartHour::Local {
                tz,
                hour: self.broadcast_hour,
            },
            minutes("grace_minutes", self.grace_minutes)?,
            minutes("min_poll_minutes", self.min_poll_minutes)?,
            minutes("max_poll_minutes", self.max_poll_minutes)?,
            self.poll_divisor,
        )
    }

    pub fn query_spec(&self) -> QuerySpec {
        QuerySpec {
            host_handle: self.host_handle.clone(),
            show_handle: self.show_handle.clone(),
            trigger_phrases: self.trigger_phrases.clone(),
            show_keyword: self.show_keyword.clone(),
        }
    }

    pub fn known_handles(&self) -> KnownHandles {
        KnownHandles::new(&self.known_handles)
    }
}

fn minutes(key: &str, n: i64) -> Result<Duration> {
    Duration::try_minutes(n)
        .ok_or_else(|| CatalogError::Config(format!("{} is out of range: {}", key, n)))
}

/// Load a value from the .env file in `dir` by key name.
pub fn load_env_value(dir: &Path, key: &str) -> Option<String> {
    let content = std::fs::read_to_string(dir.join(".env")).ok()?;
    let prefix = format!("{}=", key);
    content.lines().find_map(|line| {
        let value = line
            .trim()
            .strip_prefix(&prefix)?
            .trim()
            .trim_matches('"')
            .trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Looks up a credential in the environment, then in `.env`. `help` says
/// where to get one.
pub fn credential(key: &str, help: &str) -> Result<String> {
    if let Ok(value) = std::env::var(key) {
        if !value.is_empty() {
            return Ok(value);
        }
    }
    let cwd = std::env::current_dir()?;
    load_env_value(&cwd, key).ok_or_else(|| {
        CatalogError::Config(format!("no {} is set in the environment; to get one, visit {}", key, help))
    })
}

pub fn twitter_token() -> Result<String> {
    credential(TOKEN_VAR, "https://developer.twitter.com/en/portal/dashboard")
}

pub fn youtube_api_key() -> Result<String> {
    credential(API_KEY_VAR, "https://console.developers.google.com/apis/credentials")
}
