//! phaseshift.toml configuration parser.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoverConfig {
    pub credentials: CredentialsConfig,
    pub rooms: RoomsConfig,
    pub roles: RolesConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub requests: RequestsConfig,
}

/// Execution resources. Every token drives one platform session; moves are
/// spread across all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub tokens: Vec<Credential>,
}

/// A platform credential. Redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsConfig {
    /// Display name of the category holding the shared room.
    pub day_category: String,
    /// Display name of the category holding the private rooms.
    pub night_category: String,
    /// Display name of the shared room.
    pub shared_room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Display name of the facilitator role.
    pub facilitator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_jitter_window_ms")]
    pub jitter_window_ms: u64,
}

impl ExecutionConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn jitter_window(&self) -> Duration {
        Duration::from_millis(self.jitter_window_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            deadline_seconds: default_deadline_seconds(),
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            jitter_window_ms: default_jitter_window_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsConfig {
    /// Timeout applied to each topology query.
    #[serde(default = "default_per_request_seconds")]
    pub per_request_seconds: u64,
    #[serde(default = "default_member_page_size")]
    pub member_page_size: usize,
    /// Upper bound on the number of roster entries fetched per snapshot.
    #[serde(default = "default_roster_limit")]
    pub roster_limit: usize,
}

impl RequestsConfig {
    pub fn per_request_timeout(&self) -> Duration {
        Duration::from_secs(self.per_request_seconds)
    }
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            per_request_seconds: default_per_request_seconds(),
            member_page_size: default_member_page_size(),
            roster_limit: default_roster_limit(),
        }
    }
}

fn default_deadline_seconds() -> u64 {
    15
}

fn default_workers() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    50
}

fn default_jitter_window_ms() -> u64 {
    1000
}

fn default_per_request_seconds() -> u64 {
    5
}

fn default_member_page_size() -> usize {
    1000
}

fn default_roster_limit() -> usize {
    1000
}

/// A configuration value is missing or out of range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no platform credentials specified")]
    NoCredentials,

    #[error("credential #{0} is empty")]
    EmptyCredential(usize),

    #[error("{0} name is empty")]
    EmptyName(&'static str),

    #[error("invalid deadline {0} (must be >0) for movement batches")]
    InvalidDeadline(u64),

    #[error("invalid worker count {0} (must be >0)")]
    InvalidWorkers(usize),

    #[error("invalid attempt limit {0} (must be >0)")]
    InvalidAttempts(u32),

    #[error("invalid per-request timeout {0} (must be >0)")]
    InvalidRequestTimeout(u64),

    #[error("invalid member page size {0} (must be >0)")]
    InvalidPageSize(usize),

    #[error("invalid roster limit {0} (must be >0)")]
    InvalidRosterLimit(usize),
}

impl MoverConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: MoverConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every option for a usable value. Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.tokens.is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        if let Some(idx) = self
            .credentials
            .tokens
            .iter()
            .position(|t| t.expose().trim().is_empty())
        {
            return Err(ConfigError::EmptyCredential(idx));
        }

        let names = [
            ("day category", &self.rooms.day_category),
            ("night category", &self.rooms.night_category),
            ("shared room", &self.rooms.shared_room),
            ("facilitator role", &self.roles.facilitator),
        ];
        if let Some((what, _)) = names.iter().find(|(_, name)| name.trim().is_empty()) {
            return Err(ConfigError::EmptyName(*what));
        }

        let exec = &self.execution;
        if exec.deadline_seconds == 0 {
            return Err(ConfigError::InvalidDeadline(exec.deadline_seconds));
        }
        if exec.workers == 0 {
            return Err(ConfigError::InvalidWorkers(exec.workers));
        }
        if exec.max_attempts == 0 {
            return Err(ConfigError::InvalidAttempts(exec.max_attempts));
        }

        let req = &self.requests;
        if req.per_request_seconds == 0 {
            return Err(ConfigError::InvalidRequestTimeout(req.per_request_seconds));
        }
        if req.member_page_size == 0 {
            return Err(ConfigError::InvalidPageSize(req.member_page_size));
        }
        if req.roster_limit == 0 {
            return Err(ConfigError::InvalidRosterLimit(req.roster_limit));
        }

        Ok(())
    }

    /// Scaffold a config with the conventional room and role names.
    pub fn scaffold(tokens: &[&str]) -> Self {
        MoverConfig {
            credentials: CredentialsConfig {
                tokens: tokens.iter().map(|t| Credential::new(*t)).collect(),
            },
            rooms: RoomsConfig {
                day_category: "Day Phase".to_string(),
                night_category: "Night Phase".to_string(),
                shared_room: "Town Square".to_string(),
            },
            roles: RolesConfig {
                facilitator: "Storyteller".to_string(),
            },
            execution: ExecutionConfig::default(),
            requests: RequestsConfig::default(),
        }
    }
}
