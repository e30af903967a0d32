//! Server-side validation settings.
//!
//! Values come from built-in defaults, overridden either by environment
//! variables ([`ValidationConfig::from_env`]) or by a TOML file
//! ([`ValidationConfig::load`]).

use std::path::Path;

use pushgate_state::ProjectName;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PersonIdent;

/// Default hard limit of files per change.
pub const DEFAULT_MAX_FILES: u64 = 100_000;

/// Errors produced while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Settings consumed by the validator factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Canonical URL of the web UI, e.g. `https://review.example.com/`.
    pub canonical_web_url: Option<String>,

    /// Overrides the generated commit-msg hook installation command.
    pub install_commit_msg_hook_command: Option<String>,

    /// Maximum number of files a single change may touch.
    pub max_files: u64,

    /// Identity the server uses for commits it creates itself.
    pub server_ident: PersonIdent,

    /// Root project every project inherits from.
    pub all_projects: ProjectName,

    /// Project holding accounts and groups.
    pub all_users: ProjectName,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            canonical_web_url: None,
            install_commit_msg_hook_command: None,
            max_files: DEFAULT_MAX_FILES,
            server_ident: PersonIdent::new("Code Review", "codereview@localhost"),
            all_projects: ProjectName::new("All-Projects"),
            all_users: ProjectName::new("All-Users"),
        }
    }
}

impl ValidationConfig {
    /// Defaults overridden by `PUSHGATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup("PUSHGATE_WEB_URL") {
            config.canonical_web_url = Some(url);
        }
        if let Some(cmd) = lookup("PUSHGATE_HOOK_COMMAND") {
            config.install_commit_msg_hook_command = Some(cmd);
        }
        if let Some(raw) = lookup("PUSHGATE_MAX_FILES") {
            config.max_files = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PUSHGATE_MAX_FILES".to_string(),
                value: raw.clone(),
            })?;
        }
        if let Some(name) = lookup("PUSHGATE_SERVER_NAME") {
            config.server_ident.name = name;
        }
        if let Some(email) = lookup("PUSHGATE_SERVER_EMAIL") {
            config.server_ident.email = email;
        }
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Canonical web URL with a guaranteed trailing `/`.
    pub fn web_url(&self) -> Option<String> {
        self.canonical_web_url.as_ref().map(|u| {
            if u.ends_with('/') {
                u.clone()
            } else {
                format!("{u}/")
            }
        })
    }
}
