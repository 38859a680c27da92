//! config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! One TOML file describes the sync target and behavior. Unknown fields are
//! rejected so typos surface as errors instead of silently disabling
//! options.
//!
//! # Locations
//!
//! Searched in order:
//! 1. An explicit path (`--config` flag)
//! 2. `$GHSYNC_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/ghsync/config.toml`
//! 4. `~/.ghsync/config.toml`
//!
//! With no file found, defaults apply (syncing disabled). The token may be
//! supplied via `$GHSYNC_TOKEN` instead of being stored in the file.
//!
//! # Example
//!
//! ```toml
//! enabled = true
//! repository = "octocat/blog"
//! branch = "main"
//! dispatch_delay = 2
//! paths = ["content", "resources/blueprints"]
//!
//! [committer]
//! name = "Content Sync"
//! email = "sync@example.com"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CommitAuthor;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GHSYNC_CONFIG";

/// Environment variable overriding the configured token.
pub const TOKEN_ENV: &str = "GHSYNC_TOKEN";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: '{0}'")]
    NotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Committer identity sent on every commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Committer {
    #[serde(default = "default_committer_name")]
    pub name: String,
    #[serde(default = "default_committer_email")]
    pub email: String,
}

impl Default for Committer {
    fn default() -> Self {
        Self {
            name: default_committer_name(),
            email: default_committer_email(),
        }
    }
}

impl Committer {
    /// The committer as a commit identity. Valid after [`SyncConfig::validate`].
    pub fn to_author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The recognized configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Whether the event subscriber registers at all.
    #[serde(default)]
    pub enabled: bool,

    /// Owner-qualified repository ("owner/repo").
    #[serde(default)]
    pub repository: String,

    /// Branch whose ref is read and moved.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Bearer token; `$GHSYNC_TOKEN` takes precedence.
    #[serde(default)]
    pub token: String,

    /// Debounce window in minutes between an event and the sync run.
    #[serde(default = "default_dispatch_delay")]
    pub dispatch_delay: u64,

    /// Pending-store backend name; unset selects the in-process store.
    #[serde(default)]
    pub queue_connection: Option<String>,

    #[serde(default)]
    pub committer: Committer,

    /// Attribute commits to the identity that triggered the event.
    #[serde(default = "default_true")]
    pub use_authenticated: bool,

    /// Ordered list of tracked root directories, relative to the base path.
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,

    /// Event categories to suppress entirely.
    #[serde(default)]
    pub ignored_events: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repository: String::new(),
            branch: default_branch(),
            token: String::new(),
            dispatch_delay: default_dispatch_delay(),
            queue_connection: None,
            committer: Committer::default(),
            use_authenticated: true,
            paths: default_paths(),
            ignored_events: Vec::new(),
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_dispatch_delay() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_committer_name() -> String {
    "Content Sync".to_string()
}

fn default_committer_email() -> String {
    "sync@example.com".to_string()
}

fn default_paths() -> Vec<String> {
    vec![
        "content".to_string(),
        "resources/blueprints".to_string(),
        "resources/fieldsets".to_string(),
        "resources/forms".to_string(),
        "resources/users".to_string(),
    ]
}

impl SyncConfig {
    /// Load configuration, searching standard locations.
    ///
    /// An explicitly given path must exist; missing files elsewhere in the
    /// search order are skipped and defaults apply when nothing is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::read_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Self::read_file(&path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("ghsync/config.toml");
            if path.exists() {
                return Self::read_file(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".ghsync/config.toml");
            if path.exists() {
                return Self::read_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Read and parse one config file.
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate the fields any remote operation depends on.
    ///
    /// Call before constructing a remote client or recorder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parts: Vec<&str> = self.repository.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::InvalidValue(format!(
                "repository must be 'owner/repo', got '{}'",
                self.repository
            )));
        }

        if self.branch.is_empty() {
            return Err(ConfigError::InvalidValue("branch must not be empty".into()));
        }

        if self.resolved_token().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "token must be set (config file or ${})",
                TOKEN_ENV
            )));
        }

        if self.committer.name.is_empty() || self.committer.email.is_empty() {
            return Err(ConfigError::InvalidValue(
                "committer name and email must not be empty".into(),
            ));
        }

        for path in &self.paths {
            let valid = !path.is_empty()
                && !path.starts_with('/')
                && !path.ends_with('/')
                && Path::new(path)
                    .components()
                    .all(|c| matches!(c, std::path::Component::Normal(_)));
            if !valid {
                return Err(ConfigError::InvalidValue(format!(
                    "tracked path must be a relative directory without '..', got '{}'",
                    path
                )));
            }
        }

        Ok(())
    }

    /// The token, preferring `$GHSYNC_TOKEN` over the config file.
    pub fn resolved_token(&self) -> String {
        std::env::var(TOKEN_ENV).unwrap_or_else(|_| self.token.clone())
    }

    /// The debounce window as a duration.
    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_secs(self.dispatch_delay * 60)
    }
}
