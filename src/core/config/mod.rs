//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! git-stack has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GIT_STACK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/git-stack/config.toml`
//! 3. `~/.git-stack/config.toml`
//!
//! # Repo Config Location
//!
//! `git-stack/config.toml` inside the repository's git directory.
//!
//! # Example
//!
//! ```no_run
//! use git_stack::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo/.git"))).unwrap();
//!
//! println!("Remote: {}", config.remote());
//! println!("Concurrency: {}", config.concurrency());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::core::types::BranchName;

/// Concurrency used when nothing is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
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

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: repo config overrides global
/// config, which overrides built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if present)
    pub repo: Option<RepoConfig>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// `git_dir` is the repository's git directory; when given, the repo
    /// config inside it is loaded too.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated. Missing files are not an error.
    pub fn load(git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let global_path = Self::global_candidates().into_iter().find(|p| p.exists());
        Self::load_from(global_path.as_deref(), git_dir)
    }

    /// Load configuration from an explicit global file and git directory.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_from(global_path: Option<&Path>, git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let global = match global_path {
            Some(path) => read_toml::<GlobalConfig>(path)?,
            None => GlobalConfig::default(),
        };

        let repo = match git_dir.map(Self::repo_config_path) {
            Some(path) if path.exists() => Some(read_toml::<RepoConfig>(&path)?),
            _ => None,
        };

        global.validate()?;
        if let Some(repo) = &repo {
            repo.validate()?;
        }

        Ok(Self { global, repo })
    }

    /// Global config locations, most specific first.
    fn global_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var("GIT_STACK_CONFIG") {
            candidates.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("git-stack/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".git-stack/config.toml"));
        }
        candidates
    }

    /// The repo config path inside `git_dir`.
    pub fn repo_config_path(git_dir: &Path) -> PathBuf {
        git_dir.join("git-stack/config.toml")
    }

    /// Configured default branch, if any.
    ///
    /// Validated at load time, so a configured value is always a valid name.
    pub fn default_branch(&self) -> Option<BranchName> {
        self.repo
            .as_ref()
            .and_then(|r| r.default_branch.as_deref())
            .and_then(|name| BranchName::new(name).ok())
    }

    /// Remote name, `origin` unless configured.
    pub fn remote(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Forge override, repo before global.
    pub fn forge(&self) -> Option<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.forge.as_deref())
            .or(self.global.forge.as_deref())
    }

    /// API base URL override for self-hosted forges.
    pub fn api_base(&self) -> Option<&str> {
        self.repo.as_ref().and_then(|r| r.api_base.as_deref())
    }

    /// Maximum concurrent remote operations.
    pub fn concurrency(&self) -> usize {
        self.repo
            .as_ref()
            .and_then(|r| r.concurrency)
            .or(self.global.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    debug!(path = %path.display(), "reading config");
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_repo_config(git_dir: &Path, contents: &str) {
        let path = Config::repo_config_path(git_dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn defaults_without_files() {
        let config = Config::load_from(None, None).unwrap();

        assert!(config.default_branch().is_none());
        assert_eq!(config.remote(), "origin");
        assert!(config.forge().is_none());
        assert_eq!(config.concurrency(), DEFAULT_CONCURRENCY);
    }

    #[test]
    fn missing_repo_file_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(None, Some(temp.path())).unwrap();
        assert!(config.repo.is_none());
    }

    #[test]
    fn load_global_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "forge = \"github\"\nconcurrency = 2").unwrap();

        let config = Config::load_from(Some(&path), None).unwrap();

        assert_eq!(config.forge(), Some("github"));
        assert_eq!(config.concurrency(), 2);
    }

    #[test]
    fn load_repo_file() {
        let temp = TempDir::new().unwrap();
        write_repo_config(
            temp.path(),
            r#"
            default_branch = "develop"
            remote = "upstream"
            api_base = "https://gitlab.example.com/api/v4"
            "#,
        );

        let config = Config::load_from(None, Some(temp.path())).unwrap();

        assert_eq!(config.default_branch().unwrap().as_str(), "develop");
        assert_eq!(config.remote(), "upstream");
        assert_eq!(config.api_base(), Some("https://gitlab.example.com/api/v4"));
    }

    #[test]
    fn repo_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        fs::write(&global, "forge = \"github\"\nconcurrency = 2").unwrap();
        write_repo_config(temp.path(), "forge = \"gitlab\"\nconcurrency = 6");

        let config = Config::load_from(Some(&global), Some(temp.path())).unwrap();

        assert_eq!(config.forge(), Some("gitlab"));
        assert_eq!(config.concurrency(), 6);
    }

    #[test]
    fn invalid_default_branch_rejected() {
        let temp = TempDir::new().unwrap();
        write_repo_config(temp.path(), "default_branch = \"invalid..name\"");

        let result = Config::load_from(None, Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        write_repo_config(temp.path(), "default_branch = \"main\"\nunknown = true");

        let result = Config::load_from(None, Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn unreadable_global_path_reports_path() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");

        let err = Config::load_from(Some(&missing), None).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
