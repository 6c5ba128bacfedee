//! core::config::schema
//!
//! The two TOML files git-stack reads.
//!
//! The user file is `$GIT_STACK_CONFIG`, else
//! `$XDG_CONFIG_HOME/git-stack/config.toml`, else
//! `~/.git-stack/config.toml`. The repository file is
//! `.git/git-stack/config.toml` and wins over the user file.
//!
//! Both reject unknown keys. `validate` runs after parsing.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Upper bound on concurrent remote calls; hosts rate-limit well below this.
pub const MAX_CONCURRENCY: usize = 32;

/// User-wide settings.
///
/// ```toml
/// forge = "gitlab"
/// concurrency = 8
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Provider for remotes whose host is not recognized.
    pub forge: Option<String>,
    pub concurrency: Option<usize>,
}

impl GlobalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_forge(self.forge.as_deref())?;
        validate_concurrency(self.concurrency)
    }
}

/// Per-repository overrides.
///
/// ```toml
/// default_branch = "main"
/// remote = "origin"
/// forge = "gitlab"
/// api_base = "https://gitlab.example.com/api/v4"
/// concurrency = 4
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Trunk; detected from `main`/`master` when unset.
    pub default_branch: Option<String>,
    /// Remote to push to; `origin` when unset.
    pub remote: Option<String>,
    pub forge: Option<String>,
    /// REST root for self-hosted instances.
    pub api_base: Option<String>,
    /// Cap on in-flight remote calls.
    pub concurrency: Option<usize>,
}

impl RepoConfig {
    /// Fails with [`ConfigError::InvalidValue`] on the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.default_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("default_branch: {e}"))
            })?;
        }

        if let Some(remote) = &self.remote {
            if remote.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote cannot be empty".to_string(),
                ));
            }
        }

        if let Some(api_base) = &self.api_base {
            if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "api_base '{api_base}' must be an http(s) URL"
                )));
            }
        }

        validate_forge(self.forge.as_deref())?;
        validate_concurrency(self.concurrency)
    }
}

fn validate_forge(forge: Option<&str>) -> Result<(), ConfigError> {
    if let Some(forge) = forge {
        let known = crate::forge::valid_forge_names();
        if !known.contains(&forge) {
            return Err(ConfigError::InvalidValue(format!(
                "unknown forge '{forge}' (expected {})",
                known.join(" or ")
            )));
        }
    }
    Ok(())
}

fn validate_concurrency(concurrency: Option<usize>) -> Result<(), ConfigError> {
    match concurrency {
        Some(n) if n == 0 || n > MAX_CONCURRENCY => Err(ConfigError::InvalidValue(format!(
            "concurrency must be between 1 and {MAX_CONCURRENCY}, got {n}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.forge.is_none());
            assert!(config.concurrency.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn known_forges_accepted() {
            for forge in ["gitlab", "github"] {
                let config = GlobalConfig {
                    forge: Some(forge.to_string()),
                    ..Default::default()
                };
                assert!(config.validate().is_ok(), "{forge} should be valid");
            }
        }

        #[test]
        fn unknown_forge_rejected() {
            let config = GlobalConfig {
                forge: Some("bitbucket".to_string()),
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("bitbucket"));
        }

        #[test]
        fn zero_concurrency_rejected() {
            let config = GlobalConfig {
                concurrency: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn parses_from_toml() {
            let parsed: GlobalConfig = toml::from_str("forge = \"gitlab\"\nconcurrency = 8").unwrap();
            assert_eq!(parsed.forge.as_deref(), Some("gitlab"));
            assert_eq!(parsed.concurrency, Some(8));
        }
    }

    mod repo_config {
        use super::*;

        #[test]
        fn valid_default_branch() {
            let config = RepoConfig {
                default_branch: Some("develop".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn invalid_default_branch() {
            let config = RepoConfig {
                default_branch: Some("invalid..name".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn empty_remote_rejected() {
            let config = RepoConfig {
                remote: Some(String::new()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn api_base_must_be_http() {
            let config = RepoConfig {
                api_base: Some("gitlab.example.com".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());

            let config = RepoConfig {
                api_base: Some("https://gitlab.example.com/api/v4".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn concurrency_upper_bound() {
            let config = RepoConfig {
                concurrency: Some(MAX_CONCURRENCY + 1),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn reject_unknown_fields() {
            let toml = r#"
                default_branch = "main"
                trunk = "main"
            "#;

            let result: Result<RepoConfig, _> = toml::from_str(toml);
            assert!(result.is_err());
        }
    }
}
