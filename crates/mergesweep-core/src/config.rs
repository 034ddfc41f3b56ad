//! Configuration handling for mergesweep

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SweepError;
use crate::github::MAX_PER_PAGE;
use crate::protected::{DEFAULTS_PLACEHOLDER, ProtectedBranches, expand_protected_branches};

/// Per-repository config file name, looked up at the work tree root
pub const CONFIG_FILE_NAME: &str = ".mergesweep.json";

/// Supplies the effective protected branch list
pub trait ProtectedBranchProvider {
    /// Ordered, deduplicated, placeholder already expanded
    fn effective_protected_branches(&self) -> Vec<String>;
}

/// mergesweep configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Exact names, globs, `/regex/` entries and the `$defaults` placeholder
    #[serde(default = "default_protected_branches")]
    pub protected_branches: Vec<String>,

    /// Stop reading pull request history after this many PRs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pull_requests: Option<usize>,

    /// Deletions per progress batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pull requests per API page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Timeout for each git/gh call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_protected_branches() -> Vec<String> {
    vec![DEFAULTS_PLACEHOLDER.to_string()]
}

fn default_batch_size() -> usize {
    25
}

fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protected_branches: default_protected_branches(),
            max_pull_requests: None,
            batch_size: default_batch_size(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SweepError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            SweepError::Config(format!("invalid JSON in {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), SweepError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(path, json)?;
        Ok(())
    }

    /// `<config dir>/mergesweep/config.json`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mergesweep").join("config.json"))
    }

    /// Resolve the config to use
    ///
    /// An explicit path must exist. Otherwise the repository file, then the
    /// user file, then built-in defaults. Returns the file used, if any.
    pub fn discover(
        explicit: Option<&Path>,
        repo_root: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>), SweepError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let candidates = repo_root
            .map(|root| root.join(CONFIG_FILE_NAME))
            .into_iter()
            .chain(Self::user_config_path());

        for path in candidates {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading config");
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        if self.batch_size == 0 {
            return Err(SweepError::Config("batchSize must be at least 1".to_string()));
        }
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(SweepError::Config(format!(
                "perPage must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }
        if self.timeout_secs == 0 {
            return Err(SweepError::Config("timeoutSecs must be at least 1".to_string()));
        }
        if self.max_pull_requests == Some(0) {
            return Err(SweepError::Config(
                "maxPullRequests must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Compile the protected list; invalid patterns fail here
    pub fn protected(&self) -> Result<ProtectedBranches, SweepError> {
        ProtectedBranches::compile(&self.effective_protected_branches())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProtectedBranchProvider for Config {
    fn effective_protected_branches(&self) -> Vec<String> {
        expand_protected_branches(&self.protected_branches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protected::DEFAULT_PROTECTED_BRANCHES;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.protected_branches, vec!["$defaults"]);
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.per_page, 100);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.effective_protected_branches(),
            DEFAULT_PROTECTED_BRANCHES.to_vec()
        );
    }

    #[test]
    fn test_parse_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"protectedBranches": ["trunk", "$defaults"]}"#).unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.max_pull_requests, None);
        let effective = config.effective_protected_branches();
        assert_eq!(effective[0], "trunk");
        assert_eq!(effective[1], "main");
    }

    #[test]
    fn test_empty_protected_list_means_defaults() {
        let config: Config = serde_json::from_str(r#"{"protectedBranches": []}"#).unwrap();
        assert!(config.protected().unwrap().is_protected("main"));
    }

    #[test]
    fn test_invalid_pattern_reported_at_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"protectedBranches": ["/(unclosed/"]}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert!(matches!(
            config.protected(),
            Err(SweepError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            per_page: 500,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_pull_requests: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let config = Config {
            protected_branches: vec!["$defaults".to_string(), "qa".to_string()],
            max_pull_requests: Some(500),
            ..Config::default()
        };
        config.save(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("protectedBranches"));
        assert!(written.contains("maxPullRequests"));
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_discover_prefers_repo_file() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            r#"{"protectedBranches": ["trunk"]}"#,
        )
        .unwrap();
        let (config, path) = Config::discover(None, Some(temp.path())).unwrap();
        assert_eq!(config.protected_branches, vec!["trunk"]);
        assert_eq!(path, Some(temp.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_discover_explicit_missing_file_fails() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope.json");
        assert!(matches!(
            Config::discover(Some(&missing), None),
            Err(SweepError::Config(_))
        ));
    }
}
