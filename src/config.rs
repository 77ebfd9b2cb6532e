use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that make a run invalid before any repository is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max concurrent downloads must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    #[error("no GitLab group IDs configured; set groups.target_group_ids or pass --group-ids")]
    MissingGroupIds,
}

/// Main configuration structure for repomirror
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// GitLab API access settings
    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// GitHub API access settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Local repository tree settings
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// GitLab group selection
    #[serde(default)]
    pub groups: GroupConfig,

    /// Composer dependency update settings
    #[serde(default)]
    pub composer: ComposerConfig,
}

/// GitLab API configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitLabConfig {
    /// GitLab instance URL
    #[serde(default = "default_gitlab_url")]
    pub url: String,

    /// Personal access token with read_api and read_repository scopes
    #[serde(default)]
    pub private_token: String,
}

/// GitHub API configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// GitHub API URL (override for GitHub Enterprise)
    #[serde(default = "default_github_url")]
    pub url: String,

    /// Personal access token with repo scope
    #[serde(default)]
    pub access_token: String,
}

/// Local repository tree configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RepositoryConfig {
    /// Base directory under which all repositories are materialized
    #[serde(default = "default_repo_dir")]
    pub repo_dir: String,

    /// Maximum number of clone/pull operations running at once
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
}

/// GitLab group selection
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GroupConfig {
    /// Numeric IDs of the GitLab groups to mirror
    #[serde(default)]
    pub target_group_ids: Vec<u64>,
}

/// Composer dependency update configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ComposerConfig {
    /// Whether composer updates are available at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Run composer update automatically after clone-all
    #[serde(default)]
    pub auto_update: bool,
}

// Default value functions
fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}
fn default_github_url() -> String {
    "https://api.github.com".to_string()
}
fn default_repo_dir() -> String {
    "${HOME}/repos".to_string()
}
fn default_max_concurrent_downloads() -> usize {
    5
}
fn default_true() -> bool {
    true
}

// Default implementations
impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: default_gitlab_url(),
            private_token: String::new(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            url: default_github_url(),
            access_token: String::new(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            repo_dir: default_repo_dir(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
        }
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            auto_update: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gitlab: GitLabConfig::default(),
            github: GitHubConfig::default(),
            repository: RepositoryConfig::default(),
            groups: GroupConfig::default(),
            composer: ComposerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default locations, falling back to
    /// built-in defaults when no config file exists.
    ///
    /// Lookup order: `./config.yml`, then the user config directory.
    /// Environment variables override file values either way.
    pub fn load_or_default() -> Result<Self> {
        let local_path = Path::new("config.yml");
        if local_path.exists() {
            return Self::load(local_path);
        }

        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            return Self::load(&config_path);
        }

        tracing::warn!(
            "No config file found at {:?}; using defaults. Run 'repomirror init-config' to create one.",
            config_path
        );
        let mut config = Self::default();
        config.merge_env();
        config.expand_paths()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Environment variables take precedence over file values
        config.merge_env();
        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("repomirror").join("config.yml"))
    }

    /// Overlay environment variables onto the loaded values
    pub fn merge_env(&mut self) {
        if let Ok(url) = std::env::var("GITLAB_URL") {
            self.gitlab.url = url;
        }
        if let Ok(token) = std::env::var("GITLAB_PRIVATE_TOKEN") {
            self.gitlab.private_token = token;
        }
        if let Ok(url) = std::env::var("GITHUB_URL") {
            self.github.url = url;
        }
        if let Ok(token) = std::env::var("GITHUB_ACCESS_TOKEN") {
            self.github.access_token = token;
        }
        if let Ok(dir) = std::env::var("REPO_DIR") {
            self.repository.repo_dir = dir;
        }
        if let Ok(max) = std::env::var("MAX_CONCURRENT_DOWNLOADS") {
            match max.parse() {
                Ok(n) => self.repository.max_concurrent_downloads = n,
                Err(_) => {
                    tracing::warn!("Ignoring non-numeric MAX_CONCURRENT_DOWNLOADS: {}", max)
                }
            }
        }
    }

    /// Expand environment variables and `~` in configured paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.repository.repo_dir = shellexpand::full(&self.repository.repo_dir)
            .context("Failed to expand repository.repo_dir path")?
            .into_owned();

        Ok(())
    }

    /// Validate the concurrency bound before a batch starts
    pub fn validate_concurrency(&self) -> Result<(), ConfigError> {
        if self.repository.max_concurrent_downloads < 1 {
            return Err(ConfigError::InvalidConcurrency(
                self.repository.max_concurrent_downloads,
            ));
        }
        Ok(())
    }
}
