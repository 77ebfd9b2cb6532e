//! Configuration wizard: generate, inspect, and validate the config file

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;

/// Creates and checks the YAML configuration file
pub struct ConfigWizard {
    config_path: PathBuf,
}

impl ConfigWizard {
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: Config::default_config_path()?,
        })
    }

    /// Use a non-default config location (mainly for tests)
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Generate a config file, prompting for values unless `interactive`
    /// is off. Returns false when a config already exists and `force` was
    /// not given.
    pub fn generate(&self, force: bool, interactive: bool) -> Result<bool> {
        if self.config_path.exists() && !force {
            println!("⚠️  Config file already exists: {}", self.config_path.display());
            println!("   Use --force to overwrite it");
            return Ok(false);
        }

        let config = if interactive {
            self.prompt_config()?
        } else {
            Config::default()
        };

        config.save(&self.config_path)?;

        println!("✅ Config file generated: {}", self.config_path.display());
        if !interactive {
            println!("📝 Edit the file and fill in your tokens and group IDs");
        }

        Ok(true)
    }

    /// Interactive configuration setup
    fn prompt_config(&self) -> Result<Config> {
        println!("🚀 repomirror - interactive configuration");
        println!();

        let mut config = Config::default();

        println!("📋 GitLab");
        config.gitlab.url = Input::new()
            .with_prompt("GitLab URL")
            .default(config.gitlab.url)
            .interact_text()
            .context("Failed to read GitLab URL")?;

        println!("   A personal access token with read_api and read_repository scopes is required.");
        config.gitlab.private_token = Input::new()
            .with_prompt("GitLab personal access token")
            .interact_text()
            .context("Failed to read GitLab token")?;

        println!();
        println!("📋 GitHub (optional)");
        config.github.url = Input::new()
            .with_prompt("GitHub API URL")
            .default(config.github.url)
            .interact_text()
            .context("Failed to read GitHub URL")?;

        config.github.access_token = Input::new()
            .with_prompt("GitHub access token (leave empty to skip)")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read GitHub token")?;

        println!();
        println!("📁 Repositories");
        config.repository.repo_dir = Input::new()
            .with_prompt("Repository directory")
            .default(config.repository.repo_dir)
            .interact_text()
            .context("Failed to read repository directory")?;

        config.repository.max_concurrent_downloads = Input::new()
            .with_prompt("Maximum concurrent downloads")
            .default(config.repository.max_concurrent_downloads)
            .interact_text()
            .context("Failed to read concurrency")?;

        println!();
        println!("👥 GitLab groups (enter IDs one at a time; empty line to finish)");
        loop {
            let entry: String = Input::new()
                .with_prompt("Group ID")
                .allow_empty(true)
                .interact_text()
                .context("Failed to read group ID")?;

            if entry.trim().is_empty() {
                break;
            }
            match entry.trim().parse::<u64>() {
                Ok(id) => {
                    config.groups.target_group_ids.push(id);
                    println!("   Added group ID {}", id);
                }
                Err(_) => println!("❌ Invalid group ID, enter a number"),
            }
        }

        println!();
        config.composer.enabled = Confirm::new()
            .with_prompt("Enable Composer dependency updates?")
            .default(false)
            .interact()
            .context("Failed to read composer setting")?;

        if config.composer.enabled {
            config.composer.auto_update = Confirm::new()
                .with_prompt("Run composer update automatically after clone-all?")
                .default(false)
                .interact()
                .context("Failed to read composer auto-update setting")?;
        }

        Ok(config)
    }

    /// Print where the config lives and what it currently contains
    pub fn show_info(&self) -> Result<()> {
        println!("Config file: {}", self.config_path.display());

        if !self.config_path.exists() {
            println!("Status: not created yet (run 'repomirror init-config')");
            return Ok(());
        }

        let config = Config::load(&self.config_path)?;

        println!("Status: present");
        println!("  GitLab URL: {}", config.gitlab.url);
        println!("  GitLab token: {}", mask_token(&config.gitlab.private_token));
        println!("  GitHub API URL: {}", config.github.url);
        println!("  GitHub token: {}", mask_token(&config.github.access_token));
        println!("  Repository directory: {}", config.repository.repo_dir);
        println!(
            "  Max concurrent downloads: {}",
            config.repository.max_concurrent_downloads
        );
        println!("  Group IDs: {:?}", config.groups.target_group_ids);
        println!(
            "  Composer: enabled={} auto_update={}",
            config.composer.enabled, config.composer.auto_update
        );

        Ok(())
    }

    /// Check the config file for the problems that bite at runtime.
    /// Returns true when everything needed for cloning is in place.
    pub fn validate(&self) -> Result<bool> {
        if !self.config_path.exists() {
            println!("❌ Config file not found: {}", self.config_path.display());
            return Ok(false);
        }

        let config = match Config::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                println!("❌ Config file cannot be parsed: {:#}", e);
                return Ok(false);
            }
        };

        let mut ok = true;

        if config.gitlab.private_token.is_empty() {
            println!("❌ gitlab.private_token is empty");
            ok = false;
        } else {
            println!("✅ GitLab token present");
        }

        if config.groups.target_group_ids.is_empty() {
            println!("⚠️  groups.target_group_ids is empty; clone-groups will need --group-ids");
        } else {
            println!("✅ {} group ID(s) configured", config.groups.target_group_ids.len());
        }

        if config.repository.repo_dir.is_empty() {
            println!("❌ repository.repo_dir is empty");
            ok = false;
        } else {
            println!("✅ Repository directory: {}", config.repository.repo_dir);
        }

        if config.repository.max_concurrent_downloads < 1 {
            println!("❌ repository.max_concurrent_downloads must be at least 1");
            ok = false;
        }

        debug!("Config validation result: {}", ok);
        Ok(ok)
    }
}

/// Hide all but the tail of a token for display
fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "(not set)".to_string();
    }
    if token.len() <= 4 {
        return "****".to_string();
    }
    format!("****{}", &token[token.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token(""), "(not set)");
        assert_eq!(mask_token("abc"), "****");
        assert_eq!(mask_token("glpat-12345678"), "****5678");
    }

    #[test]
    #[serial]
    fn test_generate_non_interactive_writes_defaults() {
        std::env::remove_var("MAX_CONCURRENT_DOWNLOADS");
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repomirror").join("config.yml");
        let wizard = ConfigWizard::with_path(path.clone());

        let created = wizard.generate(false, false).expect("generate");
        assert!(created);
        assert!(path.exists());

        let config = Config::load(&path).expect("load generated config");
        assert_eq!(config.repository.max_concurrent_downloads, 5);
    }

    #[test]
    fn test_generate_refuses_to_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        let wizard = ConfigWizard::with_path(path.clone());

        assert!(wizard.generate(false, false).unwrap());
        assert!(!wizard.generate(false, false).unwrap());
        assert!(wizard.generate(true, false).unwrap());
    }

    #[test]
    #[serial]
    fn test_validate_flags_missing_token() {
        std::env::remove_var("GITLAB_PRIVATE_TOKEN");
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");

        let config = Config::default();
        config.save(&path).unwrap();

        let wizard = ConfigWizard::with_path(path);
        assert!(!wizard.validate().expect("validate"));
    }

    #[test]
    #[serial]
    fn test_validate_accepts_complete_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");

        let mut config = Config::default();
        config.gitlab.private_token = "glpat-test".to_string();
        config.groups.target_group_ids = vec![42];
        config.save(&path).unwrap();

        let wizard = ConfigWizard::with_path(path);
        assert!(wizard.validate().expect("validate"));
    }

    #[test]
    fn test_validate_missing_file() {
        let wizard = ConfigWizard::with_path(PathBuf::from("/nonexistent/config.yml"));
        assert!(!wizard.validate().expect("validate"));
    }
}
