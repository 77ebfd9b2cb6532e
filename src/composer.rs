//! Composer dependency updates across a mirrored repository tree
//!
//! Walks the tree for `composer.json` manifests and runs `composer update`
//! in each manifest directory. Runs after a sync batch, independently of
//! the sync engine; a failing update in one project does not stop the walk.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Outcome of one tree-wide update pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateStats {
    pub manifests_found: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Runs `composer update` wherever a manifest is found
pub struct ComposerManager {
    composer_cmd: String,
}

impl ComposerManager {
    /// Locate a working composer binary.
    ///
    /// Windows installs ship `composer.bat` / `composer.cmd`, so each
    /// candidate is probed with `--version` until one answers.
    pub async fn new() -> Result<Self> {
        for candidate in ["composer", "composer.bat", "composer.cmd"] {
            let probe = AsyncCommand::new(candidate)
                .arg("--version")
                .output()
                .await;

            if matches!(probe, Ok(output) if output.status.success()) {
                debug!("Using composer command: {}", candidate);
                return Ok(Self {
                    composer_cmd: candidate.to_string(),
                });
            }
        }

        Err(anyhow!(
            "Composer command not found. Make sure Composer is installed and in your PATH."
        ))
    }

    /// Walk `root_dir` and run `composer update` in every directory holding
    /// a `composer.json`.
    pub async fn find_and_update(&self, root_dir: &Path) -> Result<UpdateStats> {
        if !root_dir.is_dir() {
            return Err(anyhow!(
                "The specified search directory does not exist: {}",
                root_dir.display()
            ));
        }

        info!("Searching for composer.json under {}", root_dir.display());

        let manifest_dirs = find_manifest_dirs(root_dir);
        let mut stats = UpdateStats {
            manifests_found: manifest_dirs.len(),
            ..Default::default()
        };

        for dir in &manifest_dirs {
            info!("Running 'composer update' in {}", dir.display());

            match self.update_in(dir).await {
                Ok(()) => stats.updated += 1,
                Err(e) => {
                    warn!("composer update failed in {}: {:#}", dir.display(), e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Composer pass complete: {} manifests, {} updated, {} failed",
            stats.manifests_found, stats.updated, stats.failed
        );

        Ok(stats)
    }

    /// Run one `composer update` with the manifest directory as cwd
    async fn update_in(&self, dir: &Path) -> Result<()> {
        let output = AsyncCommand::new(&self.composer_cmd)
            .arg("update")
            .current_dir(dir)
            .output()
            .await
            .context("Failed to execute composer update")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("composer update exited with error: {}", stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("composer output: {}", stdout.trim());
        }

        Ok(())
    }
}

/// Collect directories containing a `composer.json`, skipping `.git`
/// internals and vendored dependencies (their manifests belong to upstream
/// packages, not to the mirrored projects).
fn find_manifest_dirs(root_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(root_dir)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_dir() && (name == ".git" || name == "vendor"))
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file() && entry.file_name() == "composer.json"
        })
        .filter_map(|entry| entry.path().parent().map(Path::to_path_buf))
        .collect()
}
