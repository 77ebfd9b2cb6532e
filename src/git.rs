use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info};

use crate::discovery::RepoDescriptor;

/// Branch handling mode for working trees that already exist locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchMode {
    /// Fast path: pull the currently checked-out branch
    SingleBranch,
    /// Fetch all remote refs and materialize a local branch for each one
    AllBranches,
}

/// Result of one repository sync unit
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Repository was absent and has been cloned
    Cloned { path: PathBuf },
    /// Repository existed and was brought up to date
    Updated { path: PathBuf, message: String },
    /// Operation failed; the batch continues regardless
    Failed { path: PathBuf, error: String },
}

impl SyncOutcome {
    /// Local working tree the outcome refers to
    pub fn path(&self) -> &Path {
        match self {
            SyncOutcome::Cloned { path }
            | SyncOutcome::Updated { path, .. }
            | SyncOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

/// Git operations handler: clone-or-update decisions for a single local path
///
/// Shells out to the `git` binary so SSH keys, credential helpers, and
/// everything else in the user's git configuration keep working.
#[derive(Debug, Clone)]
pub struct GitClient {
    base_directory: PathBuf,
}

impl GitClient {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
        }
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Compute the working tree location for a descriptor
    pub fn local_path(&self, descriptor: &RepoDescriptor) -> PathBuf {
        self.base_directory.join(&descriptor.local_relative_path)
    }

    /// Synchronize one repository: clone it if the local path is absent,
    /// otherwise update it according to `mode`.
    ///
    /// Operation-level failures (non-zero git exit) are reported as
    /// `SyncOutcome::Failed`; only environment problems (git binary missing,
    /// filesystem errors) surface as `Err` and are converted at the unit
    /// boundary by the executor.
    pub async fn sync_repository(
        &self,
        descriptor: &RepoDescriptor,
        mode: BranchMode,
    ) -> Result<SyncOutcome> {
        let target_path = self.local_path(descriptor);

        // Parent directories are created unconditionally; repeat runs no-op.
        if let Some(parent) = target_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create parent directory for {:?}", target_path))?;
        }

        if !target_path.exists() {
            return self.clone_repository(descriptor, &target_path, mode).await;
        }

        match mode {
            BranchMode::SingleBranch => self.pull_repository(descriptor, &target_path).await,
            BranchMode::AllBranches => self.sync_all_branches(descriptor, &target_path).await,
        }
    }

    /// Clone a repository into `target_path`
    async fn clone_repository(
        &self,
        descriptor: &RepoDescriptor,
        target_path: &Path,
        mode: BranchMode,
    ) -> Result<SyncOutcome> {
        info!(
            "Cloning repository: {} -> {}",
            descriptor.local_relative_path,
            target_path.display()
        );

        let output = AsyncCommand::new("git")
            .args(["clone", descriptor.remote_url.as_str()])
            .arg(target_path)
            .output()
            .await
            .context("Failed to execute git clone")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(SyncOutcome::Failed {
                path: target_path.to_path_buf(),
                error: format!(
                    "Error cloning '{}': {}",
                    descriptor.local_relative_path,
                    stderr.trim()
                ),
            });
        }

        // A fresh clone only has the default branch checked out; in
        // all-branches mode the remaining remote branches get local
        // counterparts right away.
        if mode == BranchMode::AllBranches {
            if let Err(e) = self.create_missing_local_branches(target_path).await {
                return Ok(SyncOutcome::Failed {
                    path: target_path.to_path_buf(),
                    error: format!(
                        "Error processing all branches for '{}': {}",
                        descriptor.local_relative_path, e
                    ),
                });
            }
        }

        info!("Successfully cloned: {}", descriptor.local_relative_path);
        Ok(SyncOutcome::Cloned {
            path: target_path.to_path_buf(),
        })
    }

    /// Pull the current branch of an existing working tree
    async fn pull_repository(
        &self,
        descriptor: &RepoDescriptor,
        target_path: &Path,
    ) -> Result<SyncOutcome> {
        debug!(
            "Pulling repository: {} at {}",
            descriptor.local_relative_path,
            target_path.display()
        );

        let output = AsyncCommand::new("git")
            .arg("pull")
            .current_dir(target_path)
            .output()
            .await
            .context("Failed to execute git pull")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(SyncOutcome::Failed {
                path: target_path.to_path_buf(),
                error: format!(
                    "Error pulling changes for '{}': {}",
                    descriptor.local_relative_path,
                    stderr.trim()
                ),
            });
        }

        Ok(SyncOutcome::Updated {
            path: target_path.to_path_buf(),
            message: format!("Pulled changes for '{}'", descriptor.local_relative_path),
        })
    }

    /// Fetch all remote refs and create local branches for remote branches
    /// that do not have a same-named local one yet.
    ///
    /// Steps run strictly in order; on failure, branches already created by
    /// earlier iterations stay in place.
    async fn sync_all_branches(
        &self,
        descriptor: &RepoDescriptor,
        target_path: &Path,
    ) -> Result<SyncOutcome> {
        debug!(
            "Fetching all branches: {} at {}",
            descriptor.local_relative_path,
            target_path.display()
        );

        let output = AsyncCommand::new("git")
            .args(["fetch", "--all", "--prune"])
            .current_dir(target_path)
            .output()
            .await
            .context("Failed to execute git fetch")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(SyncOutcome::Failed {
                path: target_path.to_path_buf(),
                error: format!(
                    "Error processing all branches for '{}': {}",
                    descriptor.local_relative_path,
                    stderr.trim()
                ),
            });
        }

        if let Err(e) = self.create_missing_local_branches(target_path).await {
            return Ok(SyncOutcome::Failed {
                path: target_path.to_path_buf(),
                error: format!(
                    "Error processing all branches for '{}': {}",
                    descriptor.local_relative_path, e
                ),
            });
        }

        Ok(SyncOutcome::Updated {
            path: target_path.to_path_buf(),
            message: format!(
                "Fetched all branches and created local branches for '{}'",
                descriptor.local_relative_path
            ),
        })
    }

    /// Create a local tracking branch for every remote branch that lacks one
    async fn create_missing_local_branches(&self, target_path: &Path) -> Result<()> {
        let remote_branches = self.list_remote_branches(target_path).await?;

        for branch in &remote_branches {
            if self.local_branch_exists(target_path, branch).await? {
                continue;
            }
            self.create_tracking_branch(target_path, branch).await?;
        }

        Ok(())
    }

    /// Enumerate remote branch names, with the `origin/` prefix stripped
    pub async fn list_remote_branches(&self, target_path: &Path) -> Result<Vec<String>> {
        let output = AsyncCommand::new("git")
            .args(["branch", "-r"])
            .current_dir(target_path)
            .output()
            .await
            .context("Failed to list remote branches")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git branch -r failed: {}", stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_remote_branches(&stdout))
    }

    /// Check whether `refs/heads/<branch>` exists in the working tree
    async fn local_branch_exists(&self, target_path: &Path, branch: &str) -> Result<bool> {
        let refname = format!("refs/heads/{}", branch);
        let output = AsyncCommand::new("git")
            .args(["show-ref", "--verify", refname.as_str()])
            .current_dir(target_path)
            .output()
            .await
            .context("Failed to check local branch existence")?;

        Ok(output.status.success())
    }

    /// Create a local branch pointing at the same-named remote branch
    async fn create_tracking_branch(&self, target_path: &Path, branch: &str) -> Result<()> {
        let remote_ref = format!("origin/{}", branch);
        let output = AsyncCommand::new("git")
            .args(["branch", branch, remote_ref.as_str()])
            .current_dir(target_path)
            .output()
            .await
            .context("Failed to create tracking branch")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "git branch {} origin/{} failed: {}",
                branch,
                branch,
                stderr.trim()
            ));
        }

        debug!("Created local branch: {}", branch);
        Ok(())
    }
}

/// Parse `git branch -r` output into plain branch names.
///
/// Symbolic ref lines such as `origin/HEAD -> origin/main` are skipped,
/// as are refs from remotes other than origin.
fn parse_remote_branches(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.contains("->"))
        .filter_map(|line| line.strip_prefix("origin/"))
        .map(str::to_string)
        .collect()
}
