//! Sync engine: bounded parallel execution of repository sync units
//!
//! One unit of work per descriptor, at most `max_concurrency` units in
//! flight, every descriptor accounted for in the result set no matter how
//! its unit ends. Results stream out in completion order; a per-repository
//! line is printed as each unit finishes, and a summary is compiled once
//! the whole batch has joined.

use crate::config::ConfigError;
use crate::discovery::RepoDescriptor;
use crate::git::{BranchMode, GitClient, SyncOutcome};
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Immutable per-batch settings
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Root under which all working trees are materialized
    pub base_directory: PathBuf,

    /// Upper bound on units in flight; must be at least 1
    pub max_concurrency: usize,

    /// How existing working trees are updated
    pub branch_mode: BranchMode,
}

/// Results from a complete sync batch
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub total: usize,
    pub cloned: usize,
    pub updated: usize,
    pub failed: usize,
    pub duration: Duration,
    pub results: Vec<SyncOutcome>,
}

impl SyncSummary {
    fn empty() -> Self {
        Self {
            total: 0,
            cloned: 0,
            updated: 0,
            failed: 0,
            duration: Duration::ZERO,
            results: Vec::new(),
        }
    }
}

/// The batch executor
///
/// Descriptors with the same relative path are the caller's problem: the
/// engine neither de-duplicates nor locks per path, and two units mutating
/// the same working tree race.
///
/// Known limitation: units have no timeout. A git process that hangs keeps
/// its concurrency slot until it exits.
#[derive(Debug)]
pub struct SyncEngine {
    git_client: GitClient,
    options: SyncOptions,
}

impl SyncEngine {
    /// Create an engine for one batch, validating the concurrency bound
    /// before any repository is touched.
    pub fn new(options: SyncOptions) -> Result<Self, ConfigError> {
        if options.max_concurrency < 1 {
            return Err(ConfigError::InvalidConcurrency(options.max_concurrency));
        }

        Ok(Self {
            git_client: GitClient::new(options.base_directory.clone()),
            options,
        })
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run one sync unit per descriptor and join the whole batch.
    ///
    /// Returns once every unit has completed. Unit failures of any kind
    /// (non-zero git exit, missing git binary, filesystem errors) become
    /// `SyncOutcome::Failed` entries; they never abort the other units.
    pub async fn run(&self, descriptors: Vec<RepoDescriptor>) -> SyncSummary {
        if descriptors.is_empty() {
            info!("No repositories to process");
            return SyncSummary::empty();
        }

        let start_time = Instant::now();

        info!(
            "Syncing {} repositories with {} workers into {}",
            descriptors.len(),
            self.options.max_concurrency,
            self.options.base_directory.display()
        );

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.options.max_concurrency));
        let mut futures = FuturesUnordered::new();

        for descriptor in descriptors {
            let semaphore = semaphore.clone();
            let git_client = self.git_client.clone();
            let branch_mode = self.options.branch_mode;

            futures.push(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                debug!("Processing '{}'", descriptor.local_relative_path);

                let outcome = match git_client.sync_repository(&descriptor, branch_mode).await {
                    Ok(outcome) => outcome,
                    // The unit boundary: nothing a single repository does is
                    // allowed to take down the batch.
                    Err(e) => SyncOutcome::Failed {
                        path: git_client.local_path(&descriptor),
                        error: format!(
                            "Error processing '{}': {:#}",
                            descriptor.local_relative_path, e
                        ),
                    },
                };

                (descriptor.local_relative_path, outcome)
            });
        }

        let mut results = Vec::new();

        // Single consumer: results arrive in completion order and the
        // output stream is serialized here.
        while let Some((relative_path, outcome)) = futures.next().await {
            match &outcome {
                SyncOutcome::Cloned { .. } => println!("  -> Cloned '{}'.", relative_path),
                SyncOutcome::Updated { message, .. } => println!("  -> {}.", message),
                SyncOutcome::Failed { error, .. } => {
                    error!("Sync failed for '{}'", relative_path);
                    println!("  -> {}", error);
                }
            }
            results.push(outcome);
        }

        let summary = compile_summary(results, start_time.elapsed());

        info!(
            "Sync completed in {:.2}s: {} cloned, {} updated, {} failed",
            summary.duration.as_secs_f64(),
            summary.cloned,
            summary.updated,
            summary.failed
        );

        summary
    }
}

/// Tally a finished batch
fn compile_summary(results: Vec<SyncOutcome>, duration: Duration) -> SyncSummary {
    let total = results.len();
    let mut cloned = 0;
    let mut updated = 0;
    let mut failed = 0;

    for result in &results {
        match result {
            SyncOutcome::Cloned { .. } => cloned += 1,
            SyncOutcome::Updated { .. } => updated += 1,
            SyncOutcome::Failed { .. } => failed += 1,
        }
    }

    SyncSummary {
        total,
        cloned,
        updated,
        failed,
        duration,
        results,
    }
}
