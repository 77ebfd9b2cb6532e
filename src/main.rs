use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repomirror::config::ConfigError;
use repomirror::{
    BranchMode, ComposerManager, Config, ConfigWizard, Discovery, GitHubDiscovery, GitHubScope,
    GitLabDiscovery, GitLabScope, SyncEngine, SyncOptions, SyncSummary,
};

#[derive(Parser)]
#[command(name = "repomirror")]
#[command(about = "Parallel GitLab/GitHub repository mirroring tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to ./config.yml, then the XDG location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Options shared by every clone command
#[derive(clap::Args)]
struct SyncArgs {
    /// Directory to save repositories (overrides config)
    #[arg(long)]
    repo_dir: Option<String>,

    /// Maximum concurrent downloads (overrides config)
    #[arg(long)]
    max_workers: Option<usize>,

    /// Custom output directory for this run only
    #[arg(long)]
    output_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone all repositories owned by the authenticated GitLab user
    CloneUser {
        /// GitLab instance URL (overrides config)
        #[arg(long)]
        gitlab_url: Option<String>,

        /// GitLab personal access token (overrides config)
        #[arg(long, env = "GITLAB_PRIVATE_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Clone all repositories from the configured GitLab groups
    CloneGroups {
        /// GitLab instance URL (overrides config)
        #[arg(long)]
        gitlab_url: Option<String>,

        /// GitLab personal access token (overrides config)
        #[arg(long, env = "GITLAB_PRIVATE_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// GitLab group IDs to clone from (overrides config)
        #[arg(long = "group-ids")]
        group_ids: Vec<u64>,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Clone repositories from a GitHub user
    CloneGithubUser {
        /// GitHub API URL (overrides config)
        #[arg(long)]
        github_url: Option<String>,

        /// GitHub access token (overrides config)
        #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// GitHub username to clone from (defaults to the authenticated user)
        #[arg(long)]
        username: Option<String>,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Clone repositories from a GitHub organization
    CloneGithubOrg {
        /// Organization name
        organization: String,

        /// GitHub API URL (overrides config)
        #[arg(long)]
        github_url: Option<String>,

        /// GitHub access token (overrides config)
        #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Clone user and group repositories, optionally updating Composer deps
    CloneAll {
        /// GitLab instance URL (overrides config)
        #[arg(long)]
        gitlab_url: Option<String>,

        /// GitLab personal access token (overrides config)
        #[arg(long, env = "GITLAB_PRIVATE_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// GitLab group IDs to clone from (overrides config)
        #[arg(long = "group-ids")]
        group_ids: Vec<u64>,

        /// Update Composer dependencies after cloning
        #[arg(long)]
        update_composer: bool,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Update Composer dependencies across a repository tree
    UpdateComposer {
        /// Directory to search for composer.json files (defaults to repo_dir)
        #[arg(long)]
        directory: Option<String>,
    },

    /// Initialize the configuration file
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,

        /// Use default values without prompting
        #[arg(long)]
        non_interactive: bool,
    },

    /// Show information about the configuration file
    ConfigInfo,

    /// Validate the configuration file
    ValidateConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    info!("Starting repomirror v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::CloneUser {
            gitlab_url,
            token,
            sync,
        } => cmd_clone_user(config, gitlab_url, token, sync).await,
        Commands::CloneGroups {
            gitlab_url,
            token,
            group_ids,
            sync,
        } => cmd_clone_groups(config, gitlab_url, token, group_ids, sync).await,
        Commands::CloneGithubUser {
            github_url,
            token,
            username,
            sync,
        } => cmd_clone_github_user(config, github_url, token, username, sync).await,
        Commands::CloneGithubOrg {
            organization,
            github_url,
            token,
            sync,
        } => cmd_clone_github_org(config, organization, github_url, token, sync).await,
        Commands::CloneAll {
            gitlab_url,
            token,
            group_ids,
            update_composer,
            sync,
        } => cmd_clone_all(config, gitlab_url, token, group_ids, update_composer, sync).await,
        Commands::UpdateComposer { directory } => cmd_update_composer(config, directory).await,
        Commands::InitConfig {
            force,
            non_interactive,
        } => cmd_init_config(force, non_interactive),
        Commands::ConfigInfo => cmd_config_info(),
        Commands::ValidateConfig => cmd_validate_config(),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Load configuration from specified path or the default locations
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

/// Build batch options from config plus command-line overrides
fn build_sync_options(
    config: &Config,
    args: &SyncArgs,
    branch_mode: BranchMode,
) -> Result<SyncOptions, ConfigError> {
    let base_directory = args
        .output_dir
        .clone()
        .or_else(|| args.repo_dir.clone())
        .unwrap_or_else(|| config.repository.repo_dir.clone());

    let max_concurrency = args
        .max_workers
        .unwrap_or(config.repository.max_concurrent_downloads);

    let options = SyncOptions {
        base_directory: PathBuf::from(base_directory),
        max_concurrency,
        branch_mode,
    };

    if options.max_concurrency < 1 {
        return Err(ConfigError::InvalidConcurrency(options.max_concurrency));
    }

    Ok(options)
}

/// Run one discovery + sync batch and print the outcome
async fn run_batch(discovery: &dyn Discovery, options: SyncOptions) -> Result<SyncSummary> {
    let engine = SyncEngine::new(options)?;

    println!("🔍 Discovering repositories via {}...", discovery.provider_name());
    let descriptors = discovery.discover().await?;
    println!("   Found {} repositories", descriptors.len());

    println!(
        "📦 Repositories will be saved in: {}\n",
        engine.options().base_directory.display()
    );

    let summary = engine.run(descriptors).await;
    print_summary(&summary);

    Ok(summary)
}

/// Print the batch summary in the same shape for every command
fn print_summary(summary: &SyncSummary) {
    println!("\n🎉 Batch complete!");
    println!("   Total repositories: {}", summary.total);
    println!("   📥 Cloned: {}", summary.cloned);
    println!("   🔄 Updated: {}", summary.updated);
    println!("   ❌ Failed: {}", summary.failed);
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    if summary.failed > 0 {
        println!("\nFailed repositories:");
        for result in &summary.results {
            if let repomirror::SyncOutcome::Failed { path, error } = result {
                println!("   ❌ {}: {}", path.display(), error);
            }
        }
    }
}

/// Clone all repositories owned by the authenticated GitLab user
async fn cmd_clone_user(
    mut config: Config,
    gitlab_url: Option<String>,
    token: Option<String>,
    sync: SyncArgs,
) -> Result<()> {
    println!("🚀 Starting user repository cloning process...");

    if let Some(url) = gitlab_url {
        config.gitlab.url = url;
    }
    if let Some(token) = token {
        config.gitlab.private_token = token;
    }

    let options = build_sync_options(&config, &sync, BranchMode::SingleBranch)?;
    let discovery = GitLabDiscovery::new(config.gitlab.clone(), GitLabScope::CurrentUser);

    run_batch(&discovery, options).await?;
    Ok(())
}

/// Clone all repositories from the configured GitLab groups
async fn cmd_clone_groups(
    mut config: Config,
    gitlab_url: Option<String>,
    token: Option<String>,
    group_ids: Vec<u64>,
    sync: SyncArgs,
) -> Result<()> {
    println!("🚀 Starting group repository cloning process...");

    if let Some(url) = gitlab_url {
        config.gitlab.url = url;
    }
    if let Some(token) = token {
        config.gitlab.private_token = token;
    }
    if !group_ids.is_empty() {
        config.groups.target_group_ids = group_ids;
    }

    if config.groups.target_group_ids.is_empty() {
        return Err(ConfigError::MissingGroupIds.into());
    }

    // Group mirrors carry every branch, not just the checked-out one
    let options = build_sync_options(&config, &sync, BranchMode::AllBranches)?;
    let discovery = GitLabDiscovery::new(
        config.gitlab.clone(),
        GitLabScope::Groups(config.groups.target_group_ids.clone()),
    );

    run_batch(&discovery, options).await?;
    Ok(())
}

/// Clone repositories from a GitHub user
async fn cmd_clone_github_user(
    mut config: Config,
    github_url: Option<String>,
    token: Option<String>,
    username: Option<String>,
    sync: SyncArgs,
) -> Result<()> {
    println!("🚀 Starting GitHub user repository cloning process...");

    if let Some(url) = github_url {
        config.github.url = url;
    }
    if let Some(token) = token {
        config.github.access_token = token;
    }

    let scope = match username {
        Some(name) => GitHubScope::User(name),
        None => GitHubScope::AuthenticatedUser,
    };

    let options = build_sync_options(&config, &sync, BranchMode::SingleBranch)?;
    let discovery = GitHubDiscovery::new(&config.github, scope)?;

    run_batch(&discovery, options).await?;
    Ok(())
}

/// Clone repositories from a GitHub organization
async fn cmd_clone_github_org(
    mut config: Config,
    organization: String,
    github_url: Option<String>,
    token: Option<String>,
    sync: SyncArgs,
) -> Result<()> {
    println!("🚀 Starting GitHub organization repository cloning process...");

    if let Some(url) = github_url {
        config.github.url = url;
    }
    if let Some(token) = token {
        config.github.access_token = token;
    }

    let options = build_sync_options(&config, &sync, BranchMode::SingleBranch)?;
    let discovery = GitHubDiscovery::new(&config.github, GitHubScope::Organization(organization))?;

    run_batch(&discovery, options).await?;
    Ok(())
}

/// Clone user and group repositories, then optionally run Composer updates
async fn cmd_clone_all(
    mut config: Config,
    gitlab_url: Option<String>,
    token: Option<String>,
    group_ids: Vec<u64>,
    update_composer: bool,
    sync: SyncArgs,
) -> Result<()> {
    println!("🚀 Starting complete repository management process...");

    if let Some(url) = gitlab_url {
        config.gitlab.url = url;
    }
    if let Some(token) = token {
        config.gitlab.private_token = token;
    }
    if !group_ids.is_empty() {
        config.groups.target_group_ids = group_ids;
    }

    println!("\n📦 Cloning user repositories...");
    let user_options = build_sync_options(&config, &sync, BranchMode::SingleBranch)?;
    let user_discovery = GitLabDiscovery::new(config.gitlab.clone(), GitLabScope::CurrentUser);
    run_batch(&user_discovery, user_options).await?;

    if config.groups.target_group_ids.is_empty() {
        println!("\n⚠️  No group IDs configured; skipping group repositories");
    } else {
        println!("\n📦 Cloning group repositories...");
        let group_options = build_sync_options(&config, &sync, BranchMode::AllBranches)?;
        let group_discovery = GitLabDiscovery::new(
            config.gitlab.clone(),
            GitLabScope::Groups(config.groups.target_group_ids.clone()),
        );
        run_batch(&group_discovery, group_options).await?;
    }

    if update_composer || (config.composer.enabled && config.composer.auto_update) {
        println!("\n🔧 Updating Composer dependencies...");
        let base_dir = sync
            .output_dir
            .clone()
            .or(sync.repo_dir.clone())
            .unwrap_or_else(|| config.repository.repo_dir.clone());
        let manager = ComposerManager::new().await?;
        manager.find_and_update(std::path::Path::new(&base_dir)).await?;
    }

    println!("\n✅ Complete repository management process finished!");
    Ok(())
}

/// Update Composer dependencies in the given (or configured) tree
async fn cmd_update_composer(config: Config, directory: Option<String>) -> Result<()> {
    println!("🔧 Starting Composer dependency update process...");

    let root = directory.unwrap_or_else(|| config.repository.repo_dir.clone());

    let manager = ComposerManager::new().await?;
    let stats = manager.find_and_update(std::path::Path::new(&root)).await?;

    println!(
        "\n✅ Composer pass complete: {} manifests found, {} updated, {} failed",
        stats.manifests_found, stats.updated, stats.failed
    );
    Ok(())
}

/// Initialize the configuration file
fn cmd_init_config(force: bool, non_interactive: bool) -> Result<()> {
    println!("⚙️  Initializing configuration...");

    let wizard = ConfigWizard::new()?;
    let created = wizard.generate(force, !non_interactive)?;

    if created {
        println!("\n📋 Next steps:");
        println!("1. Check the config file with 'repomirror validate-config'");
        println!("2. Run 'repomirror clone-groups' or 'repomirror clone-user' to start cloning");
    }

    Ok(())
}

/// Show information about the configuration file
fn cmd_config_info() -> Result<()> {
    println!("📁 Configuration Information");
    println!("============================");

    let wizard = ConfigWizard::new()?;
    wizard.show_info()
}

/// Validate the configuration file
fn cmd_validate_config() -> Result<()> {
    println!("🔍 Validating configuration...");

    let wizard = ConfigWizard::new()?;
    if wizard.validate()? {
        println!("✅ Configuration is ready to use!");
    } else {
        println!("❌ Please fix the configuration issues above");
    }

    Ok(())
}
