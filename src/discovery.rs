//! Repository discovery: turning a remote scope into a list of descriptors
//!
//! Each provider adapter handles its own authentication and pagination and
//! produces `RepoDescriptor` values the sync engine consumes. Adapter
//! failures (bad token, unreachable host, unknown group) surface as errors
//! rather than an empty listing, so callers can tell the two apart.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{GitHubConfig, GitLabConfig};

/// One repository to synchronize: where it lives remotely, and where its
/// working tree belongs under the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    /// Clone URL (SSH or HTTPS)
    pub remote_url: String,

    /// Namespace-qualified relative path, e.g. "group/project"
    pub local_relative_path: String,
}

/// Trait for repository discovery from various providers
///
/// Implement this trait to add support for new git hosting providers.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Enumerate the repositories in this provider's scope
    async fn discover(&self) -> Result<Vec<RepoDescriptor>>;

    /// Provider name for display/logging
    fn provider_name(&self) -> &'static str;
}

// =============================================================================
// GitLab
// =============================================================================

/// Which GitLab repositories to enumerate
#[derive(Debug, Clone)]
pub enum GitLabScope {
    /// Projects owned by the authenticated user
    CurrentUser,
    /// All projects in the given groups
    Groups(Vec<u64>),
}

/// GitLab REST API discovery (v4, paginated via the X-Next-Page header)
pub struct GitLabDiscovery {
    client: reqwest::Client,
    config: GitLabConfig,
    scope: GitLabScope,
}

#[derive(Debug, Deserialize)]
struct GitLabProject {
    name: String,
    path_with_namespace: String,
    ssh_url_to_repo: String,
    namespace: GitLabNamespace,
}

#[derive(Debug, Deserialize)]
struct GitLabNamespace {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    id: u64,
}

impl GitLabDiscovery {
    pub fn new(config: GitLabConfig, scope: GitLabScope) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            scope,
        }
    }

    /// Fetch the id of the user the token belongs to
    async fn current_user_id(&self) -> Result<u64> {
        let url = format!("{}/api/v4/user", self.config.url);
        debug!("Fetching authenticated user from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Private-Token", &self.config.private_token)
            .send()
            .await
            .context("GitLab user request failed")?;

        if response.status() == StatusCode::UNAUTHORIZED {
            bail!("GitLab authentication failed. Check your token and URL.");
        }
        let user: GitLabUser = response
            .error_for_status()
            .context("GitLab user request returned an error")?
            .json()
            .await
            .context("Failed to decode GitLab user response")?;

        Ok(user.id)
    }

    /// Walk one paginated project listing to the end
    async fn fetch_paginated_projects(&self, base_url: &str) -> Result<Vec<GitLabProject>> {
        let mut projects = Vec::new();
        let mut page = 1u32;

        loop {
            let paged_url = format!("{}?per_page=100&page={}", base_url, page);

            let response = self
                .client
                .get(&paged_url)
                .header("Private-Token", &self.config.private_token)
                .send()
                .await
                .with_context(|| format!("GitLab project request failed: {}", paged_url))?;

            match response.status() {
                StatusCode::UNAUTHORIZED => {
                    bail!("GitLab authentication failed. Check your token and URL.")
                }
                StatusCode::FORBIDDEN => {
                    bail!("GitLab request forbidden (rate limit or missing permissions)")
                }
                StatusCode::NOT_FOUND => bail!("GitLab resource not found: {}", base_url),
                _ => {}
            }

            let next_page = response
                .headers()
                .get("X-Next-Page")
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .and_then(|v| v.parse::<u32>().ok());

            let page_projects: Vec<GitLabProject> = response
                .error_for_status()
                .context("GitLab project request returned an error")?
                .json()
                .await
                .context("Failed to decode GitLab project response")?;

            if page_projects.is_empty() {
                break;
            }
            projects.extend(page_projects);

            match next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(projects)
    }

    async fn discover_user_projects(&self) -> Result<Vec<RepoDescriptor>> {
        let user_id = self.current_user_id().await?;
        info!("Authenticated GitLab user id: {}", user_id);

        let base_url = format!("{}/api/v4/users/{}/projects", self.config.url, user_id);
        let projects = self.fetch_paginated_projects(&base_url).await?;

        info!("Found {} personal GitLab projects", projects.len());

        Ok(projects
            .into_iter()
            .map(|p| RepoDescriptor {
                remote_url: p.ssh_url_to_repo,
                local_relative_path: p.path_with_namespace,
            })
            .collect())
    }

    async fn discover_group_projects(&self, group_ids: &[u64]) -> Result<Vec<RepoDescriptor>> {
        let mut descriptors = Vec::new();

        for group_id in group_ids {
            let base_url = format!("{}/api/v4/groups/{}/projects", self.config.url, group_id);
            match self.fetch_paginated_projects(&base_url).await {
                Ok(projects) => {
                    info!(
                        "Collected {} projects from group id {}",
                        projects.len(),
                        group_id
                    );
                    descriptors.extend(projects.into_iter().map(|p| RepoDescriptor {
                        remote_url: p.ssh_url_to_repo,
                        // Group projects nest under the group name rather
                        // than the full namespace path.
                        local_relative_path: format!("{}/{}", p.namespace.name, p.name),
                    }));
                }
                Err(e) => {
                    // One bad group id should not sink the other groups.
                    warn!("Skipping group {}: {:#}", group_id, e);
                }
            }
        }

        Ok(descriptors)
    }
}

#[async_trait]
impl Discovery for GitLabDiscovery {
    async fn discover(&self) -> Result<Vec<RepoDescriptor>> {
        match &self.scope {
            GitLabScope::CurrentUser => self.discover_user_projects().await,
            GitLabScope::Groups(ids) => self.discover_group_projects(ids).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        "GitLab"
    }
}

// =============================================================================
// GitHub
// =============================================================================

/// Which GitHub repositories to enumerate
#[derive(Debug, Clone)]
pub enum GitHubScope {
    /// Repositories of the authenticated user (public and private)
    AuthenticatedUser,
    /// Public repositories of a named user
    User(String),
    /// Repositories of an organization
    Organization(String),
}

/// GitHub discovery backed by octocrab
pub struct GitHubDiscovery {
    client: octocrab::Octocrab,
    scope: GitHubScope,
}

impl GitHubDiscovery {
    pub fn new(config: &GitHubConfig, scope: GitHubScope) -> Result<Self> {
        let mut builder = octocrab::Octocrab::builder();

        if !config.access_token.is_empty() {
            builder = builder.personal_token(config.access_token.clone());
        }
        if config.url != "https://api.github.com" {
            builder = builder
                .base_uri(config.url.as_str())
                .with_context(|| format!("Invalid GitHub API URL: {}", config.url))?;
        }

        let client = builder.build().context("Failed to create GitHub client")?;

        Ok(Self { client, scope })
    }

    async fn list_authenticated_user_repos(&self) -> Result<Vec<octocrab::models::Repository>> {
        let mut repositories = Vec::new();
        let mut page = 1u8;

        loop {
            let page_repos = self
                .client
                .current()
                .list_repos_for_authenticated_user()
                .per_page(100)
                .page(page)
                .send()
                .await
                .with_context(|| format!("Failed to fetch repositories page {}", page))?;

            let items = page_repos.items;
            if items.is_empty() {
                break;
            }

            repositories.extend(items);

            // GitHub API pagination limit for u8
            if page >= 255 {
                warn!("Reached maximum pagination limit (255 pages)");
                break;
            }
            page += 1;
        }

        Ok(repositories)
    }

    async fn list_user_repos(&self, username: &str) -> Result<Vec<octocrab::models::Repository>> {
        let mut repositories = Vec::new();
        let mut page = 1u8;

        loop {
            let page_repos = self
                .client
                .users(username)
                .repos()
                .per_page(100)
                .page(page)
                .send()
                .await
                .with_context(|| {
                    format!("Failed to fetch repositories for user {} page {}", username, page)
                })?;

            let items = page_repos.items;
            if items.is_empty() {
                break;
            }

            repositories.extend(items);

            if page >= 255 {
                warn!("Reached maximum pagination limit (255 pages) for user: {}", username);
                break;
            }
            page += 1;
        }

        Ok(repositories)
    }

    async fn list_organization_repos(&self, org: &str) -> Result<Vec<octocrab::models::Repository>> {
        let mut repositories = Vec::new();
        let mut page = 1u8;

        loop {
            let page_repos = self
                .client
                .orgs(org)
                .list_repos()
                .per_page(100)
                .page(page)
                .send()
                .await
                .with_context(|| {
                    format!("Failed to fetch repositories for organization {} page {}", org, page)
                })?;

            let items = page_repos.items;
            if items.is_empty() {
                break;
            }

            repositories.extend(items);

            if page >= 255 {
                warn!("Reached maximum pagination limit (255 pages) for org: {}", org);
                break;
            }
            page += 1;
        }

        Ok(repositories)
    }

    fn repo_to_descriptor(repo: &octocrab::models::Repository) -> Result<RepoDescriptor> {
        let full_name = repo.full_name.as_deref().unwrap_or(&repo.name);
        let clone_url = repo.clone_url.as_ref().map(|u| u.to_string());
        let ssh_url = repo.ssh_url.clone();

        descriptor_from_parts(full_name, clone_url.as_deref(), ssh_url.as_deref())
    }
}

/// Build a descriptor from raw repository fields, preferring the HTTPS
/// clone URL and falling back to SSH.
fn descriptor_from_parts(
    full_name: &str,
    clone_url: Option<&str>,
    ssh_url: Option<&str>,
) -> Result<RepoDescriptor> {
    let remote_url = clone_url
        .or(ssh_url)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Repository {} has no usable clone URL", full_name))?;

    Ok(RepoDescriptor {
        remote_url,
        local_relative_path: full_name.to_string(),
    })
}

#[async_trait]
impl Discovery for GitHubDiscovery {
    async fn discover(&self) -> Result<Vec<RepoDescriptor>> {
        let repositories = match &self.scope {
            GitHubScope::AuthenticatedUser => self.list_authenticated_user_repos().await?,
            GitHubScope::User(username) => self.list_user_repos(username).await?,
            GitHubScope::Organization(org) => self.list_organization_repos(org).await?,
        };

        info!("Found {} GitHub repositories", repositories.len());

        let mut descriptors = Vec::new();
        for repo in &repositories {
            match Self::repo_to_descriptor(repo) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => warn!("Skipping repository: {:#}", e),
            }
        }

        Ok(descriptors)
    }

    fn provider_name(&self) -> &'static str {
        "GitHub"
    }
}
