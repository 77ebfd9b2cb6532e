//! GitLab adapter tests against a mock HTTP server
//!
//! Covers header-driven pagination, token propagation, and the difference
//! between "no repositories" and "the adapter itself failed".

use repomirror::config::GitLabConfig;
use repomirror::{Discovery, GitLabDiscovery, GitLabScope};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gitlab_config(server: &MockServer) -> GitLabConfig {
    GitLabConfig {
        url: server.uri(),
        private_token: "glpat-test-token".to_string(),
    }
}

fn project(name: &str, namespace: &str) -> serde_json::Value {
    json!({
        "name": name,
        "path_with_namespace": format!("{}/{}", namespace.to_lowercase(), name),
        "ssh_url_to_repo": format!("git@gitlab.example.com:{}/{}.git", namespace.to_lowercase(), name),
        "namespace": {"name": namespace}
    })
}

#[tokio::test]
async fn test_user_projects_follow_pagination_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/user"))
        .and(header("Private-Token", "glpat-test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/users/7/projects"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Next-Page", "2")
                .set_body_json(json!([project("alpha", "Me"), project("beta", "Me")])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/users/7/projects"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([project("gamma", "Me")])))
        .mount(&server)
        .await;

    let discovery = GitLabDiscovery::new(gitlab_config(&server), GitLabScope::CurrentUser);
    let descriptors = discovery.discover().await.expect("discover");

    assert_eq!(descriptors.len(), 3);
    // Personal projects keep their full namespace path
    assert_eq!(descriptors[0].local_relative_path, "me/alpha");
    assert_eq!(
        descriptors[0].remote_url,
        "git@gitlab.example.com:me/alpha.git"
    );
    assert_eq!(descriptors[2].local_relative_path, "me/gamma");
}

#[tokio::test]
async fn test_group_projects_nest_under_group_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups/42/projects"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([project("billing", "Acme"), project("site", "Acme")])),
        )
        .mount(&server)
        .await;

    let discovery = GitLabDiscovery::new(gitlab_config(&server), GitLabScope::Groups(vec![42]));
    let descriptors = discovery.discover().await.expect("discover");

    assert_eq!(descriptors.len(), 2);
    // Group projects are placed under the group display name
    assert_eq!(descriptors[0].local_relative_path, "Acme/billing");
    assert_eq!(descriptors[1].local_relative_path, "Acme/site");
}

#[tokio::test]
async fn test_unauthorized_is_an_error_not_an_empty_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let discovery = GitLabDiscovery::new(gitlab_config(&server), GitLabScope::CurrentUser);
    let err = discovery.discover().await.expect_err("should fail");

    assert!(
        format!("{:#}", err).contains("authentication failed"),
        "unexpected error: {:#}",
        err
    );
}

#[tokio::test]
async fn test_unknown_group_is_skipped_not_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups/99/projects"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups/42/projects"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([project("billing", "Acme")])))
        .mount(&server)
        .await;

    let discovery =
        GitLabDiscovery::new(gitlab_config(&server), GitLabScope::Groups(vec![99, 42]));
    let descriptors = discovery.discover().await.expect("discover");

    // The reachable group still gets processed
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].local_relative_path, "Acme/billing");
}

#[tokio::test]
async fn test_empty_account_yields_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/users/7/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let discovery = GitLabDiscovery::new(gitlab_config(&server), GitLabScope::CurrentUser);
    let descriptors = discovery.discover().await.expect("discover");

    assert!(descriptors.is_empty());
}
