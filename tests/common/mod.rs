//! Shared fixtures for integration tests
//!
//! Builds real git repositories on local disk so sync runs exercise the
//! actual `git` binary without touching the network: a throwaway working
//! repository per fixture, cloned `--bare` to serve as the remote.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

/// Run a git command in `cwd`, panicking on failure
pub fn git(cwd: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run git");

    assert!(
        output.status.success(),
        "git {:?} in {:?} failed: {}",
        args,
        cwd,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Capture stdout of a git command in `cwd`
pub fn git_stdout(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run git");

    assert!(
        output.status.success(),
        "git {:?} in {:?} failed: {}",
        args,
        cwd,
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Create a bare repository with an initial commit on `main` plus the given
/// extra branches. Returns the path usable as a clone URL.
pub fn create_remote(root: &Path, name: &str, extra_branches: &[&str]) -> PathBuf {
    let work = root.join(format!("{}-work", name));
    std::fs::create_dir_all(&work).expect("failed to create work dir");

    git(&work, &["init"]);
    git(&work, &["checkout", "-b", "main"]);
    git(&work, &["config", "user.email", "tests@example.com"]);
    git(&work, &["config", "user.name", "Integration Tests"]);

    std::fs::write(work.join("README.md"), format!("# {}\n", name)).expect("failed to write file");
    git(&work, &["add", "."]);
    git(&work, &["commit", "-m", "initial commit"]);

    for branch in extra_branches {
        git(&work, &["branch", branch]);
    }

    let remote = root.join(format!("{}.git", name));
    git(
        root,
        &[
            "clone",
            "--bare",
            work.to_str().unwrap(),
            remote.to_str().unwrap(),
        ],
    );

    remote
}

/// Push one new commit to `branch` of a bare remote
pub fn push_commit(root: &Path, remote: &Path, branch: &str, filename: &str) {
    let scratch = root.join(format!("scratch-{}", filename));
    git(
        root,
        &[
            "clone",
            "--branch",
            branch,
            remote.to_str().unwrap(),
            scratch.to_str().unwrap(),
        ],
    );
    git(&scratch, &["config", "user.email", "tests@example.com"]);
    git(&scratch, &["config", "user.name", "Integration Tests"]);

    std::fs::write(scratch.join(filename), "content\n").expect("failed to write file");
    git(&scratch, &["add", "."]);
    git(&scratch, &["commit", "-m", "add file"]);
    git(&scratch, &["push", "origin", branch]);
}

/// Push a brand-new branch to a bare remote
pub fn push_branch(root: &Path, remote: &Path, new_branch: &str) {
    let scratch = root.join(format!("scratch-branch-{}", new_branch));
    git(
        root,
        &[
            "clone",
            remote.to_str().unwrap(),
            scratch.to_str().unwrap(),
        ],
    );
    git(&scratch, &["config", "user.email", "tests@example.com"]);
    git(&scratch, &["config", "user.name", "Integration Tests"]);

    git(&scratch, &["checkout", "-b", new_branch]);
    std::fs::write(scratch.join(format!("{}.txt", new_branch)), "content\n")
        .expect("failed to write file");
    git(&scratch, &["add", "."]);
    git(&scratch, &["commit", "-m", "branch commit"]);
    git(&scratch, &["push", "origin", new_branch]);
}

/// Names of the local branches in a working tree
pub fn local_branches(repo: &Path) -> Vec<String> {
    git_stdout(repo, &["branch", "--format=%(refname:short)"])
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
