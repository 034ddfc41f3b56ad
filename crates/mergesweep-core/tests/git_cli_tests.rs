//! GitCli against real temporary repositories

use std::path::Path;
use std::process::Command;

use mergesweep_core::{GitCli, GitRunner};

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create a repo on `main` with one commit
fn setup_test_git_repo() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    git(temp.path(), &["init", "-b", "main"]);
    git(temp.path(), &["config", "user.name", "Test User"]);
    git(temp.path(), &["config", "user.email", "test@example.com"]);
    git(temp.path(), &["commit", "--allow-empty", "-m", "Initial commit"]);
    temp
}

#[test]
fn test_lists_branches_and_current() {
    let temp = setup_test_git_repo();
    git(temp.path(), &["branch", "feature/a"]);
    git(temp.path(), &["branch", "feature/b"]);

    let cli = GitCli::new(temp.path());
    assert!(cli.is_repository().unwrap());
    assert_eq!(cli.current_branch_name().unwrap(), "main");

    let branches = cli.list_local_branches().unwrap();
    let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["feature/a", "feature/b", "main"]);

    let main = branches.iter().find(|b| b.name == "main").unwrap();
    assert!(main.is_current);
    assert_eq!(main.sha.len(), 40);
    assert!(main.last_commit_date.is_some());
    assert!(branches.iter().filter(|b| b.is_current).count() == 1);
}

#[test]
fn test_not_a_repository() {
    let temp = tempfile::tempdir().unwrap();
    let cli = GitCli::new(temp.path());
    assert!(!cli.is_repository().unwrap());
    assert_eq!(cli.repository_root().unwrap(), None);
}

#[test]
fn test_detached_head_has_empty_current_branch() {
    let temp = setup_test_git_repo();
    git(temp.path(), &["checkout", "--detach"]);
    let cli = GitCli::new(temp.path());
    assert_eq!(cli.current_branch_name().unwrap(), "");
}

#[test]
fn test_force_delete_unmerged_branch() {
    let temp = setup_test_git_repo();
    git(temp.path(), &["checkout", "-b", "feature/squashed"]);
    git(temp.path(), &["commit", "--allow-empty", "-m", "work"]);
    git(temp.path(), &["checkout", "main"]);

    let cli = GitCli::new(temp.path());
    // Not an ancestor of main, so a safe delete refuses
    assert!(cli.delete_local_branch("feature/squashed", false).is_err());
    cli.delete_local_branch("feature/squashed", true).unwrap();

    let names: Vec<String> = cli
        .list_local_branches()
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["main"]);
}

#[test]
fn test_delete_missing_branch_reports_git_error() {
    let temp = setup_test_git_repo();
    let cli = GitCli::new(temp.path());
    let err = cli.delete_local_branch("nope", true).unwrap_err();
    assert_eq!(err.code(), "E010");
}

#[test]
fn test_ahead_behind_with_and_without_upstream() {
    let remote = tempfile::tempdir().unwrap();
    git(remote.path(), &["init", "--bare", "-b", "main"]);

    let temp = setup_test_git_repo();
    let remote_path = remote.path().to_str().unwrap();
    git(temp.path(), &["remote", "add", "origin", remote_path]);
    git(temp.path(), &["checkout", "-b", "feature/pushed"]);
    git(temp.path(), &["push", "-u", "origin", "feature/pushed"]);
    git(temp.path(), &["commit", "--allow-empty", "-m", "local only"]);
    git(temp.path(), &["commit", "--allow-empty", "-m", "local only 2"]);
    git(temp.path(), &["checkout", "-b", "feature/local"]);

    let cli = GitCli::new(temp.path());
    let counts = cli.ahead_behind("feature/pushed").unwrap().unwrap();
    assert_eq!(counts.ahead, 2);
    assert_eq!(counts.behind, 0);
    assert_eq!(cli.ahead_behind("feature/local").unwrap(), None);

    assert_eq!(cli.origin_url().unwrap().as_deref(), Some(remote_path));
}

#[test]
fn test_branch_sharing_a_tag_name() {
    let remote = tempfile::tempdir().unwrap();
    git(remote.path(), &["init", "--bare", "-b", "main"]);

    let temp = setup_test_git_repo();
    git(temp.path(), &["remote", "add", "origin", remote.path().to_str().unwrap()]);
    git(temp.path(), &["checkout", "-b", "release-prep"]);
    git(temp.path(), &["push", "-u", "origin", "release-prep"]);
    git(temp.path(), &["tag", "release-prep"]);
    git(temp.path(), &["commit", "--allow-empty", "-m", "after tag"]);
    git(temp.path(), &["commit", "--allow-empty", "-m", "after tag 2"]);

    let cli = GitCli::new(temp.path());
    let names: Vec<String> = cli
        .list_local_branches()
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["main", "release-prep"]);
    assert_eq!(cli.current_branch_name().unwrap(), "release-prep");

    let counts = cli.ahead_behind("release-prep").unwrap().unwrap();
    assert_eq!(counts.ahead, 2);
}

#[test]
fn test_origin_url_absent() {
    let temp = setup_test_git_repo();
    let cli = GitCli::new(temp.path());
    assert_eq!(cli.origin_url().unwrap(), None);
}
