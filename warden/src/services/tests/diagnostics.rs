//! Tests for working-copy diagnostics

use super::common::*;
use crate::services::diagnostics::Diagnostics;
use crate::services::git_locator::GitLocator;

#[tokio::test]
async fn test_missing_git_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::succeeding();

    let report = Diagnostics::new(dir.path(), GitLocator::unavailable(), runner.clone())
        .report()
        .await;

    assert_eq!(report.git_executable, "NOT FOUND");
    assert!(!report.is_git_repo);
    assert!(report.current_branch.is_none());
    assert!(runner.calls().is_empty());

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("remote_url").is_none());
}

#[tokio::test]
async fn test_failed_query_is_reported_inline() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".git")).unwrap();
    let git = fake_git(dir.path());
    let runner = ScriptedRunner::new(|spec| match git_subcommand(spec).as_str() {
        "branch --show-current" => ok("main\n"),
        "rev-parse HEAD" => ok("3f2a9c1d8e7b6a5f4e3d2c1b0a9f8e7d6c5b4a39\n"),
        "status --porcelain" => ok(" M app.py\n"),
        _ => failed(1, ""),
    });

    let report = Diagnostics::new(dir.path(), GitLocator::with_candidates(vec![git.clone()]), runner.clone())
        .report()
        .await;

    assert_eq!(report.git_executable, git.display().to_string());
    assert!(report.is_git_repo);
    assert_eq!(report.current_branch.as_deref(), Some("main"));
    assert_eq!(
        report.current_commit.as_deref(),
        Some("3f2a9c1d8e7b6a5f4e3d2c1b0a9f8e7d6c5b4a39")
    );
    assert_eq!(report.uncommitted_changes.as_deref(), Some("M app.py"));
    assert!(report.remote_url.unwrap().starts_with("ERROR: "));
    assert_eq!(runner.calls().len(), 4);
}
