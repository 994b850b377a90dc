//! Tests for archive extraction and the archive update strategy

use std::path::PathBuf;
use std::sync::Arc;

use super::common::*;
use crate::error::WardenError;
use crate::services::archive::{self, PreservedPaths};
use crate::services::archive_updater::{ArchiveUpdater, BackupPolicy};
use crate::traits::{MockRemoteRepository, UpdateStrategy};

struct Sandbox {
    _dir: tempfile::TempDir,
    install: PathBuf,
    work: PathBuf,
    backups: PathBuf,
}

fn sandbox() -> Sandbox {
    let dir = tempfile::tempdir().unwrap();
    let install = dir.path().join("install");
    let work = dir.path().join("work");
    let backups = dir.path().join("backups");
    std::fs::create_dir_all(&install).unwrap();
    std::fs::create_dir_all(&work).unwrap();
    Sandbox {
        install,
        work,
        backups,
        _dir: dir,
    }
}

fn serving(bytes: Vec<u8>) -> Arc<MockRemoteRepository> {
    let mut remote = MockRemoteRepository::new();
    remote
        .expect_download_snapshot()
        .times(1)
        .returning(move |_| Ok(bytes.clone()));
    Arc::new(remote)
}

fn updater(sandbox: &Sandbox, remote: Arc<MockRemoteRepository>) -> ArchiveUpdater {
    ArchiveUpdater::new(remote, "main", &sandbox.install)
        .with_work_dir(&sandbox.work)
        .with_backup(BackupPolicy {
            enabled: false,
            dir: None,
        })
}

#[tokio::test]
async fn test_traversal_entry_aborts_and_cleans_staging() {
    let sandbox = sandbox();
    let bytes = zip_bytes(&[
        ("repo-main/app.py", "print('new')"),
        ("../../etc/passwd", "root::0:0"),
    ]);

    let result = updater(&sandbox, serving(bytes)).update().await;

    match result {
        Err(WardenError::UnsafeArchiveEntry { entry }) => assert_eq!(entry, "../../etc/passwd"),
        other => panic!("expected UnsafeArchiveEntry, got {other:?}"),
    }
    assert_eq!(dir_entries(&sandbox.work), 0, "staging area left behind");
    assert!(!sandbox.install.join("app.py").exists());
}

#[tokio::test]
async fn test_preserved_file_is_never_overwritten() {
    let sandbox = sandbox();
    let logo = sandbox.install.join("backend/static/assets/images/logo.png");
    write_file(&logo, "original logo");
    write_file(&sandbox.install.join("app.py"), "old app");

    let bytes = zip_bytes(&[
        ("repo-main/backend/static/assets/images/logo.png", "incoming logo"),
        ("repo-main/backend/static/assets/images/banner.png", "new banner"),
        ("repo-main/app.py", "new app"),
    ]);

    let report = updater(&sandbox, serving(bytes)).update().await.unwrap();

    assert_eq!(std::fs::read_to_string(&logo).unwrap(), "original logo");
    assert_eq!(std::fs::read_to_string(sandbox.install.join("app.py")).unwrap(), "new app");
    // Preserved prefix but absent at the destination, so it is copied
    assert_eq!(
        std::fs::read_to_string(sandbox.install.join("backend/static/assets/images/banner.png")).unwrap(),
        "new banner"
    );
    assert_eq!(report.copy.copied, 2);
    assert_eq!(
        report.copy.preserved,
        vec![PathBuf::from("backend/static/assets/images/logo.png")]
    );
    assert_eq!(dir_entries(&sandbox.work), 0);
}

#[tokio::test]
async fn test_backup_excludes_build_caches() {
    let sandbox = sandbox();
    write_file(&sandbox.install.join("main.py"), "main");
    write_file(&sandbox.install.join("helpers.pyc"), "bytecode");
    write_file(&sandbox.install.join("backend/__pycache__/app.cpython-311.pyc"), "bytecode");
    write_file(&sandbox.install.join("backend/app.py"), "app");

    let bytes = zip_bytes(&[("repo-main/main.py", "main v2")]);
    let updater = updater(&sandbox, serving(bytes)).with_backup(BackupPolicy {
        enabled: true,
        dir: Some(sandbox.backups.clone()),
    });

    let report = updater.update().await.unwrap();
    let backup = report.backup.expect("backup should be created");

    assert!(backup.starts_with(&sandbox.backups));
    assert!(backup.file_name().unwrap().to_string_lossy().starts_with("install-backup-"));
    assert_eq!(std::fs::read_to_string(backup.join("main.py")).unwrap(), "main");
    assert!(backup.join("backend/app.py").exists());
    assert!(!backup.join("helpers.pyc").exists());
    assert!(!backup.join("backend/__pycache__").exists());
    assert_eq!(std::fs::read_to_string(sandbox.install.join("main.py")).unwrap(), "main v2");
}

#[tokio::test]
async fn test_download_failure_leaves_no_residue() {
    let sandbox = sandbox();
    let mut remote = MockRemoteRepository::new();
    remote
        .expect_download_snapshot()
        .times(1)
        .returning(|_| Err(WardenError::remote("HTTP 503")));

    let result = updater(&sandbox, Arc::new(remote)).update().await;

    assert!(matches!(result, Err(WardenError::RemoteQuery { .. })));
    assert_eq!(dir_entries(&sandbox.work), 0);
}

#[tokio::test]
async fn test_snapshot_without_single_root_is_rejected() {
    let sandbox = sandbox();
    let bytes = zip_bytes(&[("README.md", "readme"), ("src/app.py", "app")]);

    let result = updater(&sandbox, serving(bytes)).update().await;

    assert!(matches!(result, Err(WardenError::ArchiveLayout { .. })));
    assert!(!sandbox.install.join("README.md").exists());
    assert_eq!(dir_entries(&sandbox.work), 0);
}

#[tokio::test]
async fn test_archive_strategy_is_always_viable() {
    let sandbox = sandbox();
    let updater = updater(&sandbox, Arc::new(MockRemoteRepository::new()));

    assert_eq!(updater.name(), "archive");
    assert!(updater.is_viable().await);
}

#[test]
fn test_safe_extract_checks_every_entry_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("bad.zip");
    let dest = dir.path().join("dest");
    std::fs::create_dir_all(&dest).unwrap();
    write_zip(
        &archive_path,
        &[("good/one.txt", "1"), ("good/two.txt", "2"), ("good/../../escape.txt", "x")],
    );

    let result = archive::safe_extract(&archive_path, &dest);

    assert!(matches!(result, Err(WardenError::UnsafeArchiveEntry { .. })));
    assert_eq!(dir_entries(&dest), 0);
    assert!(!dir.path().join("escape.txt").exists());
}

#[test]
fn test_copy_respects_custom_preserved_set() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let dst = dir.path().join("dst");
    write_file(&src.join("data/state.json"), "incoming");
    write_file(&src.join("code.py"), "incoming code");
    write_file(&dst.join("data/state.json"), "local");

    let preserved = PreservedPaths::new(["data"]);
    let report = archive::copy_tree_preserving(&src, &dst, &preserved).unwrap();

    assert_eq!(std::fs::read_to_string(dst.join("data/state.json")).unwrap(), "local");
    assert_eq!(std::fs::read_to_string(dst.join("code.py")).unwrap(), "incoming code");
    assert_eq!(report.copied, 1);
}
