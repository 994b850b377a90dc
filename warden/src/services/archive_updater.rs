//! Source replacement from a downloaded branch snapshot

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{WardenError, WardenResult};
use crate::services::archive::{self, CopyReport, PreservedPaths};
use crate::traits::{RemoteRepository, UpdateStrategy};
use shared::{Component, component_info, component_warn};

/// Where and whether to back up the installation before copying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPolicy {
    pub enabled: bool,
    /// Directory receiving `<name>-backup-<unix-ts>`; defaults to the
    /// parent of the installation root
    pub dir: Option<PathBuf>,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self { enabled: true, dir: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub files_extracted: usize,
    pub copy: CopyReport,
    pub backup: Option<PathBuf>,
}

pub struct ArchiveUpdater {
    remote: Arc<dyn RemoteRepository>,
    branch: String,
    install_root: PathBuf,
    work_dir: PathBuf,
    preserved: PreservedPaths,
    backup: BackupPolicy,
}

impl ArchiveUpdater {
    pub fn new(remote: Arc<dyn RemoteRepository>, branch: impl Into<String>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            branch: branch.into(),
            install_root: install_root.into(),
            work_dir: std::env::temp_dir(),
            preserved: PreservedPaths::default(),
            backup: BackupPolicy::default(),
        }
    }

    /// Directory holding the temporary download and staging area (fluent API)
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_preserved(mut self, preserved: PreservedPaths) -> Self {
        self.preserved = preserved;
        self
    }

    pub fn with_backup(mut self, backup: BackupPolicy) -> Self {
        self.backup = backup;
        self
    }

    /// Download, extract, back up and copy the snapshot over the installation
    ///
    /// The temporary area is removed on every exit path.
    pub async fn update(&self) -> WardenResult<ArchiveReport> {
        std::fs::create_dir_all(&self.work_dir).map_err(|e| WardenError::fs("create work dir", &self.work_dir, e))?;
        let scratch = tempfile::Builder::new()
            .prefix("warden-update-")
            .tempdir_in(&self.work_dir)
            .map_err(|e| WardenError::fs("create staging area", &self.work_dir, e))?;

        component_info!(Component::Updater, "📦 Downloading {} snapshot", self.branch);
        let bytes = self.remote.download_snapshot(&self.branch).await?;

        let archive_path = scratch.path().join("snapshot.zip");
        let staging = scratch.path().join("staging");
        tokio::fs::write(&archive_path, &bytes)
            .await
            .map_err(|e| WardenError::fs("write archive", &archive_path, e))?;
        drop(bytes);

        let (files_extracted, source_root) = {
            let archive_path = archive_path.clone();
            let staging = staging.clone();
            tokio::task::spawn_blocking(move || -> WardenResult<(usize, PathBuf)> {
                std::fs::create_dir_all(&staging).map_err(|e| WardenError::fs("create staging", &staging, e))?;
                let count = archive::safe_extract(&archive_path, &staging)?;
                Ok((count, archive::single_top_level_dir(&staging)?))
            })
            .await??
        };

        let backup = if self.backup.enabled {
            self.create_backup().await
        } else {
            None
        };

        let copy = {
            let install_root = self.install_root.clone();
            let preserved = self.preserved.clone();
            tokio::task::spawn_blocking(move || archive::copy_tree_preserving(&source_root, &install_root, &preserved))
                .await??
        };

        if let Err(e) = scratch.close() {
            component_warn!(Component::Updater, "Failed to remove staging area: {}", e);
        }

        component_info!(
            Component::Updater,
            "✅ Snapshot applied: {} files copied, {} preserved",
            copy.copied,
            copy.preserved.len()
        );
        Ok(ArchiveReport {
            files_extracted,
            copy,
            backup,
        })
    }

    fn backup_destination(&self) -> Option<PathBuf> {
        let dir = match &self.backup.dir {
            Some(dir) => dir.clone(),
            None => self.install_root.parent()?.to_path_buf(),
        };
        let name = self
            .install_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "install".to_string());
        let stamp = chrono::Utc::now().timestamp();
        Some(dir.join(format!("{name}-backup-{stamp}")))
    }

    /// Best-effort copy of the current installation
    async fn create_backup(&self) -> Option<PathBuf> {
        let Some(dest) = self.backup_destination() else {
            component_warn!(Component::Updater, "No location for a backup, continuing without one");
            return None;
        };

        let src = self.install_root.clone();
        let target = dest.clone();
        let result = tokio::task::spawn_blocking(move || archive::backup_tree(&src, &target)).await;

        match result {
            Ok(Ok(files)) => {
                component_info!(Component::Updater, "💾 Backed up {} files to {}", files, dest.display());
                Some(dest)
            }
            Ok(Err(e)) => {
                component_warn!(Component::Updater, "Backup failed, continuing: {}", e);
                None
            }
            Err(e) => {
                component_warn!(Component::Updater, "Backup task failed, continuing: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl UpdateStrategy for ArchiveUpdater {
    fn name(&self) -> &'static str {
        "archive"
    }

    async fn is_viable(&self) -> bool {
        true
    }

    async fn apply(&self) -> WardenResult<()> {
        self.update().await.map(|_| ())
    }
}
