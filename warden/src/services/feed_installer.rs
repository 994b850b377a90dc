//! Transit-feed archive installation
//!
//! A feed archive is extracted with the same containment check as source
//! snapshots and swapped in place of `<feeds root>/<feed>`. The install time
//! is recorded in the feed info record.

use std::path::{Path, PathBuf};

use chrono::Local;
use shared::store::RecordStore;
use shared::{Component, FeedUpdateInfo, component_info, component_warn};

use crate::error::{WardenError, WardenResult};
use crate::services::archive;

pub const FEED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Who owns the archive file handed to the installer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOwnership {
    /// A temporary upload; removed once the install finishes either way
    Upload,
    /// A file the caller keeps
    Caller,
}

pub struct FeedInstaller {
    feeds_root: PathBuf,
    info: RecordStore<FeedUpdateInfo>,
}

impl FeedInstaller {
    pub fn new(feeds_root: impl Into<PathBuf>, info: RecordStore<FeedUpdateInfo>) -> Self {
        Self {
            feeds_root: feeds_root.into(),
            info,
        }
    }

    pub fn info(&self) -> FeedUpdateInfo {
        self.info.load()
    }

    /// Install `archive` as the data of `feed`
    ///
    /// # Returns
    /// The recorded install timestamp.
    pub async fn install(&self, feed: &str, archive: &Path, ownership: ArchiveOwnership) -> WardenResult<String> {
        let result = self.install_inner(feed, archive).await;

        if ownership == ArchiveOwnership::Upload {
            if let Err(e) = tokio::fs::remove_file(archive).await {
                component_warn!(Component::Feeds, "Could not remove upload {}: {}", archive.display(), e);
            }
        }
        result
    }

    async fn install_inner(&self, feed: &str, archive_path: &Path) -> WardenResult<String> {
        validate_feed_name(feed)?;

        let feeds_root = self.feeds_root.clone();
        let feed_name = feed.to_string();
        let archive_path = archive_path.to_path_buf();

        let target = tokio::task::spawn_blocking(move || -> WardenResult<PathBuf> {
            std::fs::create_dir_all(&feeds_root).map_err(|e| WardenError::fs("create feeds root", &feeds_root, e))?;
            let staging = tempfile::Builder::new()
                .prefix(&format!(".tmp_extract_{feed_name}_"))
                .tempdir_in(&feeds_root)
                .map_err(|e| WardenError::fs("create staging", &feeds_root, e))?;

            let extract_dir = staging.path().join("content");
            std::fs::create_dir_all(&extract_dir).map_err(|e| WardenError::fs("create staging", &extract_dir, e))?;
            archive::safe_extract(&archive_path, &extract_dir)?;
            let content = archive::content_root(&extract_dir)?;

            let target = feeds_root.join(&feed_name);
            if target.exists() {
                std::fs::remove_dir_all(&target).map_err(|e| WardenError::fs("remove old feed", &target, e))?;
            }
            std::fs::rename(&content, &target).map_err(|e| WardenError::fs("move feed into place", &target, e))?;
            Ok(target)
        })
        .await??;

        let stamp = Local::now().format(FEED_TIMESTAMP_FORMAT).to_string();
        let mut info = self.info.load();
        info.record(feed, stamp.clone());
        self.info.save(&info)?;

        component_info!(Component::Feeds, "🚌 Installed {} feed at {}", feed, target.display());
        Ok(stamp)
    }
}

fn validate_feed_name(feed: &str) -> WardenResult<()> {
    let valid = !feed.is_empty() && feed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(WardenError::InvalidFeed { name: feed.to_string() })
    }
}
