//! Archive extraction and installation tree copies
//!
//! All functions here are blocking; async callers run them through
//! `tokio::task::spawn_blocking`.

use std::fs::File;
use std::path::{Component as PathComponent, Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{WardenError, WardenResult};

/// Directory names that never count as archive content
const IGNORED_TOP_LEVEL: &[&str] = &["__MACOSX", "__pycache__"];

/// Relative path prefixes whose existing files an update never overwrites
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedPaths(Vec<PathBuf>);

impl PreservedPaths {
    pub fn new<I, P>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self(prefixes.into_iter().map(Into::into).collect())
    }

    /// Prefix match on whole path components: `assets/images` covers
    /// `assets/images/logo.png` but not `assets/images-old/logo.png`
    pub fn matches(&self, relative: &Path) -> bool {
        self.0.iter().any(|prefix| relative.starts_with(prefix))
    }
}

impl Default for PreservedPaths {
    fn default() -> Self {
        Self::new([
            "gtfs_update_info.json",
            "auto_update_config.json",
            "backend/static/assets/images",
        ])
    }
}

/// Outcome of copying a snapshot over the installation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: usize,
    /// Relative paths left untouched because they are preserved
    pub preserved: Vec<PathBuf>,
}

/// Resolve an archive entry name below `root` without touching the filesystem
///
/// Returns `None` when the entry is absolute or climbs above `root`.
pub fn contained_path(root: &Path, entry: &str) -> Option<PathBuf> {
    let normalized = entry.replace('\\', "/");
    let mut relative = PathBuf::new();
    let mut depth = 0usize;

    for component in Path::new(&normalized).components() {
        match component {
            PathComponent::Normal(part) => {
                relative.push(part);
                depth += 1;
            }
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                if depth == 0 {
                    return None;
                }
                relative.pop();
                depth -= 1;
            }
            PathComponent::RootDir | PathComponent::Prefix(_) => return None,
        }
    }

    Some(root.join(relative))
}

/// Extract a zip archive into `dest`, refusing any entry that would land outside it
///
/// Every entry is checked before anything is written, so a rejected archive
/// leaves `dest` untouched. Returns the number of files written.
pub fn safe_extract(archive_path: &Path, dest: &Path) -> WardenResult<usize> {
    let file = File::open(archive_path).map_err(|e| WardenError::fs("open archive", archive_path, e))?;
    let mut archive = ZipArchive::new(file)?;

    let mut targets = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        let target = contained_path(dest, entry.name()).ok_or_else(|| WardenError::UnsafeArchiveEntry {
            entry: entry.name().to_string(),
        })?;
        targets.push((target, entry.is_dir()));
    }

    let mut written = 0;
    for (index, (target, is_dir)) in targets.into_iter().enumerate() {
        if is_dir {
            std::fs::create_dir_all(&target).map_err(|e| WardenError::fs("create directory", &target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WardenError::fs("create directory", parent, e))?;
        }

        let mut entry = archive.by_index(index)?;
        let mut out = File::create(&target).map_err(|e| WardenError::fs("create file", &target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| WardenError::fs("write file", &target, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode & 0o777));
            }
        }
        written += 1;
    }

    Ok(written)
}

fn visible_entries(dir: &Path) -> WardenResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| WardenError::fs("read directory", dir, e))?;
    let mut visible = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| WardenError::fs("read directory", dir, e))?;
        let name = entry.file_name();
        if IGNORED_TOP_LEVEL.iter().any(|ignored| name == *ignored) {
            continue;
        }
        visible.push(entry.path());
    }
    Ok(visible)
}

/// The single directory a branch snapshot nests all of its content in
pub fn single_top_level_dir(staging: &Path) -> WardenResult<PathBuf> {
    let entries = visible_entries(staging)?;
    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        [] => Err(WardenError::ArchiveLayout {
            reason: "archive is empty".to_string(),
        }),
        _ => Err(WardenError::ArchiveLayout {
            reason: format!("expected one top-level directory, found {} entries", entries.len()),
        }),
    }
}

/// The nested directory when everything sits one level deep, else `staging` itself
pub fn content_root(staging: &Path) -> WardenResult<PathBuf> {
    let entries = visible_entries(staging)?;
    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(staging.to_path_buf()),
    }
}

/// Copy every file of `src` into `dst`, skipping preserved files that already exist
pub fn copy_tree_preserving(src: &Path, dst: &Path, preserved: &PreservedPaths) -> WardenResult<CopyReport> {
    let mut report = CopyReport::default();

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| WardenError::ArchiveLayout {
                reason: format!("{} escaped the snapshot root", entry.path().display()),
            })?
            .to_path_buf();
        let target = dst.join(&relative);

        if preserved.matches(&relative) && target.exists() {
            report.preserved.push(relative);
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WardenError::fs("create directory", parent, e))?;
        }
        std::fs::copy(entry.path(), &target).map_err(|e| WardenError::fs("copy file", &target, e))?;
        report.copied += 1;
    }

    Ok(report)
}

/// Whether a file or directory name is a build cache left out of backups
pub fn is_build_cache(name: &str) -> bool {
    name == "__pycache__" || name.ends_with(".pyc")
}

/// Copy the installation tree to `dest`, leaving out build caches
///
/// Returns the number of files copied.
pub fn backup_tree(src: &Path, dest: &Path) -> WardenResult<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_build_cache(&entry.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| WardenError::fs("create directory", &target, e))?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target).map_err(|e| WardenError::fs("copy file", &target, e))?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn walk_error(root: &Path, error: walkdir::Error) -> WardenError {
    let path = error.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    let source = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    WardenError::fs("walk directory", path, source)
}
