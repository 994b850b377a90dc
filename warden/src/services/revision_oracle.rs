//! Local and remote revision lookup
//!
//! The local revision comes from `git rev-parse HEAD` when a git client is
//! available, otherwise from the repository metadata on disk. Either way a
//! failure degrades to `None` instead of an error.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::WardenResult;
use crate::services::git_locator::GitLocator;
use crate::traits::{CommandRunner, CommandSpec, RemoteRepository, RevisionSource};
use shared::{Component, Revision, component_debug, component_warn};

const REV_PARSE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RevisionOracle {
    install_root: PathBuf,
    branch: String,
    locator: GitLocator,
    runner: Arc<dyn CommandRunner>,
    remote: Arc<dyn RemoteRepository>,
}

impl RevisionOracle {
    pub fn new(
        install_root: impl Into<PathBuf>,
        branch: impl Into<String>,
        locator: GitLocator,
        runner: Arc<dyn CommandRunner>,
        remote: Arc<dyn RemoteRepository>,
    ) -> Self {
        Self {
            install_root: install_root.into(),
            branch: branch.into(),
            locator,
            runner,
            remote,
        }
    }

    async fn revision_from_client(&self, git: &Path) -> Option<Revision> {
        let root = self.install_root.to_string_lossy().into_owned();
        let spec = CommandSpec::new(git, REV_PARSE_TIMEOUT).args(["-C", root.as_str(), "rev-parse", "HEAD"]);

        match self.runner.run(spec).await {
            Ok(output) if output.success() => Revision::parse(&output.stdout),
            Ok(output) => {
                component_debug!(Component::Updater, "git rev-parse failed: {}", output.diagnostic());
                None
            }
            Err(e) => {
                component_debug!(Component::Updater, "git rev-parse failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl RevisionSource for RevisionOracle {
    async fn local_revision(&self) -> Option<Revision> {
        if let Some(git) = self.locator.locate() {
            if let Some(revision) = self.revision_from_client(&git).await {
                return Some(revision);
            }
        }

        let revision = resolve_git_dir(&self.install_root).and_then(|dir| read_head_revision(&dir));
        if revision.is_none() {
            component_warn!(
                Component::Updater,
                "Could not determine local revision of {}",
                self.install_root.display()
            );
        }
        revision
    }

    async fn remote_revision(&self) -> WardenResult<Revision> {
        self.remote.latest_revision(&self.branch).await
    }

    fn has_vcs_client(&self) -> bool {
        self.locator.locate().is_some()
    }
}

/// Locate the metadata directory of a working copy
///
/// Handles both a `.git` directory and a `.git` file pointing elsewhere
/// (`gitdir: <path>`), as used by worktrees and submodules.
pub fn resolve_git_dir(root: &Path) -> Option<PathBuf> {
    let dot_git = root.join(".git");
    if dot_git.is_dir() {
        return Some(dot_git);
    }

    let pointer = std::fs::read_to_string(&dot_git).ok()?;
    let target = pointer.trim().strip_prefix("gitdir:")?.trim();
    let target = Path::new(target);
    let dir = if target.is_absolute() { target.to_path_buf() } else { root.join(target) };
    dir.is_dir().then_some(dir)
}

/// Resolve HEAD from metadata files without a git client
pub fn read_head_revision(git_dir: &Path) -> Option<Revision> {
    let head = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    let Some(reference) = head.strip_prefix("ref:") else {
        return Revision::parse(head);
    };
    let reference = reference.trim();

    match std::fs::read_to_string(git_dir.join(reference)) {
        Ok(content) => Revision::parse(&content),
        Err(_) => read_packed_ref(git_dir, reference),
    }
}

fn read_packed_ref(git_dir: &Path, reference: &str) -> Option<Revision> {
    let packed = std::fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    packed
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
        .find_map(|line| {
            let (hash, name) = line.split_once(' ')?;
            (name.trim() == reference).then(|| Revision::parse(hash)).flatten()
        })
}
