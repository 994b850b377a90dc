//! Git executable discovery

use std::path::PathBuf;

use shared::{Component, component_debug, component_warn};

/// Finds a usable git executable on the host
#[derive(Debug, Clone)]
pub struct GitLocator {
    override_path: Option<PathBuf>,
    search_path: bool,
    candidates: Vec<PathBuf>,
}

impl GitLocator {
    /// Locator checking an optional override, `PATH`, then conventional install locations
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            search_path: true,
            candidates: conventional_locations(),
        }
    }

    /// Locator that only considers the given paths
    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self {
            override_path: None,
            search_path: false,
            candidates,
        }
    }

    /// Locator that never finds git
    pub fn unavailable() -> Self {
        Self::with_candidates(Vec::new())
    }

    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = &self.override_path {
            if path.is_file() {
                return Some(path.clone());
            }
            component_warn!(
                Component::Updater,
                "Configured git path {} does not exist, searching",
                path.display()
            );
        }

        if self.search_path {
            if let Ok(path) = which::which("git") {
                return Some(path);
            }
        }

        let found = self.candidates.iter().find(|path| path.is_file()).cloned();
        if found.is_none() {
            component_debug!(Component::Updater, "No git executable found");
        }
        found
    }
}

fn conventional_locations() -> Vec<PathBuf> {
    let mut locations: Vec<PathBuf> = [
        "/usr/bin/git",
        "/usr/local/bin/git",
        "/opt/homebrew/bin/git",
        "C:/Program Files/Git/bin/git.exe",
        "C:/Program Files (x86)/Git/bin/git.exe",
        "C:/Git/bin/git.exe",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect();

    if let Ok(user) = std::env::var("USERNAME") {
        locations.push(PathBuf::from(format!(
            "C:/Users/{user}/AppData/Local/Programs/Git/bin/git.exe"
        )));
    }
    locations
}
