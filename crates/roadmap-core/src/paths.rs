use crate::error::{Result, RoadmapError};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ROADMAP_DIR: &str = ".roadmap";
pub const CONFIG_FILE: &str = ".roadmap/config.yaml";
pub const WORKSPACE_FILE: &str = ".roadmap/workspace.yaml";

/// User-level config, relative to the home directory.
pub const USER_CONFIG_FILE: &str = ".config/roadmap/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn roadmap_dir(root: &Path) -> PathBuf {
    root.join(ROADMAP_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn workspace_path(root: &Path) -> PathBuf {
    root.join(WORKSPACE_FILE)
}

pub fn user_config_path() -> Result<PathBuf> {
    home::home_dir()
        .map(|h| h.join(USER_CONFIG_FILE))
        .ok_or(RoadmapError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_roadmap_dir() {
        let root = Path::new("/tmp/project");
        assert_eq!(config_path(root), root.join(".roadmap/config.yaml"));
        assert_eq!(workspace_path(root), root.join(".roadmap/workspace.yaml"));
        assert!(workspace_path(root).starts_with(roadmap_dir(root)));
    }
}
