use crate::error::{LoopError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STATE_FILE: &str = ".claude/redgreen-loop.local.md";
pub const CONFIG_FILE: &str = ".claude/redgreen.yaml";
pub const SKILLS_DIR: &str = ".claude/skills";

pub const SKILL_MANIFEST: &str = "SKILL.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn project_skills_dir(root: &Path) -> PathBuf {
    root.join(SKILLS_DIR)
}

/// `~/.claude/skills`, shared by every project of the current user.
pub fn user_skills_dir() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(LoopError::HomeNotFound)?;
    Ok(home.join(SKILLS_DIR))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            state_path(root),
            PathBuf::from("/tmp/proj/.claude/redgreen-loop.local.md")
        );
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.claude/redgreen.yaml")
        );
        assert_eq!(
            project_skills_dir(root),
            PathBuf::from("/tmp/proj/.claude/skills")
        );
    }
}
