//! Locating the story file a workflow is advancing.

use chrono::{DateTime, Duration, Utc};
use std::path::{Component, Path, PathBuf};

/// Newest `*.md` directly inside one of `dirs` modified within `window` of
/// `now`. The returned path is relative to `root` when possible.
pub fn detect_recent_story(
    root: &Path,
    dirs: &[PathBuf],
    now: DateTime<Utc>,
    window: Duration,
) -> Option<String> {
    let threshold = now - window;
    let mut newest: Option<(DateTime<Utc>, PathBuf)> = None;

    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(root.join(dir)) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !has_md_extension(&path) {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            let modified: DateTime<Utc> = modified.into();
            if modified <= threshold {
                continue;
            }
            if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
    }

    let (_, path) = newest?;
    tracing::debug!(path = %path.display(), "detected story file");
    Some(display_relative(root, &path))
}

/// Whether `file_path` names a Markdown file directly inside one of the story
/// dirs. Relative paths are taken against `root`.
pub fn is_story_path(root: &Path, dirs: &[PathBuf], file_path: &str) -> bool {
    let path = Path::new(file_path);
    if !has_md_extension(path) {
        return false;
    }
    let abs = normalize(&if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    });
    let Some(parent) = abs.parent() else {
        return false;
    };
    dirs.iter().any(|d| normalize(&root.join(d)) == parent)
}

fn has_md_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("md")
}

/// Path as recorded in the state file: relative to `root` when inside it.
pub fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn dirs() -> Vec<PathBuf> {
        vec![PathBuf::from("docs/stories"), PathBuf::from("stories"), PathBuf::from("docs")]
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "# Story\n").unwrap();
    }

    #[test]
    fn no_dirs_means_no_story() {
        let dir = TempDir::new().unwrap();
        assert!(detect_recent_story(dir.path(), &dirs(), Utc::now(), Duration::hours(1)).is_none());
    }

    #[test]
    fn finds_recent_markdown_and_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "docs/stories/1.1.login.md");
        touch(dir.path(), "docs/stories/notes.txt");
        let found = detect_recent_story(dir.path(), &dirs(), Utc::now(), Duration::hours(1)).unwrap();
        assert_eq!(found, "docs/stories/1.1.login.md");
    }

    #[test]
    fn old_files_fall_outside_the_window() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "stories/old.md");
        let later = Utc::now() + Duration::hours(3);
        assert!(detect_recent_story(dir.path(), &dirs(), later, Duration::hours(1)).is_none());
    }

    #[test]
    fn newest_wins_across_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "docs/stories/first.md");
        touch(dir.path(), "stories/second.md");
        let first = std::fs::File::options()
            .write(true)
            .open(dir.path().join("docs/stories/first.md"))
            .unwrap();
        first
            .set_modified(SystemTime::now() - std::time::Duration::from_secs(600))
            .unwrap();
        let found = detect_recent_story(dir.path(), &dirs(), Utc::now(), Duration::hours(1)).unwrap();
        assert_eq!(found, "stories/second.md");
    }

    #[test]
    fn story_path_matching() {
        let root = Path::new("/proj");
        assert!(is_story_path(root, &dirs(), "docs/stories/a.md"));
        assert!(is_story_path(root, &dirs(), "/proj/stories/b.md"));
        assert!(is_story_path(root, &dirs(), "./docs/../docs/c.md"));
        assert!(!is_story_path(root, &dirs(), "docs/stories/a.txt"));
        assert!(!is_story_path(root, &dirs(), "docs/stories/deep/a.md"));
        assert!(!is_story_path(root, &dirs(), "README.md"));
        assert!(!is_story_path(root, &dirs(), "/elsewhere/docs/stories/a.md"));
    }
}
