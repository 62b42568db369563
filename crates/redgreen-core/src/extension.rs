//! Locally declared extensions.
//!
//! An extension is a `SKILL.md` manifest one directory below a skills root:
//!
//! ```text
//! ---
//! name: api-contract-tests
//! description: Generate contract tests from the OpenAPI document
//! redgreen:
//!   role: qa
//!   priority: 10
//! ---
//! ```
//!
//! Extensions are only ever offered as optional help for the step's role.

use crate::io::split_frontmatter;
use crate::paths;
use crate::step::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const DEFAULT_PRIORITY: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub description: String,
    pub role: Role,
    /// Lower sorts first.
    pub priority: u32,
    pub path: PathBuf,
}

/// Supplies the extensions that apply to a role, in presentation order.
pub trait ExtensionSource {
    fn discover(&self, role: Role) -> Vec<ExtensionDescriptor>;
}

// ---------------------------------------------------------------------------
// Manifest parsing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Manifest {
    name: Option<String>,
    #[serde(default)]
    description: String,
    redgreen: Option<Binding>,
}

#[derive(Deserialize)]
struct Binding {
    #[serde(alias = "agent")]
    role: Option<Role>,
    priority: Option<u32>,
}

/// Parse one manifest. `None` when it has no frontmatter, no name, no
/// `redgreen` block, or an unknown role.
pub fn parse_manifest(content: &str, path: &Path) -> Option<ExtensionDescriptor> {
    let (fm, _) = split_frontmatter(content)?;
    let manifest: Manifest = serde_yaml::from_str(fm).ok()?;
    let name = manifest.name.filter(|n| !n.trim().is_empty())?;
    let binding = manifest.redgreen?;
    Some(ExtensionDescriptor {
        name: name.trim().to_string(),
        description: manifest.description.trim().to_string(),
        role: binding.role?,
        priority: binding.priority.unwrap_or(DEFAULT_PRIORITY),
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// FsExtensionSource
// ---------------------------------------------------------------------------

/// Scans skills roots in order. An earlier root shadows a later one when
/// both declare the same name.
pub struct FsExtensionSource {
    roots: Vec<PathBuf>,
}

impl FsExtensionSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Project skills first, then the user's.
    pub fn for_project(root: &Path) -> Self {
        let mut roots = vec![paths::project_skills_dir(root)];
        match paths::user_skills_dir() {
            Ok(dir) => roots.push(dir),
            Err(e) => tracing::debug!(error = %e, "skipping user skills"),
        }
        Self::new(roots)
    }

    fn scan(&self) -> Vec<ExtensionDescriptor> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for root in &self.roots {
            for ext in scan_root(root) {
                if seen.insert(ext.name.clone()) {
                    found.push(ext);
                }
            }
        }
        found
    }
}

impl ExtensionSource for FsExtensionSource {
    fn discover(&self, role: Role) -> Vec<ExtensionDescriptor> {
        let mut matching: Vec<_> = self.scan().into_iter().filter(|e| e.role == role).collect();
        sort(&mut matching);
        matching
    }
}

fn scan_root(root: &Path) -> Vec<ExtensionDescriptor> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let mut out = Vec::new();
    for dir in dirs {
        let manifest = dir.join(paths::SKILL_MANIFEST);
        let Ok(content) = std::fs::read_to_string(&manifest) else {
            continue;
        };
        match parse_manifest(&content, &manifest) {
            Some(ext) => out.push(ext),
            None => tracing::debug!(path = %manifest.display(), "skipping manifest without a redgreen binding"),
        }
    }
    out
}

fn sort(exts: &mut [ExtensionDescriptor]) {
    exts.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
}

// ---------------------------------------------------------------------------
// StaticExtensions
// ---------------------------------------------------------------------------

/// A fixed list, for callers that already know their extensions.
#[derive(Debug, Default, Clone)]
pub struct StaticExtensions(pub Vec<ExtensionDescriptor>);

impl ExtensionSource for StaticExtensions {
    fn discover(&self, role: Role) -> Vec<ExtensionDescriptor> {
        let mut matching: Vec<_> = self.0.iter().filter(|e| e.role == role).cloned().collect();
        sort(&mut matching);
        matching
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_skill(root: &Path, dir: &str, frontmatter: &str) {
        let d = root.join(dir);
        std::fs::create_dir_all(&d).unwrap();
        std::fs::write(d.join("SKILL.md"), format!("---\n{frontmatter}\n---\n\n# Body\n")).unwrap();
    }

    #[test]
    fn parse_reads_binding_and_defaults_priority() {
        let ext = parse_manifest(
            "---\nname: trace\ndescription: Trace ACs\nredgreen:\n  role: qa\n---\n",
            Path::new("/x/SKILL.md"),
        )
        .unwrap();
        assert_eq!(ext.name, "trace");
        assert_eq!(ext.role, Role::TestArchitect);
        assert_eq!(ext.priority, 99);
    }

    #[test]
    fn parse_accepts_agent_key_and_ignores_unknown_keys() {
        let ext = parse_manifest(
            "---\nname: impl\nredgreen:\n  agent: dev\n  priority: 3\n  phase: green\n---\n",
            Path::new("/x/SKILL.md"),
        )
        .unwrap();
        assert_eq!(ext.role, Role::Developer);
        assert_eq!(ext.priority, 3);
    }

    #[test]
    fn parse_rejects_incomplete_manifests() {
        let p = Path::new("/x/SKILL.md");
        assert!(parse_manifest("---\nname: a\n---\n", p).is_none());
        assert!(parse_manifest("---\nredgreen:\n  role: qa\n---\n", p).is_none());
        assert!(parse_manifest("---\nname: a\nredgreen:\n  role: wizard\n---\n", p).is_none());
        assert!(parse_manifest("---\nname: a\nredgreen:\n  priority: 1\n---\n", p).is_none());
        assert!(parse_manifest("no frontmatter", p).is_none());
    }

    #[test]
    fn discover_filters_by_role_and_sorts_by_priority() {
        let dir = TempDir::new().unwrap();
        write_skill(dir.path(), "b", "name: beta\nredgreen:\n  role: qa\n  priority: 5");
        write_skill(dir.path(), "a", "name: alpha\nredgreen:\n  role: qa");
        write_skill(dir.path(), "c", "name: gamma\nredgreen:\n  role: dev\n  priority: 1");
        write_skill(dir.path(), "broken", "name: [");

        let source = FsExtensionSource::new(vec![dir.path().to_path_buf()]);
        let names: Vec<_> = source
            .discover(Role::TestArchitect)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["beta", "alpha"]);
        assert!(source.discover(Role::Planner).is_empty());
    }

    #[test]
    fn project_manifest_shadows_user_manifest() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        write_skill(project.path(), "s", "name: shared\ndescription: project\nredgreen:\n  role: sm");
        write_skill(user.path(), "s", "name: shared\ndescription: user\nredgreen:\n  role: sm");
        write_skill(user.path(), "u", "name: only-user\nredgreen:\n  role: sm");

        let source = FsExtensionSource::new(vec![
            project.path().to_path_buf(),
            user.path().to_path_buf(),
        ]);
        let found = source.discover(Role::Planner);
        assert_eq!(found.len(), 2);
        let shared = found.iter().find(|e| e.name == "shared").unwrap();
        assert_eq!(shared.description, "project");
    }

    #[test]
    fn missing_roots_yield_nothing() {
        let source = FsExtensionSource::new(vec![PathBuf::from("/does/not/exist")]);
        assert!(source.discover(Role::Developer).is_empty());
    }
}
