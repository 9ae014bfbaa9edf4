//! Local path → platform path resolution.
//!
//! Comments and positions are addressed by the path of the file relative to
//! the repository root, with `/` separators, optionally prefixed when the
//! analyzed project lives in a subdirectory of a larger repository.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Maps local analysis-time file paths to platform-relative path strings.
///
/// Deterministic and injective for files under the repository root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    repo_root: PathBuf,
    prefix: Option<String>,
}

impl PathResolver {
    /// Walks up from the project base dir to the first directory containing
    /// `.git`. Falls back to the project base dir itself when no repository
    /// root is found.
    pub fn discover(project_base_dir: &Path, prefix: Option<String>) -> Self {
        let repo_root = project_base_dir
            .ancestors()
            .find(|dir| dir.join(".git").exists())
            .unwrap_or_else(|| {
                debug!(
                    "paths: no git root above {}, using the project base dir",
                    project_base_dir.display()
                );
                project_base_dir
            })
            .to_path_buf();
        Self { repo_root, prefix }
    }

    /// Builds a resolver with a known repository root.
    pub fn with_root(repo_root: PathBuf, prefix: Option<String>) -> Self {
        Self { repo_root, prefix }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Platform-relative path for a local file, or `None` when the file is
    /// outside the repository root. A relative input is taken as already
    /// repo-relative.
    pub fn platform_path(&self, file: &Path) -> Option<String> {
        let relative = if file.is_absolute() {
            file.strip_prefix(&self.repo_root).ok()?
        } else {
            file
        };
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        match &self.prefix {
            Some(prefix) => Some(format!("{prefix}{joined}")),
            None => Some(joined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_under_root() {
        let resolver = PathResolver::with_root(PathBuf::from("/repo"), None);
        assert_eq!(
            resolver.platform_path(Path::new("/repo/src/main/Foo.java")),
            Some("src/main/Foo.java".to_string())
        );
    }

    #[test]
    fn prefix_is_prepended() {
        let resolver = PathResolver::with_root(PathBuf::from("/repo"), Some("toto/".to_string()));
        assert_eq!(
            resolver.platform_path(Path::new("/repo/src/main/Foo.java")),
            Some("toto/src/main/Foo.java".to_string())
        );
    }

    #[test]
    fn relative_input_is_taken_as_repo_relative() {
        let resolver = PathResolver::with_root(PathBuf::from("/repo"), None);
        assert_eq!(
            resolver.platform_path(Path::new("src/lib.rs")),
            Some("src/lib.rs".to_string())
        );
    }

    #[test]
    fn file_outside_root_is_unresolvable() {
        let resolver = PathResolver::with_root(PathBuf::from("/repo"), None);
        assert_eq!(resolver.platform_path(Path::new("/elsewhere/Foo.java")), None);
    }

    #[test]
    fn discover_falls_back_to_base_dir() {
        let base = std::env::temp_dir().join("mr-annotator-paths-test");
        std::fs::create_dir_all(base.join("sub")).unwrap();
        let resolver = PathResolver::discover(&base.join("sub"), None);
        // No .git anywhere under temp: the sub dir itself becomes the root.
        assert_eq!(
            resolver.platform_path(&base.join("sub").join("a.rs")),
            Some("a.rs".to_string())
        );
    }

    #[test]
    fn discover_walks_up_to_git_root() {
        let base = std::env::temp_dir().join("mr-annotator-paths-git-test");
        let project = base.join("myProject");
        std::fs::create_dir_all(base.join(".git")).unwrap();
        std::fs::create_dir_all(&project).unwrap();
        let resolver = PathResolver::discover(&project, None);
        assert_eq!(
            resolver.platform_path(&project.join("src/Foo.java")),
            Some("myProject/src/Foo.java".to_string())
        );
    }
}
