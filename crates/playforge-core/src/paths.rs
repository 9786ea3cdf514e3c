//! Path safety helpers
//!
//! Every client-supplied project, template or file name goes through [`resolve`]
//! (or [`resolve_child`]) before it touches the filesystem. The check is lexical,
//! so it rejects traversal without reading anything; existing targets are then
//! canonicalized and re-checked to catch symlinks pointing outside the root.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolve `requested` against `root`, refusing anything that escapes it
pub fn resolve(root: &Path, requested: &str) -> Result<PathBuf> {
    if requested.trim().is_empty() {
        return Err(Error::Validation("File name cannot be empty".to_string()));
    }

    let root = std::path::absolute(root)?;
    let mut resolved = root.clone();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if resolved == root || !resolved.pop() {
                    return Err(Error::PathTraversal(requested.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathTraversal(requested.to_string()));
            }
        }
    }

    if !resolved.starts_with(&root) {
        return Err(Error::PathTraversal(requested.to_string()));
    }

    if resolved.exists() {
        let canonical_root = root.canonicalize()?;
        let canonical_target = resolved.canonicalize()?;
        if !canonical_target.starts_with(&canonical_root) {
            return Err(Error::PathTraversal(requested.to_string()));
        }
    }

    Ok(resolved)
}

/// Resolve a name that must denote a direct child of `root` (project and template ids)
pub fn resolve_child(root: &Path, name: &str) -> Result<PathBuf> {
    let resolved = resolve(root, name)?;
    let root = std::path::absolute(root)?;
    if resolved.parent() != Some(root.as_path()) {
        return Err(Error::PathTraversal(name.to_string()));
    }
    Ok(resolved)
}

/// Derive a folder name from a user-entered project name
///
/// Keeps word characters, whitespace and hyphens, trims, then turns each run of
/// whitespace into a single underscore. Lossy; collisions are the caller's problem.
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Display form of a path relative to `root`, with `/` separators
pub fn relative_display(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_plain_and_nested_names() {
        let dir = TempDir::new().unwrap();
        let root = std::path::absolute(dir.path()).unwrap();

        assert_eq!(resolve(dir.path(), "index.html").unwrap(), root.join("index.html"));
        assert_eq!(
            resolve(dir.path(), "assets/img/logo.png").unwrap(),
            root.join("assets").join("img").join("logo.png")
        );
        assert_eq!(
            resolve(dir.path(), "./assets/../style.css").unwrap(),
            root.join("style.css")
        );
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        for name in ["../secret.txt", "a/../../b", "..", "assets/../../../etc/passwd"] {
            match resolve(dir.path(), name) {
                Err(Error::PathTraversal(n)) => assert_eq!(n, name),
                other => panic!("expected traversal error for {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_resolve_rejects_absolute_paths() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolve(dir.path(), "/etc/passwd"),
            Err(Error::PathTraversal(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_without_touching_missing_root() {
        // The root does not exist; rejection must still be lexical
        let missing = Path::new("/definitely/not/here/playforge");
        assert!(matches!(
            resolve(missing, "../escape"),
            Err(Error::PathTraversal(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_empty_name() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(resolve(dir.path(), "  "), Err(Error::Validation(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "nope").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        assert!(matches!(
            resolve(dir.path(), "link/secret.txt"),
            Err(Error::PathTraversal(_))
        ));
    }

    #[test]
    fn test_resolve_child_requires_single_component() {
        let dir = TempDir::new().unwrap();
        assert!(resolve_child(dir.path(), "Quiz_1").is_ok());
        assert!(matches!(
            resolve_child(dir.path(), "Quiz_1/sub"),
            Err(Error::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_child(dir.path(), "."),
            Err(Error::PathTraversal(_))
        ));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My Quiz!"), "My_Quiz");
        assert_eq!(sanitize_name("  Storia   della  città  "), "Storia_della_città");
        assert_eq!(sanitize_name("../../etc"), "etc");
        assert_eq!(sanitize_name("drag-and-drop v2.0"), "drag-and-drop_v20");
        assert_eq!(sanitize_name("tab\tseparated"), "tab_separated");
        assert_eq!(sanitize_name("!!!"), "");
    }

    #[test]
    fn test_sanitize_name_is_idempotent() {
        for input in ["My Quiz!", " a  b ", "città/è", "x-y_z", "..//", "Memory Game #3"] {
            let once = sanitize_name(input);
            assert_eq!(sanitize_name(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_relative_display() {
        let root = Path::new("/srv/projects/quiz");
        assert_eq!(
            relative_display(root, &root.join("img").join("a.png")).as_deref(),
            Some("img/a.png")
        );
        assert_eq!(relative_display(root, root), None);
        assert_eq!(relative_display(root, Path::new("/elsewhere")), None);
    }
}
