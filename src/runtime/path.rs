//! Path utility functions for archive extraction.

use std::path::{Component, Path, PathBuf};

/// Turn an archive entry path into a path relative to the extraction root.
///
/// `.` components are dropped and `..` components are resolved lexically.
/// Returns `None` for absolute paths and for paths that climb out of the root,
/// so an entry like `../../etc/passwd` can never be written.
pub fn sanitize_archive_path(entry: &Path) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if result.as_os_str().is_empty() {
        None
    } else {
        Some(result)
    }
}

/// A symlink target is kept only if it is relative and points downward from
/// the link's own directory, so every link resolves inside the extraction root.
pub fn is_contained_link_target(target: &Path) -> bool {
    let mut has_normal = false;
    for component in target.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    has_normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_paths() {
        assert_eq!(
            sanitize_archive_path(Path::new("tool")),
            Some(PathBuf::from("tool"))
        );
        assert_eq!(
            sanitize_archive_path(Path::new("./dist/tool")),
            Some(PathBuf::from("dist/tool"))
        );
        assert_eq!(
            sanitize_archive_path(Path::new("dist/../tool")),
            Some(PathBuf::from("tool"))
        );
    }

    #[test]
    fn test_sanitize_rejects_escapes() {
        assert_eq!(sanitize_archive_path(Path::new("../tool")), None);
        assert_eq!(sanitize_archive_path(Path::new("a/../../tool")), None);
        #[cfg(unix)]
        assert_eq!(sanitize_archive_path(Path::new("/etc/passwd")), None);
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert_eq!(sanitize_archive_path(Path::new("")), None);
        assert_eq!(sanitize_archive_path(Path::new("./")), None);
    }

    #[test]
    fn test_link_targets() {
        assert!(is_contained_link_target(Path::new("tool-real")));
        assert!(is_contained_link_target(Path::new("./bin/tool-real")));

        assert!(!is_contained_link_target(Path::new("../tool")));
        assert!(!is_contained_link_target(Path::new("bin/../../tool")));
        assert!(!is_contained_link_target(Path::new("/usr/bin/env")));
        assert!(!is_contained_link_target(Path::new(".")));
        assert!(!is_contained_link_target(Path::new("")));
    }
}
