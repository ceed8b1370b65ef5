//! Path utility functions for normalization and containment checks.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Check if a path is under a given directory by comparing normalized path components.
///
/// `/srv/pkgs/foo/../../../etc/passwd` is NOT under `/srv/pkgs`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_dir = normalize_path(dir);

    let path_components: Vec<_> = normalized_path.components().collect();
    let dir_components: Vec<_> = normalized_dir.components().collect();

    if path_components.len() < dir_components.len() {
        return false;
    }

    dir_components
        .iter()
        .zip(path_components.iter())
        .all(|(d, p)| d == p)
}

/// Join a slash-separated relative path (as found in archive entries) onto `base`.
///
/// Returns `None` for absolute paths or paths that would escape `base`.
pub fn safe_join(base: &Path, rel: &str) -> Option<PathBuf> {
    let mut joined = base.to_path_buf();
    for part in rel.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            part if part.contains('\\') || part.contains(':') => return None,
            part => joined.push(part),
        }
    }
    if rel.starts_with('/') {
        return None;
    }
    Some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_with_parent_dir() {
        assert_eq!(
            normalize_path(Path::new("/srv/pkgs/../bin")),
            PathBuf::from("/srv/bin")
        );
    }

    #[test]
    fn test_normalize_path_mixed_components() {
        assert_eq!(
            normalize_path(Path::new("/srv/./pkgs/../bin/./tool")),
            PathBuf::from("/srv/bin/tool")
        );
    }

    #[test]
    fn test_normalize_path_relative() {
        assert_eq!(
            normalize_path(Path::new("foo/bar/../baz")),
            PathBuf::from("foo/baz")
        );
    }

    #[test]
    fn test_is_path_under() {
        assert!(is_path_under(
            Path::new("/srv/pkgs/foo/1.0/current"),
            Path::new("/srv/pkgs/foo/1.0")
        ));
        assert!(is_path_under(Path::new("/srv/pkgs"), Path::new("/srv/pkgs")));
        assert!(!is_path_under(
            Path::new("/srv/pkgs/foo/1.0.1"),
            Path::new("/srv/pkgs/foo/1.0")
        ));
        assert!(!is_path_under(
            Path::new("/srv/pkgs/foo/../../../etc/passwd"),
            Path::new("/srv/pkgs")
        ));
    }

    #[test]
    fn test_safe_join() {
        let base = Path::new("/out");
        assert_eq!(
            safe_join(base, "bin/tool"),
            Some(PathBuf::from("/out/bin/tool"))
        );
        assert_eq!(safe_join(base, "./a//b/"), Some(PathBuf::from("/out/a/b")));
        assert_eq!(safe_join(base, "../etc/passwd"), None);
        assert_eq!(safe_join(base, "a/../../b"), None);
        assert_eq!(safe_join(base, "/etc/passwd"), None);
    }
}
