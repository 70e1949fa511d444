//! Path utility functions for normalization and relative links.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Keep the `..` when there is nothing left to pop
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => {
                result.push(component);
            }
        }
    }
    result
}

/// Calculate the relative path from a symlink location to a target.
///
/// For example, a link at `/work/app/build/vendor/acme/lib` pointing to
/// `/work/app/vendor/acme/lib-1.0.0` yields `../../../vendor/acme/lib-1.0.0`.
///
/// Returns `None` if a relative path cannot be computed (e.g., different drive letters on Windows).
pub fn relative_symlink_path(from_link: &Path, to_target: &Path) -> Option<PathBuf> {
    let from_dir = from_link.parent()?;
    let result = pathdiff::diff_paths(to_target, from_dir)?;

    if result.is_absolute() {
        return None;
    }

    Some(result)
}
