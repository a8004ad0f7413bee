//! Secure filesystem path resolution.
//!
//! # Responsibilities
//! - Resolve a caller-controlled relative path against a fixed root
//! - Reject any resolution escaping the root, under all encodings
//!
//! # Design Decisions
//! - Relative input is always treated as root-relative; a leading
//!   separator is stripped, never honored as absolute
//! - `.`/`..` are collapsed lexically on the *joined* path, without
//!   touching the filesystem, so missing files still resolve
//! - Containment is checked with `Path::starts_with`, which compares at
//!   component boundaries; `/base/path-other` does not count as inside
//!   `/base/path`
//! - The root is normalized with the same routine before comparing.
//!   Comparing against an unnormalized root once let `..`-escapes pass

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Error type for path resolution. The calling handler decides whether
/// this surfaces as status 51 or 59; it never reaches the wire as-is.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("path {path:?} escapes the content root")]
    OutsideRoot { path: String },
}

/// Resolve `relative` against `root`, failing if the normalized result
/// leaves the root.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, ResolveError> {
    let stripped = relative.trim_start_matches('/');
    let stripped = if stripped.is_empty() { "." } else { stripped };

    let normalized_root = normalize(root);
    let candidate = normalize(&root.join(stripped));

    if candidate.starts_with(&normalized_root) {
        Ok(candidate)
    } else {
        Err(ResolveError::OutsideRoot {
            path: relative.to_string(),
        })
    }
}

/// Collapse `.` and `..` components lexically.
///
/// `..` above the top is dropped: for absolute paths `PathBuf::pop`
/// stops at the filesystem root, and a relative path that climbs out of
/// itself can only fall outside the root and fail containment.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_inside_root() {
        let resolved = resolve(Path::new("/srv/capsule"), "docs/readme.gmi").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/capsule/docs/readme.gmi"));
    }

    #[test]
    fn leading_separator_is_root_relative() {
        let resolved = resolve(Path::new("/srv/capsule"), "/docs/readme.gmi").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/capsule/docs/readme.gmi"));
    }

    #[test]
    fn empty_path_resolves_to_root() {
        let resolved = resolve(Path::new("/srv/capsule"), "").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/capsule"));
        let resolved = resolve(Path::new("/srv/capsule"), "/").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/capsule"));
    }

    #[test]
    fn collapses_dot_segments_inside_root() {
        let resolved = resolve(Path::new("/srv/capsule"), "a/./b/../c").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/capsule/a/c"));
    }

    #[test]
    fn rejects_parent_escape() {
        assert!(resolve(Path::new("/srv/capsule"), "../etc/passwd").is_err());
        assert!(resolve(Path::new("/srv/capsule"), "a/../../etc/passwd").is_err());
        assert!(resolve(Path::new("/srv/capsule"), "../../../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_sibling_sharing_root_as_string_prefix() {
        // Regression for the naive string-prefix defect: "/base/path-other"
        // begins with "/base/path" as a string but not as a path.
        let err = resolve(Path::new("/base/path"), "../path-other/x").unwrap_err();
        assert!(matches!(err, ResolveError::OutsideRoot { .. }));
    }

    #[test]
    fn unnormalized_root_does_not_reopen_escapes() {
        // The root itself is normalized before comparison, so a root
        // spelled with redundant segments gains no extra reach.
        let err = resolve(Path::new("/srv/./capsule"), "../secrets").unwrap_err();
        assert!(matches!(err, ResolveError::OutsideRoot { .. }));
        let ok = resolve(Path::new("/srv/./capsule"), "page.gmi").unwrap();
        assert_eq!(ok, PathBuf::from("/srv/capsule/page.gmi"));
    }

    #[test]
    fn escape_and_return_is_still_rejected() {
        // Leaves the root then steps back into a lookalike directory.
        assert!(resolve(Path::new("/srv/capsule"), "../capsule-backup/x").is_err());
        // Leaves and returns to the real root: normalizes inside, accepted.
        let resolved = resolve(Path::new("/srv/capsule"), "../capsule/x").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/capsule/x"));
    }

    #[test]
    fn relative_root_is_supported() {
        let resolved = resolve(Path::new("capsule"), "docs/x.gmi").unwrap();
        assert_eq!(resolved, PathBuf::from("capsule/docs/x.gmi"));
        assert!(resolve(Path::new("capsule"), "../outside").is_err());
    }
}
