//! Containment check for paths that are about to be read or written.
//!
//! Every call resolves symlinks afresh: the filesystem can change between
//! calls, so a [`ValidatedPath`] is only a statement about the moment it was
//! produced.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::security::ValidationError;

/// An absolute path that resolved inside a root when it was validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath(PathBuf);

impl ValidatedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Validate that `candidate` stays within `repo_root`.
///
/// Relative candidates are resolved against `repo_root`. `.` and `..` are
/// collapsed lexically first, then symlinks are resolved:
///
/// - existing targets return their fully resolved location
/// - targets that do not exist yet have their parent resolved and checked
///   instead, and the lexical path is returned
///
/// Containment is component-wise, so `/srv/repo-evil` is never inside
/// `/srv/repo`.
pub fn validate_path_within_repo(
    candidate: impl AsRef<Path>,
    repo_root: impl AsRef<Path>,
) -> Result<ValidatedPath, ValidationError> {
    let repo_root = repo_root.as_ref();
    let lexical = lexically_resolve(&absolute(repo_root).join(candidate.as_ref()));

    let resolved_root = fs::canonicalize(repo_root).map_err(|source| {
        ValidationError::RootNotFound {
            root: repo_root.to_path_buf(),
            source,
        }
    })?;

    match fs::canonicalize(&lexical) {
        Ok(resolved) => {
            ensure_within(&resolved, &resolved_root, &lexical)?;
            Ok(ValidatedPath(resolved))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // Target does not exist yet; its parent must.
            let parent = lexical.parent().unwrap_or(&lexical);
            match fs::canonicalize(parent) {
                Ok(resolved_parent) => {
                    ensure_within(&resolved_parent, &resolved_root, &lexical)?;
                    Ok(ValidatedPath(lexical))
                }
                Err(source) => {
                    // Escaping outranks a missing directory
                    let ancestor = nearest_existing_ancestor(parent)?;
                    ensure_within(&ancestor, &resolved_root, &lexical)?;
                    Err(ValidationError::ParentNotFound {
                        path: lexical,
                        source,
                    })
                }
            }
        }
        Err(source) => Err(ValidationError::Resolution {
            path: lexical,
            source,
        }),
    }
}

fn ensure_within(resolved: &Path, root: &Path, reported: &Path) -> Result<(), ValidationError> {
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(ValidationError::PathEscapesRoot {
            path: reported.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}

/// Resolve the closest ancestor of `path` that exists on disk
fn nearest_existing_ancestor(path: &Path) -> Result<PathBuf, ValidationError> {
    let mut last_err = None;
    for ancestor in path.ancestors() {
        match fs::canonicalize(ancestor) {
            Ok(resolved) => return Ok(resolved),
            Err(err) if err.kind() == io::ErrorKind::NotFound => last_err = Some(err),
            Err(source) => {
                return Err(ValidationError::Resolution {
                    path: ancestor.to_path_buf(),
                    source,
                });
            }
        }
    }
    Err(ValidationError::Resolution {
        path: path.to_path_buf(),
        source: last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotFound)),
    })
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Collapse `.` and `..` without touching the filesystem.
///
/// `..` at the filesystem root stays at the root, matching how the kernel
/// resolves `/..`.
fn lexically_resolve(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => resolved.push(prefix.as_os_str()),
            Component::RootDir => resolved.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => resolved.push(part),
        }
    }
    resolved
}
