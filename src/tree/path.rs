//! Path parsing
//!
//! Paths are `/`-separated component names. Empty components are skipped, so
//! `""`, `"/"` and `"//"` all name the root and a trailing slash is ignored.

use crate::error::{FsError, FsResult};
use crate::types::{MAX_NAME_LEN, MAX_PATH_LEN};

/// Split `path` into its non-empty components.
pub fn components(path: &str) -> FsResult<Vec<&str>> {
    if path.len() > MAX_PATH_LEN {
        return Err(FsError::InvalidPath);
    }
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if components.iter().any(|c| c.len() > MAX_NAME_LEN) {
        return Err(FsError::InvalidPath);
    }
    Ok(components)
}

/// Split components into the parent's components and the final name.
/// The root has no parent.
pub fn split_parent_child<'p, 'a>(components: &'p [&'a str]) -> FsResult<(&'p [&'a str], &'a str)> {
    match components.split_last() {
        Some((child, parent)) => Ok((parent, child)),
        None => Err(FsError::InvalidPath),
    }
}

/// Whether `path` is `ancestor` or lies below it, compared component-wise.
pub fn is_within(ancestor: &[&str], path: &[&str]) -> bool {
    path.len() >= ancestor.len() && path[..ancestor.len()] == *ancestor
}
