//! Resolution of caller-supplied relative paths.
//!
//! Every artifact path in the catalog and the current signal comes from a
//! command-line argument. Resolution is lexical first: separators are
//! normalized, `.` is dropped and `..` pops a component, and the result must
//! stay inside the requested scope. The deepest part of the result that
//! already exists is then canonicalized, so a symlink under the scope cannot
//! point a write outside it. Existence of the target itself is left to
//! callers.

use crate::layout::STATES_DIR;
use crate::StoreError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolve `relative` against `root`, requiring the result to lie inside
/// `<root>/states` (the subtree root itself included).
pub fn resolve_state_path(root: &Path, relative: &str) -> Result<PathBuf, StoreError> {
    let parts = normalize_components(relative)?;
    if parts.first().map(String::as_str) != Some(STATES_DIR) {
        return Err(StoreError::OutOfBounds {
            path: relative.to_owned(),
            scope: format!("{STATES_DIR}/"),
        });
    }
    let abs = join_parts(root, &parts);
    confine(&root.join(STATES_DIR), &abs, relative, &format!("{STATES_DIR}/"))?;
    Ok(abs)
}

/// Resolve `relative` against `root`, requiring the result to stay inside
/// the store root and name something below it.
pub fn resolve_store_path(root: &Path, relative: &str) -> Result<PathBuf, StoreError> {
    let parts = normalize_components(relative)?;
    if parts.is_empty() {
        return Err(StoreError::OutOfBounds {
            path: relative.to_owned(),
            scope: "the store root".to_owned(),
        });
    }
    let abs = join_parts(root, &parts);
    confine(root, &abs, relative, "the store root")?;
    Ok(abs)
}

/// Require the deepest existing ancestor of `abs` to canonicalize inside
/// `scope_dir`. A scope that does not exist yet has nothing to redirect.
fn confine(scope_dir: &Path, abs: &Path, relative: &str, scope: &str) -> Result<(), StoreError> {
    let out_of_bounds = || StoreError::OutOfBounds {
        path: relative.to_owned(),
        scope: scope.to_owned(),
    };
    let real_scope = match fs::canonicalize(scope_dir) {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // A dangling symlink in place of the scope is still a redirect.
            if fs::symlink_metadata(scope_dir).is_ok() {
                return Err(out_of_bounds());
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for ancestor in abs.ancestors() {
        match fs::symlink_metadata(ancestor) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
        // Present but unresolvable: a dangling link.
        let real = fs::canonicalize(ancestor).map_err(|_| out_of_bounds())?;
        if real.starts_with(&real_scope) {
            return Ok(());
        }
        tracing::warn!(
            "{} resolves to {} outside {}",
            ancestor.display(),
            real.display(),
            real_scope.display()
        );
        return Err(out_of_bounds());
    }
    Err(out_of_bounds())
}

fn is_absolute_like(normalized: &str) -> bool {
    if normalized.starts_with('/') {
        return true;
    }
    // Drive-letter paths (`C:/...`, `C:foo`) are absolute or drive-relative
    // on Windows and never meaningful inside a store.
    let mut chars = normalized.chars();
    matches!((chars.next(), chars.next()), (Some(c), Some(':')) if c.is_ascii_alphabetic())
}

fn normalize_components(relative: &str) -> Result<Vec<String>, StoreError> {
    if Path::new(relative).is_absolute() {
        return Err(StoreError::InvalidPath(relative.to_owned()));
    }
    let normalized = relative.replace('\\', "/");
    if is_absolute_like(&normalized) {
        return Err(StoreError::InvalidPath(relative.to_owned()));
    }

    let mut parts: Vec<String> = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(StoreError::OutOfBounds {
                        path: relative.to_owned(),
                        scope: "the store root".to_owned(),
                    });
                }
            }
            other => parts.push(other.to_owned()),
        }
    }
    Ok(parts)
}

fn join_parts(root: &Path, parts: &[String]) -> PathBuf {
    let mut out = root.to_path_buf();
    out.extend(parts);
    out
}
