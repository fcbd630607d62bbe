//! Utility functions shared across modules

use std::path::{Component, Path, PathBuf};

/// Format a number with underscore separators for readability (e.g., 89210 -> "89_210")
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('_');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Join a root-relative directory and an entry name with `/`.
///
/// An empty `dir` denotes the root itself.
pub fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Resolve a root-relative, POSIX-style reference to a path under `root`.
///
/// Backslashes are accepted as separators. Returns `None` for absolute paths
/// and for references that would climb out of `root`.
pub fn resolve_under_root(root: &Path, reference: &str) -> Option<PathBuf> {
    let normalized = reference.replace('\\', "/");
    let relative = Path::new(&normalized);

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if depth == 0 {
        None
    } else {
        Some(resolved)
    }
}

/// Largest byte index `<= max` that falls on a char boundary of `s`.
pub fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
