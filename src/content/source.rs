//! File lookup used when expanding references.

use crate::content::language::language_for;
use crate::utils::resolve_under_root;
use std::path::{Path, PathBuf};

/// Read access to project files by root-relative path.
///
/// Absence is a normal answer: `read_file` returns `None` for anything that
/// cannot be read.
pub trait FileSource {
    fn read_file(&self, path: &str) -> Option<String>;

    fn language_for(&self, path: &str) -> &'static str {
        language_for(path)
    }

    fn exists(&self, path: &str) -> bool {
        self.read_file(path).is_some()
    }
}

impl<T: FileSource + ?Sized> FileSource for &T {
    fn read_file(&self, path: &str) -> Option<String> {
        (**self).read_file(path)
    }

    fn language_for(&self, path: &str) -> &'static str {
        (**self).language_for(path)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }
}

/// Files on disk under a project root.
#[derive(Debug, Clone)]
pub struct RootFiles {
    root: PathBuf,
}

impl RootFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSource for RootFiles {
    /// Invalid UTF-8 is replaced rather than rejected.
    fn read_file(&self, path: &str) -> Option<String> {
        let full = resolve_under_root(&self.root, path)?;
        if !full.is_file() {
            return None;
        }
        match std::fs::read(&full) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::debug!(path = %full.display(), error = %e, "Failed to read file");
                None
            }
        }
    }

    fn exists(&self, path: &str) -> bool {
        resolve_under_root(&self.root, path).is_some_and(|full| full.is_file())
    }
}
