//! Entry filtering rules shared by the counting and build passes.

use std::collections::HashSet;
use std::path::Path;

/// Directories pruned by default.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "__pycache__", ".git", ".svn", ".hg", ".vscode", ".idea", // Tooling and VCS
    "node_modules", ".env", "venv", ".venv", "env", "ENV", // Environments
    "dist", "build", "target", "bin", "obj", // Build output
    ".pytest_cache",
];

/// Extensions indexed by default (lowercase, with leading dot).
pub const DEFAULT_INDEXED_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".cpp", ".c", ".h", ".cs", ".php", ".rb",
    ".go", ".rs", ".swift", ".kt", ".scala", // Code
    ".html", ".css", ".scss", ".less", ".xml", ".json", ".yaml", ".yml", // Markup and data
    ".md", ".txt", ".rst", ".sql", ".sh", ".bat", ".ps1", ".r", ".m",
];

/// Dot-prefixed names that are still indexed.
pub const DEFAULT_ALLOWED_DOTFILES: &[&str] = &[".gitignore", ".env.example"];

/// Decides which directory entries take part in a scan.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    ignored_dirs: HashSet<String>,
    /// Lowercase, leading dot
    extensions: HashSet<String>,
    allowed_dotfiles: HashSet<String>,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()),
            DEFAULT_INDEXED_EXTENSIONS.iter().map(|s| s.to_string()),
            DEFAULT_ALLOWED_DOTFILES.iter().map(|s| s.to_string()),
        )
    }
}

impl ScanFilter {
    /// Extensions may be given with or without the leading dot.
    pub fn new(
        ignored_dirs: impl IntoIterator<Item = String>,
        extensions: impl IntoIterator<Item = String>,
        allowed_dotfiles: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            ignored_dirs: ignored_dirs.into_iter().collect(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(&ext))
                .filter(|ext| ext.len() > 1)
                .collect(),
            allowed_dotfiles: allowed_dotfiles.into_iter().collect(),
        }
    }

    /// Hidden entries are skipped unless explicitly allow-listed.
    pub fn is_hidden(&self, name: &str) -> bool {
        name.starts_with('.') && !self.allowed_dotfiles.contains(name)
    }

    /// Whether the walker should descend into a directory with this name.
    pub fn should_descend(&self, name: &str) -> bool {
        !self.is_hidden(name) && !self.ignored_dirs.contains(name)
    }

    /// Whether a regular file with this name is indexed.
    ///
    /// Files without an extension pass by default, as do allow-listed
    /// dotfiles whatever their extension.
    pub fn should_index(&self, name: &str) -> bool {
        if self.allowed_dotfiles.contains(name) {
            return true;
        }
        if self.is_hidden(name) {
            return false;
        }
        match file_extension(name) {
            Some(ext) => self.extensions.contains(&ext),
            None => true,
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Lowercased extension with its leading dot.
///
/// Follows the usual rule that a leading dot does not start an extension, so
/// `.gitignore` has none and `.env.example` has `.example`.
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}
