//! Extension to code-fence language tag mapping.

use crate::index::filter::file_extension;

/// Tag used for extensions missing from the table.
pub const FALLBACK_LANGUAGE: &str = "text";

/// Fence language for a path, derived from its extension only.
pub fn language_for(path: &str) -> &'static str {
    let Some(ext) = file_extension(path) else {
        return FALLBACK_LANGUAGE;
    };

    match ext.as_str() {
        ".py" => "python",
        ".js" => "javascript",
        ".ts" => "typescript",
        ".jsx" => "jsx",
        ".tsx" => "tsx",
        ".java" => "java",
        ".cpp" => "cpp",
        ".c" | ".h" => "c",
        ".cs" => "csharp",
        ".php" => "php",
        ".rb" => "ruby",
        ".go" => "go",
        ".rs" => "rust",
        ".swift" => "swift",
        ".kt" => "kotlin",
        ".scala" => "scala",
        ".html" => "html",
        ".css" => "css",
        ".scss" => "scss",
        ".less" => "less",
        ".xml" => "xml",
        ".json" => "json",
        ".yaml" | ".yml" => "yaml",
        ".md" => "markdown",
        ".sql" => "sql",
        ".sh" => "bash",
        ".bat" => "batch",
        ".ps1" => "powershell",
        ".r" => "r",
        ".m" => "matlab",
        _ => FALLBACK_LANGUAGE,
    }
}
