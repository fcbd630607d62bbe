//! Reference expansion and collapse.
//!
//! [`ContentProcessor::render`] replaces every resolvable file reference with a
//! fenced block:
//!
//! ````text
//! ```python
//! # a/foo.py
//! x=1
//! ```
//! ````
//!
//! [`ContentProcessor::unrender`] turns blocks back into bare paths and
//! reports every block whose body no longer matches the file on disk.

use crate::content::references::{find_references, FileReference};
use crate::content::source::FileSource;
use crate::utils::floor_char_boundary;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

const FENCE: &str = "```";
const CLOSING_FENCE: &str = "\n```";
const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Default `max_len` for [`ContentProcessor::preview`].
pub const DEFAULT_PREVIEW_LENGTH: usize = 500;

fn opening_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(\w*)\n# ([^\n]+)\n").expect("fence pattern is valid"))
}

/// A user edit to a rendered block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub path: String,
    pub language: String,
    /// Block body exactly as the user left it
    pub edited_content: String,
    /// File content at the time the edit was captured
    pub original_content: String,
}

/// Edits keyed by relative path.
pub type EditMap = BTreeMap<String, EditRecord>;

/// A block recovered from rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeFragment {
    pub file_path: String,
    pub language: String,
    pub content: String,
    /// Current file content, `None` when the file cannot be read
    pub original_content: Option<String>,
}

/// A fence opening that could not be matched to a closing fence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedBlock {
    /// Byte offset of the opening fence in the rendered text
    pub offset: usize,
    /// Path named on the header line
    pub header: String,
}

/// Result of [`ContentProcessor::unrender`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unrendered {
    pub text: String,
    pub edits: EditMap,
    /// Openings left untouched in `text`
    pub malformed: Vec<MalformedBlock>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStats {
    pub lines: usize,
    pub words: usize,
    pub characters: usize,
    /// Candidate reference tokens, resolvable or not
    pub file_references: usize,
    pub valid_files: usize,
}

/// One well-formed block located in rendered text.
struct Block<'t> {
    start: usize,
    end: usize,
    language: &'t str,
    path: &'t str,
    body: &'t str,
}

/// Expands and collapses file references against a [`FileSource`].
#[derive(Debug, Clone)]
pub struct ContentProcessor<F> {
    files: F,
}

impl<F: FileSource> ContentProcessor<F> {
    pub fn new(files: F) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    /// Replace every resolvable reference with a fenced block.
    ///
    /// An entry in `edits` takes the place of the file's live content. Tokens
    /// that neither resolve nor have an edit are left as written. The text is
    /// scanned once, so a path inserted by one block is never expanded again.
    pub fn render(&self, text: &str, edits: &EditMap) -> String {
        let mut cache: FxHashMap<&str, Option<String>> = FxHashMap::default();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for reference in find_references(text) {
            let path = &text[reference.span.clone()];
            let block = cache
                .entry(path)
                .or_insert_with(|| self.block_for(path, edits));
            if let Some(block) = block {
                out.push_str(&text[last..reference.span.start]);
                out.push_str(block);
                last = reference.span.end;
            }
        }

        out.push_str(&text[last..]);
        out
    }

    fn block_for(&self, path: &str, edits: &EditMap) -> Option<String> {
        let (language, content) = match edits.get(path) {
            Some(edit) => {
                // The opening fence only recognises word characters
                let language = if is_fence_tag(&edit.language) {
                    edit.language.as_str()
                } else {
                    self.files.language_for(path)
                };
                (language, edit.edited_content.clone())
            }
            None => (self.files.language_for(path), self.files.read_file(path)?),
        };
        Some(format!("{FENCE}{language}\n# {path}\n{content}{CLOSING_FENCE}"))
    }

    /// Collapse blocks back to bare paths, capturing edited bodies.
    ///
    /// A block is an edit when its trimmed body differs from the trimmed file
    /// content. Blocks naming files that can no longer be read are collapsed
    /// without an edit record. Openings with no closing fence stay in the text
    /// and are listed in [`Unrendered::malformed`]. Header paths are trimmed,
    /// so `# a/foo.py  ` collapses to `a/foo.py`.
    pub fn unrender(&self, rendered: &str) -> Unrendered {
        let (blocks, malformed) = parse_blocks(rendered);

        let mut text = String::with_capacity(rendered.len());
        let mut edits = EditMap::new();
        let mut last = 0;

        for block in &blocks {
            text.push_str(&rendered[last..block.start]);
            text.push_str(block.path);
            last = block.end;

            match self.files.read_file(block.path) {
                Some(original) if original.trim() != block.body.trim() => {
                    edits.insert(
                        block.path.to_string(),
                        EditRecord {
                            path: block.path.to_string(),
                            language: block.language.to_string(),
                            edited_content: block.body.to_string(),
                            original_content: original,
                        },
                    );
                }
                Some(_) => {}
                None => {
                    tracing::debug!(path = block.path, "Collapsed block for unreadable file");
                }
            }
        }
        text.push_str(&rendered[last..]);

        for block in &malformed {
            tracing::warn!(
                offset = block.offset,
                header = %block.header,
                "Leaving unterminated block in place"
            );
        }

        Unrendered {
            text,
            edits,
            malformed,
        }
    }

    /// Every well-formed block in `rendered`, with the current file content.
    pub fn extract_fragments(&self, rendered: &str) -> Vec<CodeFragment> {
        let (blocks, _) = parse_blocks(rendered);
        blocks
            .into_iter()
            .map(|block| CodeFragment {
                file_path: block.path.to_string(),
                language: block.language.to_string(),
                content: block.body.to_string(),
                original_content: self.files.read_file(block.path),
            })
            .collect()
    }

    /// References in `text` that name readable files.
    pub fn resolved_references(&self, text: &str) -> Vec<FileReference> {
        find_references(text)
            .into_iter()
            .filter(|r| self.files.exists(&r.path))
            .collect()
    }

    /// Each distinct candidate reference with whether it resolves.
    pub fn validate_references(&self, text: &str) -> Vec<(String, bool)> {
        let mut seen = FxHashSet::default();
        find_references(text)
            .into_iter()
            .filter(|r| seen.insert(r.path.clone()))
            .map(|r| {
                let exists = self.files.exists(&r.path);
                (r.path, exists)
            })
            .collect()
    }

    pub fn text_statistics(&self, text: &str) -> TextStats {
        let references = find_references(text);
        let valid_files = references
            .iter()
            .filter(|r| self.files.exists(&r.path))
            .count();

        TextStats {
            lines: text.split('\n').count(),
            words: text.split_whitespace().count(),
            characters: text.chars().count(),
            file_references: references.len(),
            valid_files,
        }
    }

    /// Rendered form of `text`, cut to at most `max_len` bytes.
    pub fn preview(&self, text: &str, edits: &EditMap, max_len: usize) -> String {
        let mut rendered = self.render(text, edits);
        if rendered.len() <= max_len {
            return rendered;
        }
        rendered.truncate(floor_char_boundary(&rendered, max_len));
        rendered.push_str(TRUNCATION_MARKER);
        rendered
    }
}

fn is_fence_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Split rendered text into well-formed blocks and unterminated openings.
///
/// A body runs to the first following `\n```` `. An opening whose body would
/// swallow another opening is treated as unterminated, so one damaged block
/// never absorbs its neighbour.
fn parse_blocks(rendered: &str) -> (Vec<Block<'_>>, Vec<MalformedBlock>) {
    let opening = opening_regex();
    let mut blocks = Vec::new();
    let mut malformed = Vec::new();
    let mut pos = 0;

    while let Some(caps) = opening.captures_at(rendered, pos) {
        let (Some(whole), Some(language), Some(path)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            break;
        };
        let body_start = whole.end();
        let header = path.as_str().trim();

        let close = rendered[body_start..]
            .find(CLOSING_FENCE)
            .map(|idx| body_start + idx);
        let nested = opening
            .find_at(rendered, body_start)
            .map(|m| m.start())
            .filter(|&start| close.map_or(true, |close| start < close));

        match (close, nested) {
            (Some(close), None) => {
                blocks.push(Block {
                    start: whole.start(),
                    end: close + CLOSING_FENCE.len(),
                    language: language.as_str(),
                    path: header,
                    body: &rendered[body_start..close],
                });
                pos = close + CLOSING_FENCE.len();
            }
            (_, next) => {
                malformed.push(MalformedBlock {
                    offset: whole.start(),
                    header: header.to_string(),
                });
                pos = next.unwrap_or(body_start);
            }
        }
    }

    (blocks, malformed)
}
