pub mod language;
pub mod processor;
pub mod references;
pub mod session;
pub mod source;

pub use language::{language_for, FALLBACK_LANGUAGE};
pub use processor::{
    CodeFragment, ContentProcessor, EditMap, EditRecord, MalformedBlock, TextStats, Unrendered,
    DEFAULT_PREVIEW_LENGTH,
};
pub use references::{find_at_query, find_references, replace_at_query, AtQuery, FileReference};
pub use session::PromptSession;
pub use source::{FileSource, RootFiles};
