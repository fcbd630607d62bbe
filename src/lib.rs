//! jcontext - project file index with reversible reference embedding
//!
//! The crate indexes a project tree so free-form text can refer to files by
//! name, then expands those references into fenced content blocks and
//! collapses them again, capturing any edits made to the blocks.
//!
//! - [`index`]: cancellable, progress-reporting rebuilds published as atomic
//!   snapshots
//! - [`search`]: tiered file-name matching over a snapshot
//! - [`content`]: render / unrender of file references
//! - [`workspace`]: the pieces above bundled for one project root

pub mod config;
pub mod content;
pub mod error;
pub mod index;
pub mod search;
pub mod telemetry;
pub mod utils;
pub mod workspace;

pub use content::{ContentProcessor, EditMap, EditRecord, PromptSession, Unrendered};
pub use error::IndexError;
pub use index::{
    CancellationToken, IndexEvent, IndexStore, Indexer, IndexerOptions, ProgressSink,
    RebuildOutcome,
};
pub use search::Matcher;
pub use workspace::{Suggestion, Workspace};
