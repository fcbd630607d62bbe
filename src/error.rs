//! Error types for index rebuilds.
//!
//! Only failures that abort a whole rebuild are errors. Per-subtree permission
//! problems, invalid regex queries and missing files are ordinary outcomes and
//! never surface through these types.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Root path not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Root path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Unable to read root directory {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Index rebuild worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, IndexError>;
