pub mod cancel;
pub mod filter;
pub mod indexer;
pub mod progress;
pub mod store;

pub use cancel::CancellationToken;
pub use filter::ScanFilter;
pub use indexer::{Indexer, IndexerOptions, RebuildHandle, RebuildOutcome, RebuildSummary};
pub use progress::{
    FanOut, IndexEvent, IndexingProgress, IndexingStatus, NoProgress, ProgressSink, ScanPhase,
    ScanStats, SharedIndexingProgress,
};
pub use store::{IndexBuilder, IndexEntry, IndexSnapshot, IndexStore};
