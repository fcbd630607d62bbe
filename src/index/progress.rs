//! Rebuild progress events and the sinks that consume them.
//!
//! A rebuild pushes [`IndexEvent`]s into a [`ProgressSink`]. Consumers pick push
//! or pull: a closure or channel receives every event, while
//! [`SharedIndexingProgress`] folds them into a status object that a UI can poll.

use serde::Serialize;
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};

/// Which pass of a rebuild produced a progress event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// Counting files to compute the progress total
    #[default]
    Counting,
    /// Registering files in the new snapshot
    Indexing,
}

/// Transient counters owned by an in-progress rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub phase: ScanPhase,
    pub files_processed: usize,
    /// Zero when the counting pass was skipped
    pub total_files: usize,
    pub current_dir: String,
}

/// Events emitted by a rebuild. Exactly one terminal event per rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexEvent {
    Progress(ScanStats),
    Cancelled,
    Completed { files_indexed: usize },
    Error { message: String },
}

impl IndexEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IndexEvent::Progress(_))
    }
}

/// Receiver of rebuild events. Called from the rebuild thread.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: IndexEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(IndexEvent) + Send + Sync,
{
    fn report(&self, event: IndexEvent) {
        self(event)
    }
}

impl ProgressSink for Sender<IndexEvent> {
    fn report(&self, event: IndexEvent) {
        // Ignore errors if the receiver is gone
        let _ = self.send(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: IndexEvent) {}
}

/// Forwards each event to several sinks in order.
pub struct FanOut(pub Vec<Box<dyn ProgressSink>>);

impl ProgressSink for FanOut {
    fn report(&self, event: IndexEvent) {
        for sink in &self.0 {
            sink.report(event.clone());
        }
    }
}

/// Status of the indexing process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingStatus {
    /// No rebuild has run yet
    #[default]
    Idle,
    /// Counting files for the progress total
    Counting,
    /// Walking the tree and registering files
    Indexing,
    Completed,
    Cancelled,
    Failed,
}

/// Pollable progress information for the most recent rebuild
#[derive(Debug, Clone, Serialize)]
pub struct IndexingProgress {
    pub status: IndexingStatus,
    pub files_processed: usize,
    pub total_files: usize,
    /// Directory currently being scanned (for display)
    pub current_dir: Option<String>,
    /// Timestamp when the rebuild started (Unix epoch millis)
    pub started_at: Option<u64>,
    /// Message describing current activity
    pub message: String,
}

impl Default for IndexingProgress {
    fn default() -> Self {
        Self {
            status: IndexingStatus::Idle,
            files_processed: 0,
            total_files: 0,
            current_dir: None,
            started_at: None,
            message: String::from("Ready"),
        }
    }
}

impl IndexingProgress {
    /// Create a new progress tracker for a starting rebuild
    pub fn start() -> Self {
        Self {
            status: IndexingStatus::Counting,
            started_at: Some(unix_millis()),
            message: String::from("Scanning..."),
            ..Default::default()
        }
    }

    /// Calculate progress percentage (0-100)
    pub fn progress_percent(&self) -> u8 {
        match self.status {
            IndexingStatus::Idle | IndexingStatus::Counting => 0,
            IndexingStatus::Indexing => {
                if self.total_files == 0 {
                    0
                } else {
                    let ratio = self.files_processed as f64 / self.total_files as f64;
                    (ratio * 100.0).min(99.0) as u8
                }
            }
            IndexingStatus::Completed => 100,
            IndexingStatus::Cancelled | IndexingStatus::Failed => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.status,
            IndexingStatus::Counting | IndexingStatus::Indexing
        )
    }

    /// Fold one rebuild event into the status.
    pub fn apply(&mut self, event: &IndexEvent) {
        match event {
            IndexEvent::Progress(stats) => {
                if self.started_at.is_none() {
                    self.started_at = Some(unix_millis());
                }
                self.status = match stats.phase {
                    ScanPhase::Counting => IndexingStatus::Counting,
                    ScanPhase::Indexing => IndexingStatus::Indexing,
                };
                self.files_processed = stats.files_processed;
                self.total_files = stats.total_files;
                self.current_dir = Some(stats.current_dir.clone());
                self.message = match stats.phase {
                    ScanPhase::Counting => String::from("Counting files..."),
                    ScanPhase::Indexing if stats.total_files > 0 => format!(
                        "{}/{} files ({})",
                        stats.files_processed, stats.total_files, stats.current_dir
                    ),
                    ScanPhase::Indexing => format!(
                        "{} files ({})",
                        stats.files_processed, stats.current_dir
                    ),
                };
            }
            IndexEvent::Completed { files_indexed } => {
                self.status = IndexingStatus::Completed;
                self.files_processed = *files_indexed;
                self.current_dir = None;
                self.message = format!("Indexed {} files", files_indexed);
            }
            IndexEvent::Cancelled => {
                self.status = IndexingStatus::Cancelled;
                self.current_dir = None;
                self.message = String::from("Indexing cancelled");
            }
            IndexEvent::Error { message } => {
                self.status = IndexingStatus::Failed;
                self.current_dir = None;
                self.message = format!("Indexing failed: {}", message);
            }
        }
    }
}

/// Shared, pollable progress state.
pub type SharedIndexingProgress = Arc<RwLock<IndexingProgress>>;

impl ProgressSink for SharedIndexingProgress {
    fn report(&self, event: IndexEvent) {
        if let Ok(mut p) = self.write() {
            p.apply(&event);
        }
    }
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
