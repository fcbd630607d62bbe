//! Directory scanning and index rebuilds.
//!
//! A rebuild runs in two passes:
//! 1. An optional counting pass (walkdir) that computes `total_files` for the
//!    progress percentage. It is best-effort and gives up after `count_budget`.
//! 2. A depth-first build pass that registers each indexed file under its bare
//!    file name and its root-relative path, then commits the new snapshot.
//!
//! Cancellation is checked at every directory entry and recursion boundary.
//! Exactly one terminal event (`Completed`, `Cancelled` or `Error`) is reported
//! per rebuild, and nothing is published unless the build pass finishes.

use crate::error::IndexError;
use crate::index::cancel::CancellationToken;
use crate::index::filter::ScanFilter;
use crate::index::progress::{IndexEvent, ProgressSink, ScanPhase, ScanStats};
use crate::index::store::{IndexBuilder, IndexStore};
use crate::utils::{format_number, join_relative};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Default cadence of progress events, in processed files.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 50;

/// Label reported while the counting pass runs.
const COUNTING_LABEL: &str = "Scanning...";

/// Options for a rebuild.
#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub filter: ScanFilter,
    /// Run the counting pass so progress events carry a total
    pub count_files: bool,
    /// Abandon the counting pass after this long (None = no limit)
    pub count_budget: Option<Duration>,
    /// Report progress at least every N processed files
    pub progress_interval: usize,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            filter: ScanFilter::default(),
            count_files: true,
            count_budget: Some(Duration::from_secs(5)),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Statistics about a committed rebuild.
#[derive(Debug, Clone, Default)]
pub struct RebuildSummary {
    pub files_indexed: usize,
    pub keys: usize,
    /// Directories skipped because they could not be listed
    pub skipped_dirs: usize,
    pub elapsed: Duration,
}

/// Result of a rebuild. Mirrors the terminal event that was reported.
#[derive(Debug)]
pub enum RebuildOutcome {
    Completed(RebuildSummary),
    Cancelled,
    Failed(IndexError),
}

impl RebuildOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RebuildOutcome::Completed(_))
    }
}

/// Scans a root directory into an [`IndexStore`].
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    options: IndexerOptions,
}

impl Indexer {
    pub fn new(options: IndexerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IndexerOptions {
        &self.options
    }

    /// Run a full rebuild on the calling thread.
    ///
    /// The previously committed snapshot stays visible until the build pass
    /// finishes, and is left untouched on cancellation or failure.
    pub fn rebuild(
        &self,
        root: &Path,
        store: &IndexStore,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RebuildOutcome {
        let started = Instant::now();
        info!(root = %root.display(), "Index rebuild started");

        if let Err(e) = check_root(root) {
            return fail(sink, e);
        }

        let mut total_files = 0;
        if self.options.count_files {
            sink.report(IndexEvent::Progress(ScanStats {
                phase: ScanPhase::Counting,
                files_processed: 0,
                total_files: 0,
                current_dir: COUNTING_LABEL.to_string(),
            }));
            match self.count_files(root, cancel) {
                Some(count) => total_files = count,
                None => return cancelled(sink),
            }
            debug!(total_files, "Counting pass finished");
        }

        let root_entries = match read_listing(root) {
            Ok(entries) => entries,
            Err(source) => {
                return fail(
                    sink,
                    IndexError::RootUnreadable {
                        path: root.to_path_buf(),
                        source,
                    },
                )
            }
        };

        let mut walker = BuildWalker {
            root,
            filter: &self.options.filter,
            builder: store.begin_rebuild(),
            sink,
            cancel,
            interval: self.options.progress_interval.clamp(1, DEFAULT_PROGRESS_INTERVAL),
            stats: ScanStats {
                phase: ScanPhase::Indexing,
                total_files,
                ..Default::default()
            },
            skipped_dirs: 0,
            lost_root: None,
        };

        if walker.visit_entries(root, "", root_entries).is_none() {
            // Builder is dropped here; the published snapshot is unchanged
            return match walker.lost_root.take() {
                Some(error) => fail(sink, error),
                None => cancelled(sink),
            };
        }

        let BuildWalker {
            builder,
            stats,
            skipped_dirs,
            ..
        } = walker;

        // The root can disappear after its own listing was read
        if let Err(e) = check_root(root) {
            return fail(sink, e);
        }

        // Final progress so consumers see the exact count before completion
        sink.report(IndexEvent::Progress(ScanStats {
            current_dir: ".".to_string(),
            ..stats.clone()
        }));

        let snapshot = builder.commit();
        let summary = RebuildSummary {
            files_indexed: snapshot.file_count(),
            keys: snapshot.key_count(),
            skipped_dirs,
            elapsed: started.elapsed(),
        };

        info!(
            files_indexed = %format_number(summary.files_indexed),
            keys = summary.keys,
            skipped_dirs = summary.skipped_dirs,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Index rebuild completed"
        );

        sink.report(IndexEvent::Completed {
            files_indexed: summary.files_indexed,
        });
        RebuildOutcome::Completed(summary)
    }

    /// Run a rebuild on a background thread.
    pub fn spawn(
        &self,
        root: PathBuf,
        store: Arc<IndexStore>,
        sink: Arc<dyn ProgressSink>,
    ) -> RebuildHandle {
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let indexer = self.clone();

        let handle = std::thread::spawn(move || {
            let guard = TerminalGuard::new(sink.as_ref());
            // A panic must still produce the single terminal event
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                indexer.rebuild(&root, &store, &guard, &worker_cancel)
            })) {
                Ok(outcome) => outcome,
                Err(_) if guard.terminal_sent() => {
                    tracing::error!(
                        root = %root.display(),
                        "Index rebuild worker panicked after its terminal event"
                    );
                    RebuildOutcome::Failed(IndexError::WorkerPanicked)
                }
                Err(_) => {
                    tracing::error!(root = %root.display(), "Index rebuild worker panicked");
                    fail(&guard, IndexError::WorkerPanicked)
                }
            }
        });

        RebuildHandle { cancel, handle }
    }

    /// Counting pass. Returns `None` if cancelled, `Some(0)` if the budget ran out.
    fn count_files(&self, root: &Path, cancel: &CancellationToken) -> Option<usize> {
        let started = Instant::now();
        let filter = &self.options.filter;
        let mut count = 0usize;

        let walker = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                if entry.file_type().is_dir() {
                    filter.should_descend(&name)
                } else {
                    !filter.is_hidden(&name)
                }
            });

        for entry in walker {
            cancel.check()?;

            if let Some(budget) = self.options.count_budget {
                if started.elapsed() > budget {
                    debug!(
                        counted = count,
                        budget_ms = budget.as_millis() as u64,
                        "Counting pass over budget, continuing without a total"
                    );
                    return Some(0);
                }
            }

            match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    let is_file = file_type.is_file()
                        || (file_type.is_symlink() && entry.path().is_file());
                    if is_file && filter.should_index(&entry.file_name().to_string_lossy()) {
                        count += 1;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Error while counting files");
                }
            }
        }

        Some(count)
    }
}

/// Handle to a background rebuild.
#[derive(Debug)]
pub struct RebuildHandle {
    cancel: CancellationToken,
    handle: JoinHandle<RebuildOutcome>,
}

impl RebuildHandle {
    /// Request cancellation. The worker stops at its next check point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to finish.
    pub fn join(self) -> RebuildOutcome {
        self.handle
            .join()
            .unwrap_or(RebuildOutcome::Failed(IndexError::WorkerPanicked))
    }
}

/// Forwards events and remembers whether a terminal one went through.
struct TerminalGuard<'a> {
    inner: &'a dyn ProgressSink,
    sent: AtomicBool,
}

impl<'a> TerminalGuard<'a> {
    fn new(inner: &'a dyn ProgressSink) -> Self {
        Self {
            inner,
            sent: AtomicBool::new(false),
        }
    }

    fn terminal_sent(&self) -> bool {
        self.sent.load(Ordering::Acquire)
    }
}

impl ProgressSink for TerminalGuard<'_> {
    fn report(&self, event: IndexEvent) {
        if event.is_terminal() {
            self.sent.store(true, Ordering::Release);
        }
        self.inner.report(event);
    }
}

/// State of the build pass.
struct BuildWalker<'a> {
    root: &'a Path,
    filter: &'a ScanFilter,
    builder: IndexBuilder<'a>,
    sink: &'a dyn ProgressSink,
    cancel: &'a CancellationToken,
    interval: usize,
    stats: ScanStats,
    skipped_dirs: usize,
    /// Set when a listing failed because the root itself is gone
    lost_root: Option<IndexError>,
}

impl BuildWalker<'_> {
    /// Scan one directory. `rel_dir` is empty for the root.
    ///
    /// Returns `None` once cancellation is observed or the root is gone.
    fn visit_dir(&mut self, dir: &Path, rel_dir: &str) -> Option<()> {
        self.cancel.check()?;

        // The listing is read in full before anything is registered, so a
        // directory that errors contributes nothing.
        let entries = match read_listing(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    if let Err(lost) = check_root(self.root) {
                        self.lost_root = Some(lost);
                        return None;
                    }
                }
                warn!(
                    path = %dir.display(),
                    error = %e,
                    "Skipping directory that could not be listed"
                );
                self.skipped_dirs += 1;
                return Some(());
            }
        };

        self.visit_entries(dir, rel_dir, entries)
    }

    fn visit_entries(&mut self, dir: &Path, rel_dir: &str, entries: Vec<fs::DirEntry>) -> Option<()> {
        self.enter(rel_dir);

        for entry in entries {
            self.cancel.check()?;

            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };

            if self.filter.is_hidden(&name) {
                continue;
            }

            let Some(kind) = entry_kind(&entry) else {
                continue;
            };

            match kind {
                EntryKind::Dir => {
                    if self.filter.should_descend(&name) {
                        let rel_child = join_relative(rel_dir, &name);
                        self.visit_dir(&dir.join(&name), &rel_child)?;
                        // Back at this directory's level
                        self.enter(rel_dir);
                    }
                }
                EntryKind::File => {
                    if self.filter.should_index(&name) {
                        let rel_path = join_relative(rel_dir, &name);
                        self.builder.add_file(&name, &rel_path);
                        self.stats.files_processed += 1;
                        if self.stats.files_processed % self.interval == 0 {
                            self.report();
                        }
                    }
                }
            }
        }

        Some(())
    }

    /// Directory boundary transition.
    fn enter(&mut self, rel_dir: &str) {
        self.stats.current_dir = if rel_dir.is_empty() {
            ".".to_string()
        } else {
            rel_dir.to_string()
        };
        self.report();
    }

    fn report(&self) {
        self.sink.report(IndexEvent::Progress(self.stats.clone()));
    }
}

enum EntryKind {
    Dir,
    File,
}

/// Classify an entry. Symlinks to files are indexed; symlinked directories are
/// not followed so the walk cannot cycle.
fn entry_kind(entry: &fs::DirEntry) -> Option<EntryKind> {
    let file_type = match entry.file_type() {
        Ok(ft) => ft,
        Err(e) => {
            debug!(path = %entry.path().display(), error = %e, "Unable to stat entry");
            return None;
        }
    };

    if file_type.is_dir() {
        Some(EntryKind::Dir)
    } else if file_type.is_file() {
        Some(EntryKind::File)
    } else if file_type.is_symlink() {
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_file() => Some(EntryKind::File),
            _ => None,
        }
    } else {
        None
    }
}

fn read_listing(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
    fs::read_dir(dir)?.collect()
}

fn check_root(root: &Path) -> Result<(), IndexError> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(IndexError::NotADirectory(root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(IndexError::RootNotFound(root.to_path_buf()))
        }
        Err(source) => Err(IndexError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        }),
    }
}

fn fail(sink: &dyn ProgressSink, error: IndexError) -> RebuildOutcome {
    tracing::error!(error = %error, "Index rebuild failed");
    sink.report(IndexEvent::Error {
        message: error.to_string(),
    });
    RebuildOutcome::Failed(error)
}

fn cancelled(sink: &dyn ProgressSink) -> RebuildOutcome {
    info!("Index rebuild cancelled");
    sink.report(IndexEvent::Cancelled);
    RebuildOutcome::Cancelled
}
