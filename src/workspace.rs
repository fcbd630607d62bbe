//! A project root with its index and content processor.

use crate::content::{
    find_at_query, AtQuery, ContentProcessor, EditMap, RootFiles, Unrendered,
};
use crate::index::{
    CancellationToken, IndexSnapshot, IndexStore, Indexer, IndexerOptions, ProgressSink,
    RebuildHandle, RebuildOutcome,
};
use crate::search::Matcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An `@` query under the cursor and the files it currently matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub at: AtQuery,
    pub candidates: Vec<String>,
}

/// Everything needed to index a project and expand references into it.
///
/// Searches and renders read whichever snapshot is published when they start,
/// so they can run while a spawned rebuild is in progress.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    store: Arc<IndexStore>,
    indexer: Indexer,
    processor: ContentProcessor<RootFiles>,
}

impl Workspace {
    /// Nothing is scanned until [`Workspace::rebuild`] or
    /// [`Workspace::spawn_rebuild`] runs.
    pub fn open(root: impl Into<PathBuf>, options: IndexerOptions) -> Self {
        let root = root.into();
        Self {
            processor: ContentProcessor::new(RootFiles::new(root.clone())),
            store: Arc::new(IndexStore::new()),
            indexer: Indexer::new(options),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.store.snapshot()
    }

    pub fn processor(&self) -> &ContentProcessor<RootFiles> {
        &self.processor
    }

    /// Rebuild on the calling thread.
    pub fn rebuild(&self, sink: &dyn ProgressSink, cancel: &CancellationToken) -> RebuildOutcome {
        self.indexer.rebuild(&self.root, &self.store, sink, cancel)
    }

    /// Rebuild on a background thread.
    pub fn spawn_rebuild(&self, sink: Arc<dyn ProgressSink>) -> RebuildHandle {
        self.indexer
            .spawn(self.root.clone(), Arc::clone(&self.store), sink)
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<String> {
        let snapshot = self.store.snapshot();
        Matcher::new(&snapshot).search(query, limit)
    }

    /// Candidates for the `@` query containing `cursor`, if there is one.
    pub fn suggest(&self, text: &str, cursor: usize, limit: usize) -> Option<Suggestion> {
        let at = find_at_query(text, cursor)?;
        let candidates = self.search(&at.query, limit);
        Some(Suggestion { at, candidates })
    }

    pub fn render(&self, text: &str, edits: &EditMap) -> String {
        self.processor.render(text, edits)
    }

    pub fn unrender(&self, rendered: &str) -> Unrendered {
        self.processor.unrender(rendered)
    }
}
