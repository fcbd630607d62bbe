//! Integration tests for jcontext
//!
//! These tests build real project trees in temporary directories, index them
//! through the public API, and check search, render and unrender end to end.

use jcontext::config::Config;
use jcontext::content::{EditMap, PromptSession};
use jcontext::index::{
    CancellationToken, IndexEvent, IndexingProgress, IndexingStatus, NoProgress,
    SharedIndexingProgress,
};
use jcontext::{IndexStore, Indexer, IndexerOptions, RebuildOutcome, Workspace};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, RwLock};
use std::thread;
use tempfile::TempDir;

const PYTHON_FILE: &str = "def handler(event):\n    return event\n";

const RUST_FILE: &str = r#"pub fn parse(input: &str) -> Option<u32> {
    input.trim().parse().ok()
}
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// The two-file project used throughout: `a/foo.py` and `bar.py`.
fn scenario_workspace() -> (TempDir, Workspace) {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/foo.py", "x=1");
    write(dir.path(), "bar.py", "y=2");

    let workspace = Workspace::open(dir.path(), IndexerOptions::default());
    let outcome = workspace.rebuild(&NoProgress, &CancellationToken::new());
    assert!(outcome.is_completed());
    (dir, workspace)
}

fn project_with_files(count: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for i in 0..count {
        write(dir.path(), &format!("pkg{}/module_{i}.py", i % 10), PYTHON_FILE);
    }
    write(dir.path(), "src/lib.rs", RUST_FILE);
    write(dir.path(), "node_modules/dep/index.js", "module.exports = 1;");
    dir
}

#[test]
fn test_concrete_scenario() {
    let (_dir, workspace) = scenario_workspace();

    assert_eq!(workspace.search("foo", 3), vec!["a/foo.py"]);

    let rendered = workspace.render("see a/foo.py", &EditMap::new());
    assert!(rendered.contains("```python\n"));
    assert!(rendered.contains("\n# a/foo.py\n"));
    assert!(rendered.contains("\nx=1\n"));
    assert!(rendered.ends_with("```"));

    let back = workspace.unrender(&rendered);
    assert_eq!(back.text, "see a/foo.py");
    assert!(back.edits.is_empty());
}

#[test]
fn test_every_file_found_first_by_name() {
    let dir = project_with_files(30);
    let workspace = Workspace::open(dir.path(), IndexerOptions::default());
    workspace.rebuild(&NoProgress, &CancellationToken::new());

    let snapshot = workspace.snapshot();
    assert_eq!(snapshot.file_count(), 31);
    assert!(!snapshot.contains_path("node_modules/dep/index.js"));

    assert_eq!(workspace.search("lib.rs", 1), vec!["src/lib.rs"]);
    assert_eq!(workspace.search("module_17.py", 1), vec!["pkg7/module_17.py"]);
    assert!(workspace.search("index.js", 5).is_empty());
}

#[test]
fn test_round_trip_with_edits_through_json() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/lib.rs", RUST_FILE);
    write(dir.path(), "handlers/api.py", PYTHON_FILE);
    let workspace = Workspace::open(dir.path(), IndexerOptions::default());

    let prompt = "Refactor src/lib.rs to match handlers/api.py\nThanks!";
    let rendered = workspace.render(prompt, &EditMap::new());
    assert_eq!(workspace.unrender(&rendered).text, prompt);

    let edited = rendered.replace("input.trim()", "input.trim_start()");
    let back = workspace.unrender(&edited);
    assert_eq!(back.text, prompt);
    assert_eq!(back.edits.len(), 1);
    let record = &back.edits["src/lib.rs"];
    assert_eq!(record.original_content, RUST_FILE);
    assert!(record.edited_content.contains("input.trim_start()"));

    // Edit maps survive a trip through JSON and re-render identically
    let json = serde_json::to_string(&back.edits).unwrap();
    let restored: EditMap = serde_json::from_str(&json).unwrap();
    assert_eq!(workspace.render(prompt, &restored), edited);
}

#[test]
fn test_session_toggle_keeps_edits() {
    let (_dir, workspace) = scenario_workspace();
    let mut session = PromptSession::new("compare a/foo.py with bar.py");

    let rendered = session.enter_render(workspace.processor());
    let edited = rendered.replace("y=2", "y=3");
    assert_eq!(
        session.leave_render(workspace.processor(), &edited),
        "compare a/foo.py with bar.py"
    );
    assert_eq!(session.edits()["bar.py"].edited_content, "y=3");

    let again = session.enter_render(workspace.processor());
    assert_eq!(again, edited);
}

#[test]
fn test_suggest_for_at_query() {
    let (_dir, workspace) = scenario_workspace();
    let text = "please look at @fo";

    let suggestion = workspace.suggest(text, text.len(), 5).unwrap();
    assert_eq!(suggestion.at.query, "fo");
    assert_eq!(suggestion.candidates, vec!["a/foo.py"]);

    let completed = jcontext::content::replace_at_query(text, &suggestion.at, "a/foo.py");
    assert_eq!(completed, "please look at a/foo.py");
    assert!(workspace.suggest("no sigil here", 5, 5).is_none());
}

#[test]
fn test_readers_see_whole_snapshots_during_rebuild() {
    let dir = project_with_files(200);
    let store = Arc::new(IndexStore::new());
    let indexer = Indexer::default();

    // First complete index
    indexer.rebuild(dir.path(), &store, &NoProgress, &CancellationToken::new());
    let first = store.snapshot().file_count();
    assert_eq!(first, 201);

    // Grow the tree, then rebuild while readers poll
    for i in 0..50 {
        write(dir.path(), &format!("extra/new_{i}.rs"), RUST_FILE);
    }

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while !done.load(Ordering::Acquire) {
                    seen.push(store.snapshot().file_count());
                }
                seen.push(store.snapshot().file_count());
                seen
            })
        })
        .collect();

    let outcome = indexer.rebuild(dir.path(), &store, &NoProgress, &CancellationToken::new());
    done.store(true, Ordering::Release);
    assert!(outcome.is_completed());

    for reader in readers {
        for count in reader.join().unwrap() {
            assert!(count == 201 || count == 251, "saw partial snapshot of {count} files");
        }
    }
}

#[test]
fn test_spawned_rebuild_cancelled_through_handle() {
    let dir = project_with_files(300);
    let store = Arc::new(IndexStore::new());
    let indexer = Indexer::default();

    // Establish a snapshot to protect, then grow the tree
    indexer.rebuild(dir.path(), &store, &NoProgress, &CancellationToken::new());
    let baseline = store.snapshot().file_count();
    assert_eq!(baseline, 301);
    write(dir.path(), "late/added.rs", RUST_FILE);

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let gate_rx = Mutex::new(gate_rx);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let sink = Arc::new(move |event: IndexEvent| {
        let first_dir = matches!(&event, IndexEvent::Progress(s) if s.files_processed == 0);
        sink_events.lock().unwrap().push(event);
        if first_dir {
            // Hold the worker until the test has requested cancellation
            let _ = gate_rx.lock().unwrap().recv();
        }
    });

    let handle = indexer.spawn(dir.path().to_path_buf(), Arc::clone(&store), sink);
    handle.cancel();
    drop(gate_tx);

    assert!(matches!(handle.join(), RebuildOutcome::Cancelled));
    assert_eq!(store.snapshot().file_count(), baseline);
    assert!(!store.snapshot().contains_path("late/added.rs"));

    let events = events.lock().unwrap();
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(events.last(), Some(&IndexEvent::Cancelled));
}

#[test]
fn test_shared_progress_polling() {
    let dir = project_with_files(20);
    let progress: SharedIndexingProgress = Arc::new(RwLock::new(IndexingProgress::default()));
    let workspace = Workspace::open(dir.path(), IndexerOptions::default());

    let handle = workspace.spawn_rebuild(Arc::new(Arc::clone(&progress)));
    assert!(handle.join().is_completed());

    let status = progress.read().unwrap();
    assert_eq!(status.status, IndexingStatus::Completed);
    assert_eq!(status.files_processed, 21);
    assert!(!status.is_running());
}

#[test]
fn test_missing_root_fails_without_touching_snapshot() {
    let (dir, workspace) = scenario_workspace();
    let root = dir.path().to_path_buf();
    drop(dir);

    let outcome = workspace.rebuild(&NoProgress, &CancellationToken::new());
    assert!(matches!(outcome, RebuildOutcome::Failed(_)));
    assert!(workspace.snapshot().contains_path("a/foo.py"));
    assert!(!root.exists());
}

#[test]
fn test_config_controls_indexing() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/main.rs", RUST_FILE);
    write(dir.path(), "scripts/build.py", PYTHON_FILE);
    write(dir.path(), "vendor/lib.rs", RUST_FILE);

    let config: Config = toml::from_str(
        r#"
[indexer]
ignored_dirs = ["vendor"]
indexed_extensions = ["rs"]
count_files = false
"#,
    )
    .unwrap();

    let workspace = Workspace::open(dir.path(), config.indexer.to_options());
    workspace.rebuild(&NoProgress, &CancellationToken::new());

    let snapshot = workspace.snapshot();
    assert!(snapshot.contains_path("src/main.rs"));
    assert!(!snapshot.contains_path("scripts/build.py"));
    assert!(!snapshot.contains_path("vendor/lib.rs"));
}
