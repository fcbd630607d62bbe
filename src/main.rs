use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use jcontext::config::Config;
use jcontext::content::{EditMap, DEFAULT_PREVIEW_LENGTH};
use jcontext::index::{IndexEvent, ProgressSink, ScanPhase};
use jcontext::telemetry;
use jcontext::utils::format_number;
use jcontext::{RebuildOutcome, Workspace};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{info, Level};

/// jcontext - reference project files by name and embed them in prompts
#[derive(Parser, Debug)]
#[command(name = "jcontext")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(short, long, value_name = "DIR", global = true)]
    root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index the project and list files matching a query
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Expand file references into fenced blocks
    Render {
        /// Input file (stdin when absent)
        file: Option<PathBuf>,

        /// JSON edit map to apply instead of file content
        #[arg(long, value_name = "FILE")]
        edits: Option<PathBuf>,

        /// Print a truncated preview instead of the full text
        #[arg(long)]
        preview: bool,
    },

    /// Collapse fenced blocks back to file references
    Unrender {
        /// Input file (stdin when absent)
        file: Option<PathBuf>,

        /// Write captured edits to this file as JSON
        #[arg(long, value_name = "FILE")]
        edits_out: Option<PathBuf>,
    },

    /// Show statistics about the file references in a text
    Stats {
        /// Input file (stdin when absent)
        file: Option<PathBuf>,
    },

    /// Suggest files for the @query at a cursor position
    Suggest {
        text: String,

        /// Byte offset of the cursor in TEXT (defaults to the end)
        #[arg(long)]
        cursor: Option<usize>,
    },

    /// Generate a template configuration file and exit
    Init {
        #[arg(value_name = "FILE", default_value = "jcontext.toml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    telemetry::init_logging(log_level);

    if let Command::Init { path } = &args.command {
        return write_template(path);
    }

    let config = load_config(&args)?;
    let root = match &args.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let workspace = Workspace::open(root, config.indexer.to_options());

    match &args.command {
        Command::Search { query, limit } => {
            build_index(&workspace)?;
            let limit = limit.unwrap_or(config.search.default_limit);
            for path in workspace.search(query, limit) {
                println!("{path}");
            }
        }
        Command::Render {
            file,
            edits,
            preview,
        } => {
            let text = read_input(file.as_deref())?;
            let edits = match edits {
                Some(path) => load_edits(path)?,
                None => EditMap::new(),
            };
            let output = if *preview {
                let max_len = match config.render.preview_length {
                    0 => DEFAULT_PREVIEW_LENGTH,
                    n => n,
                };
                workspace.processor().preview(&text, &edits, max_len)
            } else {
                workspace.render(&text, &edits)
            };
            print!("{output}");
        }
        Command::Unrender { file, edits_out } => {
            let rendered = read_input(file.as_deref())?;
            let result = workspace.unrender(&rendered);
            print!("{}", result.text);

            if let Some(path) = edits_out {
                let json = serde_json::to_string_pretty(&result.edits)
                    .context("Failed to serialize edits")?;
                std::fs::write(path, json)
                    .with_context(|| format!("Failed to write edits: {}", path.display()))?;
                info!(edits = result.edits.len(), path = %path.display(), "Edits written");
            } else if !result.edits.is_empty() {
                eprintln!(
                    "{} edited block(s) discarded; use --edits-out to keep them",
                    result.edits.len()
                );
            }
        }
        Command::Stats { file } => {
            let text = read_input(file.as_deref())?;
            let processor = workspace.processor();
            let stats = processor.text_statistics(&text);
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?
            );
            for (path, exists) in processor.validate_references(&text) {
                println!("{} {path}", if exists { "✓" } else { "✗" });
            }
        }
        Command::Suggest { text, cursor } => {
            build_index(&workspace)?;
            let cursor = cursor.unwrap_or(text.len());
            match workspace.suggest(text, cursor, config.search.suggestion_limit) {
                Some(suggestion) => {
                    for path in suggestion.candidates {
                        println!("{path}");
                    }
                }
                None => eprintln!("No @ query at cursor position {cursor}"),
            }
        }
        // Handled before any config is loaded
        Command::Init { .. } => {}
    }

    Ok(())
}

fn write_template(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "Config file already exists: {}\nRemove it first or choose a different path.",
            path.display()
        );
    }

    Config::write_template(path)?;
    println!("✓ Generated config file: {}", path.display());
    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found: {}\nUse `jcontext init {}` to generate a template.",
                config_path.display(),
                config_path.display()
            );
        }
        info!(path = %config_path.display(), "Loading config from file");
        return Config::from_file(config_path);
    }

    match Config::from_default_locations()? {
        Some((config, path)) => {
            info!(path = %path.display(), "Loading config from default location");
            Ok(config)
        }
        None => {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input: {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn load_edits(path: &Path) -> Result<EditMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read edits: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse edits: {}", path.display()))
}

/// Rebuild the index on a worker thread, drawing its events on the terminal.
fn build_index(workspace: &Workspace) -> Result<()> {
    let (tx, rx) = mpsc::channel::<IndexEvent>();
    let sink: Arc<dyn ProgressSink> = Arc::new(tx);
    let handle = workspace.spawn_rebuild(sink);

    let progress = TerminalProgress::new();
    for event in rx.iter() {
        progress.update(&event);
        if event.is_terminal() {
            break;
        }
    }
    progress.finish();

    match handle.join() {
        RebuildOutcome::Completed(summary) => {
            info!(
                files = %format_number(summary.files_indexed),
                skipped_dirs = summary.skipped_dirs,
                "Index ready"
            );
            Ok(())
        }
        RebuildOutcome::Cancelled => anyhow::bail!("Index rebuild was cancelled"),
        RebuildOutcome::Failed(e) => Err(e).context("Index rebuild failed"),
    }
}

/// Progress bar for rebuild events.
struct TerminalProgress {
    progress_bar: ProgressBar,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl TerminalProgress {
    fn new() -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(spinner_style.clone());
        progress_bar.enable_steady_tick(Duration::from_millis(80));

        Self {
            progress_bar,
            spinner_style,
            bar_style,
        }
    }

    fn update(&self, event: &IndexEvent) {
        let pb = &self.progress_bar;
        match event {
            IndexEvent::Progress(stats) if stats.phase == ScanPhase::Counting => {
                pb.set_message("Counting files...");
            }
            IndexEvent::Progress(stats) if stats.total_files > 0 => {
                pb.set_style(self.bar_style.clone());
                pb.set_length(stats.total_files as u64);
                pb.set_position(stats.files_processed as u64);
                pb.set_message(stats.current_dir.clone());
            }
            IndexEvent::Progress(stats) => {
                pb.set_style(self.spinner_style.clone());
                pb.set_message(format!(
                    "Indexed {} files ({})",
                    format_number(stats.files_processed),
                    stats.current_dir
                ));
            }
            IndexEvent::Completed { files_indexed } => {
                pb.set_message(format!("Indexed {} files", format_number(*files_indexed)));
            }
            IndexEvent::Cancelled => pb.set_message("Cancelled"),
            IndexEvent::Error { message } => pb.set_message(message.clone()),
        }
    }

    fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}
