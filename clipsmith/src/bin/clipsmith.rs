//! clipsmith - clipboard history from the command line
//!
//! `clipsmith watch` records every text copy until interrupted. The other
//! subcommands browse, edit and transform the recorded history.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clipsmith::config::Config;
use clipsmith::{
    logging, transform, CaptureController, CaptureEvent, CaptureOutcome, ClipboardEntry,
    ClipboardWatch, HistoryStore, HistoryStoreApi, SystemClipboard,
    TransformAction,
};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "clipsmith")]
#[command(author, version, about = "Clipboard history with content-aware transforms")]
struct Cli {
    /// Path to config file (default: <config dir>/clipsmith/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// History database (overrides config and CLIPSMITH_DB)
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record clipboard text until interrupted
    Watch {
        /// Poll interval in milliseconds (overrides config)
        #[arg(long, value_name = "MS")]
        poll_ms: Option<u64>,
    },

    /// Store text as if it had been copied (reads stdin when TEXT is omitted)
    Capture { text: Option<String> },

    /// List history, pinned entries first
    List {
        /// Show at most N entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show one entry in full
    Show { id: i64 },

    /// Substring search (ASCII case-insensitive)
    Search { query: String },

    /// Delete an entry
    Delete { id: i64 },

    /// Pin an entry so it stays on top
    Pin {
        id: i64,
        /// Unpin instead
        #[arg(long)]
        off: bool,
    },

    /// Print the category of some text and the actions it offers
    Classify { text: Option<String> },

    /// Pretty-print JSON
    Prettify(TransformArgs),

    /// Base64-encode text
    Encode(TransformArgs),

    /// Decode Base64 to text
    Decode(TransformArgs),

    /// Collapse whitespace runs into single spaces
    Clean(TransformArgs),

    /// Put a stored entry back on the system clipboard
    ///
    /// On Linux the copied text lives in this process, so the command keeps
    /// running until another application takes over the clipboard.
    Copy { id: i64 },

    /// Show where the history lives and how large it is
    Stats,
}

#[derive(clap::Args)]
struct TransformArgs {
    /// Input text (reads stdin when omitted)
    text: Option<String>,

    /// Transform a stored entry instead
    #[arg(long, conflicts_with = "text")]
    id: Option<i64>,

    /// Also place the result on the system clipboard (on Linux, waits until
    /// another application takes over the clipboard)
    #[arg(long)]
    copy: bool,
}

#[derive(Serialize)]
struct Classification<'a> {
    category: clipsmith::Category,
    actions: &'a [TransformAction],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }

    let level = logging::level_from_flags(cli.quiet, cli.verbose)
        .map(str::to_string)
        .unwrap_or_else(|| config.logging.level.clone());
    logging::init(&level);

    match cli.command {
        Command::Watch { poll_ms } => {
            if let Some(ms) = poll_ms.filter(|ms| *ms > 0) {
                config.poll_interval_ms = ms;
            }
            watch(&config, cli.json).await
        }
        Command::Capture { text } => {
            let store = open_store(&config)?;
            let controller = CaptureController::new(store)
                .with_duplicate_suppression(config.suppress_consecutive_duplicates);
            let outcome = controller
                .capture(&input_text(text)?)
                .context("Failed to save entry")?;
            match outcome {
                CaptureOutcome::Captured { id, category } => {
                    if cli.json {
                        print_json(&serde_json::json!({ "id": id, "category": category }))?;
                    } else {
                        println!("Saved #{id} ({category})");
                    }
                }
                CaptureOutcome::Discarded => eprintln!("Nothing to save: input is empty"),
                CaptureOutcome::Duplicate => eprintln!("Skipped: same as the previous capture"),
            }
            Ok(())
        }
        Command::List { limit } => {
            let store = open_store(&config)?;
            let mut entries = store.list_all().context("Failed to read history")?;
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            print_entries(&entries, &config, cli.json)
        }
        Command::Show { id } => {
            let store = open_store(&config)?;
            let entry = require_entry(&*store, id)?;
            if cli.json {
                print_json(&entry)?;
            } else {
                println!("{}", entry.content);
            }
            Ok(())
        }
        Command::Search { query } => {
            let store = open_store(&config)?;
            // An empty query is the unfiltered list
            let found = if query.is_empty() {
                store.list_all()
            } else {
                store.search(&query)
            };
            let entries = found.context("Failed to search history")?;
            print_entries(&entries, &config, cli.json)
        }
        Command::Delete { id } => {
            let store = open_store(&config)?;
            if store.delete(id).context("Failed to delete entry")? {
                println!("Deleted #{id}");
            } else {
                println!("No entry #{id}");
            }
            Ok(())
        }
        Command::Pin { id, off } => {
            let store = open_store(&config)?;
            if !store.toggle_pin(id, !off).context("Failed to update entry")? {
                bail!("No entry #{id}");
            }
            println!("{} #{id}", if off { "Unpinned" } else { "Pinned" });
            Ok(())
        }
        Command::Classify { text } => {
            let category = clipsmith::detect_category(&input_text(text)?);
            let actions = category.available_actions();
            if cli.json {
                print_json(&Classification {
                    category,
                    actions: &actions,
                })?;
            } else {
                println!("{category}");
            }
            Ok(())
        }
        Command::Prettify(args) => run_transform(TransformAction::Prettify, args, &config),
        Command::Encode(args) => run_transform(TransformAction::EncodeBase64, args, &config),
        Command::Decode(args) => run_transform(TransformAction::DecodeBase64, args, &config),
        Command::Clean(args) => run_transform(TransformAction::Clean, args, &config),
        Command::Copy { id } => {
            let store = open_store(&config)?;
            let entry = require_entry(&*store, id)?;
            println!("Copied #{id} to the clipboard");
            write_clipboard(&entry.content)
        }
        Command::Stats => {
            let store = open_store(&config)?;
            let entries = store.count().context("Failed to read history")?;
            let bytes = store.database_size().context("Failed to read history")?;
            let path = store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string());
            if cli.json {
                print_json(&serde_json::json!({
                    "database": path,
                    "entries": entries,
                    "size_bytes": bytes,
                }))?;
            } else {
                println!("Database: {path}");
                println!("Entries:  {entries}");
                println!("Size:     {bytes} bytes");
            }
            Ok(())
        }
    }
}

/// Watch the clipboard and record changes until Ctrl-C
async fn watch(config: &Config, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let clipboard = SystemClipboard::new().context("Failed to open the system clipboard")?;

    let mut watcher = ClipboardWatch::new(clipboard);
    let changes = watcher.subscribe();

    let controller = Arc::new(
        CaptureController::new(store.clone())
            .with_duplicate_suppression(config.suppress_consecutive_duplicates),
    );
    let mut events = controller.subscribe();

    let cancel = CancellationToken::new();

    let capture_task = {
        let controller = Arc::clone(&controller);
        let cancel = cancel.clone();
        tokio::spawn(async move { controller.run(changes, cancel).await })
    };

    let preview_chars = config.preview_chars;
    let report_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CaptureEvent::Captured { id, category } => {
                    let preview = store
                        .get(id)
                        .ok()
                        .flatten()
                        .map(|entry| entry.preview(preview_chars))
                        .unwrap_or_default();
                    if json {
                        println!(
                            "{}",
                            serde_json::json!({ "id": id, "category": category, "preview": preview })
                        );
                    } else {
                        println!("#{id} [{category}] {preview}");
                    }
                }
                CaptureEvent::Failed { error } => eprintln!("Capture failed: {error}"),
            }
        }
    });

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
            }
            cancel.cancel();
        });
    }

    info!(database = %config.database_path.display(), "Recording clipboard history");
    watcher.run(config.poll_interval(), cancel.clone()).await;

    capture_task.await.context("Capture task panicked")?;
    // Last subscriber handle lives in the controller
    drop(controller);
    report_task.await.context("Report task panicked")?;
    Ok(())
}

fn run_transform(action: TransformAction, args: TransformArgs, config: &Config) -> Result<()> {
    let input = match args.id {
        Some(id) => {
            let store = open_store(config)?;
            require_entry(&*store, id)?.content
        }
        None => input_text(args.text)?,
    };

    let output = transform::apply(action, &input)?;
    println!("{output}");
    if args.copy {
        write_clipboard(&output)?;
    }
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<HistoryStore>> {
    let store = HistoryStore::open(&config.database_path);
    store.init().with_context(|| {
        format!(
            "Failed to open history at {}",
            config.database_path.display()
        )
    })?;
    Ok(Arc::new(store))
}

fn require_entry(store: &dyn HistoryStoreApi, id: i64) -> Result<ClipboardEntry> {
    match store.get(id).context("Failed to read history")? {
        Some(entry) => Ok(entry),
        None => bail!("No entry #{id}"),
    }
}

/// Use the argument, or read all of stdin without its final newline
fn input_text(arg: Option<String>) -> Result<String> {
    if let Some(text) = arg {
        return Ok(text);
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    if buffer.ends_with('\n') {
        buffer.pop();
        if buffer.ends_with('\r') {
            buffer.pop();
        }
    }
    Ok(buffer)
}

fn write_clipboard(text: &str) -> Result<()> {
    let mut clipboard = SystemClipboard::new().context("Failed to open the system clipboard")?;
    clipboard
        .write_text_and_wait(text)
        .context("Failed to write to the clipboard")?;
    Ok(())
}

fn print_entries(entries: &[ClipboardEntry], config: &Config, json: bool) -> Result<()> {
    if json {
        return print_json(entries);
    }
    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{:>6} {} {} {:<6} {}",
            entry.id,
            if entry.pinned { "*" } else { " " },
            entry.captured_at.format("%Y-%m-%d %H:%M:%S"),
            entry.category(),
            entry.preview(config.preview_chars)
        );
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
