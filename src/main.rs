//! Development harness for the client core: drives the same context object
//! the desktop shell uses, against the real local backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use sage_client::reconciler::PendingRoots;
use sage_client::{AppContext, BackendClient, JsonFileStorage, ReconcileError, SearchGate};

#[derive(Parser)]
#[command(name = "sage-client", about = "SAGE semantic search client core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the roots registered on the backend
    Roots,
    /// Reconcile the backend's monitored roots to exactly the given folders
    Sync { paths: Vec<String> },
    /// Run a search and record it in the indexing log
    Search { query: String },
    /// Show the persisted indexing log
    Log {
        /// Erase the log instead of showing it
        #[arg(long)]
        clear: bool,
    },
    /// Follow indexing progress until interrupted
    Watch,
}

fn state_path() -> PathBuf {
    directories::ProjectDirs::from("com", "sage", "sage-client")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("client-state.json")
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let storage = Arc::new(JsonFileStorage::open(state_path()));
    let backend = Arc::new(BackendClient::new());
    let mut app = AppContext::new(backend, storage);

    match cli.command {
        Command::Roots => {
            let roots = app.refresh_roots().await?;
            if roots.is_empty() {
                println!("no roots registered");
            }
            for root in roots {
                println!("{}", root);
            }
        }
        Command::Sync { paths } => {
            let mut pending = PendingRoots::new();
            for path in paths {
                pending.push(path)?;
            }
            match app.apply_roots(pending.paths()).await {
                Ok(()) => {}
                Err(ReconcileError::Partial {
                    attempted,
                    failures,
                    ..
                }) => {
                    eprintln!("{} of {} changes failed:", failures.len(), attempted);
                    for failure in &failures {
                        eprintln!("  {}", failure);
                    }
                }
                Err(e) => return Err(e.into()),
            }
            println!("backend now monitors:");
            for root in app.roots() {
                println!("  {}", root);
            }
        }
        Command::Search { query } => {
            app.refresh_roots().await?;
            if app.search_gate() == SearchGate::NoRoots {
                println!("no folders configured; add roots with `sage-client sync` first");
                return Ok(());
            }
            let count = app.run_search(&query).await?;
            info!("search returned {} results", count);
            for result in app.search.results() {
                println!("{:>3}%  {}", result.score_percent(), result.path);
                if !result.snippet.is_empty() {
                    println!("      {}", result.snippet);
                }
            }
        }
        Command::Log { clear } => {
            if clear {
                app.search.clear_log();
                println!("indexing log cleared");
            } else if app.search.log_query().is_empty() {
                println!("indexing log is empty");
            } else {
                println!("last query: {}", app.search.log_query());
                for result in app.search.log_results() {
                    println!("{:>3}%  {}", result.score_percent(), result.path);
                }
            }
        }
        Command::Watch => {
            let (poller, mut progress) = app.spawn_poller();
            loop {
                tokio::select! {
                    changed = progress.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        match progress.borrow_and_update().as_ref() {
                            Some(p) if p.indexing => println!(
                                "indexing {}% ({}/{}) {}",
                                p.percentage,
                                p.processed_files,
                                p.total_files,
                                p.current_file.as_deref().unwrap_or("")
                            ),
                            Some(p) => println!("phase: {:?}", p.phase),
                            None => println!("idle"),
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        poller.stop();
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
