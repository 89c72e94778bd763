//! reqctx — request context store driver
//!
//! Exercises a shared `RequestContextStore` the way a request pipeline
//! would: each request stashes auth results, timers and parsed payloads,
//! later stages read them back, and the request's context is cleared when
//! handling ends.
//!
//! Usage:
//!   reqctx demo                                  # Run the two-request walkthrough and dump the store
//!   reqctx stress --threads 8 --requests 10000   # Parallel workload, verifies nothing leaks
//!   reqctx --verbose stress --dump               # Debug logging, dump live contexts mid-run

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqctx::{StressConfig, run_demo, run_stress};
use reqctx_store::{RequestContextStore, StoreConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reqctx", about = "Request-scoped context store driver")]
struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Expected number of in-flight requests (capacity hint)
    #[arg(long, global = true, default_value = "64")]
    capacity: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through a request's context lifecycle and dump the store
    Demo,

    /// Hammer one store from many threads and verify it ends empty
    Stress {
        /// Worker threads
        #[arg(long, default_value = "8")]
        threads: usize,

        /// Requests per thread
        #[arg(long, default_value = "1000")]
        requests: usize,

        /// Keys written per request
        #[arg(long, default_value = "4")]
        keys: usize,

        /// Dump live contexts to stdout once, halfway through the run
        #[arg(long)]
        dump: bool,
    },
}

fn init_tracing(verbose: bool, log_file: Option<&PathBuf>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .unwrap_or_else(|e| panic!("Failed to open log file {}: {e}", log_path.display()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();

        eprintln!("Logging to {}", log_path.display());
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_file.as_ref());

    let config = StoreConfig::default().with_initial_capacity(cli.capacity);
    let store = Arc::new(RequestContextStore::with_config(config));

    let result = match cli.command {
        Command::Demo => run_demo(store).await,
        Command::Stress { threads, requests, keys, dump } => {
            let stress = StressConfig { threads, requests, keys, dump };
            tokio::task::spawn_blocking(move || run_stress(store, stress))
                .await
                .unwrap_or_else(|e| Err(format!("Stress run aborted: {e}").into()))
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}
