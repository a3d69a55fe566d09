use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use recup_cleaner::cleaner::{Config, RunSummary, Scheduler};
use recup_cleaner::ui::{run_status_display, spawn_ctrl_c_listener, spawn_stdin_listener};

const BANNER_WIDTH: usize = 72;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Clean PhotoRec output while recovery is still running",
    long_about = None
)]
struct Args {
    /// Directory containing the recup_dir.N folders
    input: Option<PathBuf>,

    /// Extensions to keep (comma-separated); everything else is deleted
    #[arg(long, short, value_delimiter = ',')]
    keep: Vec<String>,

    /// Extensions to delete (comma-separated); overrides --keep
    #[arg(long, short = 'x', value_delimiter = ',')]
    exclude: Vec<String>,

    /// Move kept files into <type>/<batch>/ folders once recovery is done
    #[arg(long, short)]
    reorganize: bool,

    /// Write a CSV log of every kept and deleted file
    #[arg(long, short)]
    log: bool,

    /// Directory for the CSV log (defaults to the input directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Seconds between scans
    #[arg(long, short)]
    interval: Option<u64>,

    /// Maximum number of files per reorganized folder
    #[arg(long, short)]
    batch_size: Option<usize>,

    /// Folder name prefix written by the recovery tool
    #[arg(long)]
    prefix: Option<String>,

    /// Clean all existing folders once and exit
    #[arg(long)]
    once: bool,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable the live status line
    #[arg(long)]
    no_status: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Only log errors
    #[arg(long, short)]
    quiet: bool,
}

impl Args {
    /// Command-line flags win over the config file.
    fn apply_to(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input = Some(input.clone());
        }
        if !self.keep.is_empty() {
            config.keep = self.keep.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude.clone();
        }
        config.reorganize |= self.reorganize;
        config.log |= self.log;
        config.once |= self.once;
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(prefix) = &self.prefix {
            config.folder_prefix = prefix.clone();
        }
    }
}

fn init_logging(args: &Args, status_on: bool) {
    let level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else if status_on {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_intro(root: &Path, once: bool) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("\n{}", rule);
    println!(
        "{:^width$}",
        format!("recup-cleaner v{}", env!("CARGO_PKG_VERSION")).bold(),
        width = BANNER_WIDTH
    );
    println!("{}", rule);
    let shown = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    println!("  Output directory: {}", shown.display().to_string().green());
    if once {
        println!("  Cleaning every existing folder once.\n");
    } else {
        println!(
            "  Press {} when PhotoRec is done to finish cleaning.\n",
            "'y' + Enter".blue()
        );
    }
}

fn print_report(summary: &RunSummary) {
    let stats = &summary.stats;
    println!("\n{}", "Processing Complete".bold());
    println!("  Folders processed : {}", stats.folders_cleaned);
    println!("  Files kept        : {}", stats.files_kept.to_string().green());
    println!("  Files deleted     : {}", stats.files_deleted.to_string().red());
    println!("  Space freed       : {}", stats.freed_human());
    if stats.failures > 0 {
        println!("  Failures          : {}", stats.failures.to_string().yellow());
    }
    if let Some(log) = &summary.log_file {
        println!("  Action log        : {}", log.display());
    }

    if let Some(reorg) = &summary.reorganization {
        println!("\n{}", "Reorganization".bold());
        println!("  Files moved       : {}", reorg.moved);
        println!("  Batch folders     : {}", reorg.batches);
        println!("  Folders removed   : {}", reorg.removed_folders);
        if reorg.collisions > 0 {
            println!(
                "  Name collisions   : {} (left in place)",
                reorg.collisions.to_string().yellow()
            );
        }
        for folder in &reorg.remaining_folders {
            println!("  {} {}", "Not empty, kept:".yellow(), folder.display());
        }
        if let Some(reason) = &reorg.aborted {
            println!("  {} {}", "Stopped early:".red(), reason);
        }
    }

    if !summary.unfinished_folders.is_empty() {
        println!(
            "\n{} {:?}",
            "Folders with files that could not be processed:".yellow(),
            summary.unfinished_folders
        );
    }
}

async fn run(args: Args) -> Result<()> {
    let status_on = !args.no_status && !args.json && std::io::stderr().is_terminal();
    init_logging(&args, status_on);

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);

    let scheduler = Scheduler::from_config(&config)?;
    let root = config.input.clone().unwrap_or_default();
    if !args.json {
        print_intro(&root, config.once);
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel = Arc::new(cancel_tx);
    if !config.once {
        spawn_stdin_listener(Arc::clone(&cancel));
        spawn_ctrl_c_listener(Arc::clone(&cancel));
    }

    let display = status_on.then(|| tokio::spawn(run_status_display(scheduler.subscribe())));

    let summary = scheduler.run(cancel_rx).await?;
    if let Some(handle) = display {
        let _ = handle.await;
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        print_report(&summary);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
