//! Scan/clean cycle driver.
//!
//! A single worker repeats FolderTracker -> Cleaner at a fixed interval until
//! cancellation is observed, then runs one final pass over every remaining
//! folder and, if configured, the reorganizer.
//!
//! Phases: `Watching -> Monitoring -> Cleaning -> Finalizing -> Reorganizing -> Done`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::config::Config;
use super::error::{CleanerError, Result};
use super::log::ActionLog;
use super::reorganize::{ReorgReport, Reorganizer};
use super::stats::Stats;
use super::sweep::{Cleaner, FileEntry};
use super::tracker::{Folder, FolderTracker};

/// Where the run currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No numbered folder exists yet.
    #[default]
    Watching,
    /// At least one folder exists, nothing is eligible.
    Monitoring,
    /// Eligible folders are being swept.
    Cleaning,
    /// Cancellation received; final pass in progress.
    Finalizing,
    Reorganizing,
    Done,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Watching => "Watching",
            Phase::Monitoring => "Monitoring",
            Phase::Cleaning => "Cleaning",
            Phase::Finalizing => "Finalizing",
            Phase::Reorganizing => "Reorganizing",
            Phase::Done => "Done",
        }
    }
}

/// Immutable view of the run, published after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub active_folder: Option<u64>,
    pub stats: Stats,
    pub activity: String,
}

/// What one monitoring cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub active: Option<u64>,
    /// Folders fully cleaned during this cycle.
    pub cleaned: Vec<u64>,
    /// Eligible folders left for the next cycle (errors during the sweep).
    pub deferred: Vec<u64>,
    /// The root could not be listed; nothing was attempted.
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReorgSummary {
    pub moved: usize,
    pub batches: usize,
    pub collisions: usize,
    pub failures: usize,
    pub removed_folders: usize,
    pub remaining_folders: Vec<PathBuf>,
    pub aborted: Option<String>,
}

impl From<&ReorgReport> for ReorgSummary {
    fn from(report: &ReorgReport) -> Self {
        Self {
            moved: report.moved,
            batches: report.batches.len(),
            collisions: report.collisions.len(),
            failures: report.failures.len(),
            removed_folders: report.removed_folders.len(),
            remaining_folders: report.remaining_folders.clone(),
            aborted: report.aborted.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Final result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub stats: Stats,
    pub reorganization: Option<ReorgSummary>,
    /// Folders that could not be fully cleaned even in the final pass.
    pub unfinished_folders: Vec<u64>,
    pub log_file: Option<PathBuf>,
}

pub struct Scheduler {
    tracker: FolderTracker,
    cleaner: Cleaner,
    reorganizer: Option<Reorganizer>,
    interval: Duration,
    once: bool,
    phase: Phase,
    stats: Stats,
    kept: BTreeMap<PathBuf, FileEntry>,
    log_file: Option<PathBuf>,
    status: Arc<watch::Sender<StatusSnapshot>>,
}

impl Scheduler {
    pub fn new(tracker: FolderTracker, cleaner: Cleaner) -> Self {
        let (tx, _) = watch::channel(StatusSnapshot::default());
        let status = Arc::new(tx);
        let sender = Arc::clone(&status);
        let cleaner = cleaner.with_activity_callback(move |message| {
            sender.send_modify(|s| s.activity = message.to_string());
        });

        Self {
            tracker,
            cleaner,
            reorganizer: None,
            interval: Duration::from_secs(super::config::DEFAULT_INTERVAL_SECS),
            once: false,
            phase: Phase::Watching,
            stats: Stats::default(),
            kept: BTreeMap::new(),
            log_file: None,
            status,
        }
    }

    /// Build the full pipeline from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let root = config.input.clone().ok_or(CleanerError::MissingInputPath)?;

        let tracker = FolderTracker::with_prefix(&root, config.folder_prefix.clone());
        let mut cleaner = Cleaner::new(config.rules()?);
        let mut log_file = None;
        if config.log {
            let dir = config.log_dir().unwrap_or(root.as_path());
            let log = ActionLog::create_in(dir, Local::now())?;
            info!(path = %log.path().display(), "writing action log");
            log_file = Some(log.path().to_path_buf());
            cleaner = cleaner.with_sink(Box::new(log));
        }

        let mut scheduler = Self::new(tracker, cleaner)
            .with_interval(config.interval())
            .with_once(config.once);
        scheduler.log_file = log_file;
        if config.reorganize {
            let reorganizer = Reorganizer::new(&root, config.batch_size)?
                .with_prefix(config.folder_prefix.clone());
            scheduler = scheduler.with_reorganizer(reorganizer);
        }
        Ok(scheduler)
    }

    pub fn with_reorganizer(mut self, reorganizer: Reorganizer) -> Self {
        self.reorganizer = Some(reorganizer);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Skip monitoring and go straight to the final pass.
    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Receive status snapshots; the receiver never blocks the scheduler.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn tracker(&self) -> &FolderTracker {
        &self.tracker
    }

    /// Kept files seen so far, ordered by path.
    pub fn kept_files(&self) -> Vec<FileEntry> {
        self.kept.values().cloned().collect()
    }

    /// One monitoring cycle: scan, then sweep every newly eligible folder.
    ///
    /// Listing failures are retried next cycle; only a vanished root is fatal.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let scan = match self.tracker.scan() {
            Ok(scan) => scan,
            Err(err) if err.is_transient() => {
                warn!("could not list {}: {}", self.tracker.root().display(), err);
                return Ok(CycleOutcome {
                    skipped: true,
                    ..CycleOutcome::default()
                });
            }
            Err(err) => return Err(err),
        };

        self.phase = if self.tracker.is_empty() {
            Phase::Watching
        } else if scan.eligible.is_empty() {
            Phase::Monitoring
        } else {
            Phase::Cleaning
        };
        self.publish(scan.active, self.idle_activity(scan.active));

        let (cleaned, deferred) = self.clean_folders(&scan.eligible);

        if self.phase == Phase::Cleaning {
            self.phase = Phase::Monitoring;
            self.publish(scan.active, self.idle_activity(scan.active));
        }

        Ok(CycleOutcome {
            active: scan.active,
            cleaned,
            deferred,
            skipped: false,
        })
    }

    /// Final pass over every remaining folder, then reorganization.
    pub fn finalize(&mut self) -> Result<RunSummary> {
        self.phase = Phase::Finalizing;
        self.publish(None, "Finalizing, please wait...".to_string());

        let scan = match self.tracker.finalize() {
            Ok(scan) => scan,
            Err(err) if err.is_transient() => {
                warn!("final scan failed: {}", err);
                Default::default()
            }
            Err(err) => return Err(err),
        };
        let (_, unfinished) = self.clean_folders(&scan.eligible);

        if let Err(err) = self.cleaner.finish() {
            warn!("{}", err);
        }

        let reorganization = match &self.reorganizer {
            Some(reorganizer) => {
                self.phase = Phase::Reorganizing;
                self.publish(None, "Reorganizing files...".to_string());
                let kept = self.kept_files();
                let report = reorganizer.run(&kept);
                Some(ReorgSummary::from(&report))
            }
            None => None,
        };

        self.phase = Phase::Done;
        self.publish(None, "Done".to_string());

        Ok(RunSummary {
            stats: self.stats,
            reorganization,
            unfinished_folders: unfinished,
            log_file: self.log_file.clone(),
        })
    }

    /// Drive cycles until `cancel` turns true, then finalize.
    ///
    /// Cancellation is only checked between cycles, so a folder being swept
    /// always finishes first.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) -> anyhow::Result<RunSummary> {
        if !self.once {
            loop {
                if *cancel.borrow() {
                    break;
                }

                let (back, outcome) = tokio::task::spawn_blocking(move || {
                    let outcome = self.run_cycle();
                    (self, outcome)
                })
                .await
                .context("cleaning cycle panicked")?;
                self = back;
                let outcome = outcome?;
                debug!(?outcome, "cycle finished");

                if wait_for_tick(self.interval, &mut cancel).await {
                    break;
                }
            }
            info!("cancellation received, running final pass");
        }

        let summary = tokio::task::spawn_blocking(move || self.finalize())
            .await
            .context("final pass panicked")??;
        Ok(summary)
    }

    /// Sweep folders in ascending order, returning (cleaned, deferred) indices.
    fn clean_folders(&mut self, folders: &[Folder]) -> (Vec<u64>, Vec<u64>) {
        let mut cleaned = Vec::new();
        let mut deferred = Vec::new();

        for folder in folders {
            match self.cleaner.process(folder) {
                Ok(report) => {
                    self.stats.absorb(&report);
                    let complete = report.failures.is_empty();
                    for file in report.kept {
                        self.kept.insert(file.path.clone(), file);
                    }
                    if complete && self.tracker.mark_cleaned(folder.index) {
                        cleaned.push(folder.index);
                    } else {
                        deferred.push(folder.index);
                    }
                }
                Err(err) => {
                    warn!(folder = %folder.path.display(), "sweep failed: {}", err);
                    self.stats.failures += 1;
                    deferred.push(folder.index);
                }
            }
            self.stats.files_kept = self.kept.len();
            self.stats.folders_cleaned = self.tracker.cleaned_count();
            self.publish(None, format!("Processed {}", folder.name()));
        }

        (cleaned, deferred)
    }

    fn idle_activity(&self, active: Option<u64>) -> String {
        match active.and_then(|index| self.tracker.get(index)) {
            Some(folder) => format!("Monitoring active folder {}", folder.name()),
            None => "Waiting for recovery folders...".to_string(),
        }
    }

    fn publish(&self, active: Option<u64>, activity: String) {
        let active = active.or_else(|| self.tracker.active().map(|f| f.index));
        self.status.send_replace(StatusSnapshot {
            phase: self.phase,
            active_folder: active,
            stats: self.stats,
            activity,
        });
    }
}

/// Sleep for one interval, waking early on cancellation.
///
/// Returns `true` once cancellation was requested.
async fn wait_for_tick(interval: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    let woke = tokio::select! {
        _ = tokio::time::sleep(interval) => None,
        res = async { cancel.wait_for(|c| *c).await.is_ok() } => Some(res),
    };
    match woke {
        Some(true) => true,
        Some(false) => {
            // Nobody can cancel any more; keep the cadence.
            tokio::time::sleep(interval).await;
            false
        }
        None => *cancel.borrow(),
    }
}
