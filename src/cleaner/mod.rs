//! Cleaner module - retention policy for incremental file-recovery output
//!
//! Completed numbered folders written by a recovery tool are swept against
//! keep/exclude rules. Survivors can be regrouped into type-keyed batches at the end.

pub mod config;
pub mod error;
pub mod log;
pub mod reorganize;
pub mod rules;
pub mod scheduler;
pub mod stats;
pub mod sweep;
pub mod tracker;

pub use config::Config;
pub use error::CleanerError;
pub use log::{ActionLog, ActionSink, LogRecord};
pub use reorganize::{BatchFolder, ReorgPlan, ReorgReport, Reorganizer};
pub use rules::{Decision, RuleSet};
pub use scheduler::{CycleOutcome, Phase, ReorgSummary, RunSummary, Scheduler, StatusSnapshot};
pub use stats::Stats;
pub use sweep::{Cleaner, FileEntry, SweepReport};
pub use tracker::{Folder, FolderState, FolderTracker, ScanOutcome};
