//! Post-recovery reorganization into type-keyed batch folders.
//!
//! Kept files move to `<root>/<type>/<batch>/<name>`, where no batch folder
//! ever holds more than the configured capacity. Afterwards every numbered
//! folder left empty is removed; folders that still hold files stay put.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::error::{CleanerError, Result};
use super::sweep::FileEntry;
use super::tracker::{list_numbered_folders, DEFAULT_PREFIX};
use crate::fs::mover::{is_already_exists, move_file, prune_empty_dirs};

/// A capacity-bounded destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFolder {
    pub type_key: String,
    pub batch_index: u64,
    pub capacity: usize,
    pub current_count: usize,
}

impl BatchFolder {
    fn new(type_key: &str, batch_index: u64, capacity: usize) -> Self {
        Self {
            type_key: type_key.to_string(),
            batch_index,
            capacity,
            current_count: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_count >= self.capacity
    }

    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(&self.type_key).join(self.batch_index.to_string())
    }
}

/// One planned relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub type_key: String,
    pub batch_index: u64,
}

/// Deterministic assignment of kept files to batch folders.
#[derive(Debug, Default)]
pub struct ReorgPlan {
    pub moves: Vec<PlannedMove>,
    pub batches: Vec<BatchFolder>,
    /// Files whose name could not be disambiguated; they stay where they are.
    pub collisions: Vec<(PathBuf, PathBuf)>,
}

/// Outcome of a reorganization run.
#[derive(Debug, Default)]
pub struct ReorgReport {
    pub moved: usize,
    pub batches: Vec<BatchFolder>,
    pub collisions: Vec<CleanerError>,
    pub failures: Vec<CleanerError>,
    pub removed_folders: Vec<PathBuf>,
    /// Numbered folders that still contain files after the moves.
    pub remaining_folders: Vec<PathBuf>,
    /// Set when an irrecoverable error stopped the run early.
    pub aborted: Option<CleanerError>,
}

pub struct Reorganizer {
    root: PathBuf,
    prefix: String,
    batch_capacity: usize,
}

impl Reorganizer {
    pub fn new(root: impl Into<PathBuf>, batch_capacity: usize) -> Result<Self> {
        if batch_capacity == 0 {
            return Err(CleanerError::InvalidBatchSize { size: batch_capacity });
        }
        Ok(Self {
            root: root.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            batch_capacity,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn batch_capacity(&self) -> usize {
        self.batch_capacity
    }

    /// Assign every kept file a destination without touching the disk
    /// (apart from looking up existing batch numbers).
    ///
    /// Within a type, files are ordered by source folder index then path.
    /// A name already planned for the batch or present on disk is retried as
    /// `<folderIndex>_<name>`; if that is taken too the file is recorded as a
    /// collision.
    pub fn plan(&self, kept: &[FileEntry]) -> ReorgPlan {
        let mut groups: BTreeMap<String, Vec<&FileEntry>> = BTreeMap::new();
        for file in kept {
            groups.entry(file.type_key()).or_default().push(file);
        }

        let mut plan = ReorgPlan::default();
        for (type_key, mut files) in groups {
            files.sort_by(|a, b| (a.folder_index, &a.path).cmp(&(b.folder_index, &b.path)));
            files.dedup_by(|a, b| a.path == b.path);

            let first_index = next_batch_index(&self.root.join(&type_key));
            let mut batch: Option<BatchFolder> = None;
            let mut names: HashSet<String> = HashSet::new();

            for file in files {
                let mut current = match batch.take() {
                    Some(b) if !b.is_full() => b,
                    Some(full) => {
                        let next = full.batch_index + 1;
                        plan.batches.push(full);
                        names.clear();
                        BatchFolder::new(&type_key, next, self.batch_capacity)
                    }
                    None => BatchFolder::new(&type_key, first_index, self.batch_capacity),
                };
                let dir = current.path(&self.root);

                let chosen = match choose_name(&dir, &names, file) {
                    Ok(name) => Some(name),
                    Err(taken) => {
                        plan.collisions.push((file.path.clone(), taken));
                        None
                    }
                };

                if let Some(chosen) = chosen {
                    plan.moves.push(PlannedMove {
                        source: file.path.clone(),
                        destination: dir.join(&chosen),
                        type_key: type_key.clone(),
                        batch_index: current.batch_index,
                    });
                    names.insert(chosen);
                    current.current_count += 1;
                }
                batch = Some(current);
            }

            if let Some(last) = batch.filter(|b| b.current_count > 0) {
                plan.batches.push(last);
            }
        }

        plan
    }

    /// Move every kept file into its batch folder, then remove the numbered
    /// folders left empty.
    pub fn run(&self, kept: &[FileEntry]) -> ReorgReport {
        self.execute(self.plan(kept))
    }

    /// Carry out a plan. A destination that appeared since planning is a
    /// collision and the file stays where it is.
    pub fn execute(&self, plan: ReorgPlan) -> ReorgReport {
        let mut report = ReorgReport {
            batches: plan.batches.clone(),
            ..ReorgReport::default()
        };

        for (source, destination) in plan.collisions {
            warn!(file = %source.display(), "name collision, leaving file in place");
            report
                .collisions
                .push(CleanerError::Collision { source, destination });
        }

        for planned in &plan.moves {
            match move_file(&planned.source, &planned.destination) {
                Ok(()) => report.moved += 1,
                Err(err) if is_already_exists(&err) => {
                    warn!(file = %planned.source.display(), "destination taken, leaving file in place");
                    report.collisions.push(CleanerError::Collision {
                        source: planned.source.clone(),
                        destination: planned.destination.clone(),
                    });
                }
                Err(err) => {
                    let io_err = to_io_error(&err);
                    let storage_full = io_err.kind() == io::ErrorKind::StorageFull;
                    let mapped = CleanerError::from_io_error(
                        io_err,
                        "moving file",
                        Some(planned.source.clone()),
                    );
                    if storage_full {
                        warn!("disk full, stopping reorganization");
                        report.aborted = Some(mapped);
                        return report;
                    }
                    warn!(file = %planned.source.display(), "move failed: {}", err);
                    report.failures.push(mapped);
                }
            }
        }

        self.remove_empty_folders(&mut report);
        info!(
            moved = report.moved,
            batches = report.batches.len(),
            removed = report.removed_folders.len(),
            "reorganization finished"
        );
        report
    }

    fn remove_empty_folders(&self, report: &mut ReorgReport) {
        let folders = match list_numbered_folders(&self.root, &self.prefix) {
            Ok(folders) => folders,
            Err(err) => {
                report.failures.push(err);
                return;
            }
        };

        for (_, path) in folders {
            match prune_empty_dirs(&path) {
                Ok(true) => report.removed_folders.push(path),
                Ok(false) => {
                    warn!(folder = %path.display(), "folder still holds files, left in place");
                    report.remaining_folders.push(path);
                }
                Err(err) => {
                    report.failures.push(CleanerError::from_io_error(
                        to_io_error(&err),
                        "removing directory",
                        Some(path.clone()),
                    ));
                    report.remaining_folders.push(path);
                }
            }
        }
    }
}

/// Pick a free name in `dir`: the file's own name, else `<folderIndex>_<name>`.
///
/// A name is taken when it is already planned for this batch or exists on
/// disk. Returns the last path tried when both are taken.
fn choose_name(
    dir: &Path,
    planned: &HashSet<String>,
    file: &FileEntry,
) -> std::result::Result<String, PathBuf> {
    let taken = |name: &str| planned.contains(name) || dir.join(name).symlink_metadata().is_ok();

    let name = file.file_name();
    if !taken(&name) {
        return Ok(name);
    }
    let alt = format!("{}_{}", file.folder_index, name);
    if taken(&alt) {
        Err(dir.join(alt))
    } else {
        Ok(alt)
    }
}

/// First batch number after any numeric batch folders already on disk.
fn next_batch_index(type_dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(type_dir) else {
        return 1;
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_string_lossy().parse::<u64>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(1)
}

fn to_io_error(err: &anyhow::Error) -> io::Error {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<io::Error>())
        .map(|e| e.kind())
        .unwrap_or(io::ErrorKind::Other);
    io::Error::new(kind, format!("{:#}", err))
}
