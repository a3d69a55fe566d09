//! Lifecycle tracking for numbered recovery folders.
//!
//! The recovery process writes into `recup_dir.1`, `recup_dir.2`, ... one at a
//! time. The highest-numbered folder may still be receiving files, so it is
//! never handed out for cleaning until a higher one appears or the final pass
//! is requested.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{CleanerError, Result};

/// Folder prefix written by PhotoRec.
pub const DEFAULT_PREFIX: &str = "recup_dir.";

/// Lifecycle state of a numbered folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderState {
    /// Observed but not yet classified.
    Idle,
    /// Highest index seen; the recovery process may still be writing here.
    Active,
    /// Superseded by a higher index (or final pass) and safe to clean.
    Eligible,
    /// Fully processed by the cleaner.
    Cleaned,
}

/// A numbered output folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub index: u64,
    pub path: PathBuf,
    pub state: FolderState,
}

impl Folder {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.index.to_string())
    }
}

/// Parse the numeric suffix of a folder name, e.g. `recup_dir.12` -> 12.
///
/// Only a positive run of ASCII digits is accepted, so `recup_dir.0`,
/// `recup_dir.+3` and `recup_dir.3a` are all ignored.
pub fn parse_folder_index(name: &str, prefix: &str) -> Option<u64> {
    let suffix = name.strip_prefix(prefix)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<u64>().ok().filter(|&n| n > 0)
}

/// List numbered folders directly under `root`, ordered numerically.
pub fn list_numbered_folders(root: &Path, prefix: &str) -> Result<Vec<(u64, PathBuf)>> {
    let entries = fs::read_dir(root).map_err(|e| {
        CleanerError::from_io_error(e, "scanning directory", Some(root.to_path_buf()))
    })?;

    let mut folders = Vec::new();
    for entry in entries {
        // Entries can vanish between listing and inspection.
        let Ok(entry) = entry else { continue };
        let Ok(file_type) = entry.file_type() else { continue };
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(index) = parse_folder_index(&name.to_string_lossy(), prefix) {
            folders.push((index, entry.path()));
        }
    }

    folders.sort_by_key(|(index, _)| *index);
    Ok(folders)
}

/// Result of a single scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Index of the folder currently being written, if any.
    pub active: Option<u64>,
    /// Folders ready for cleaning, in ascending index order.
    pub eligible: Vec<Folder>,
}

impl ScanOutcome {
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.eligible.is_empty()
    }
}

/// Tracks the lifecycle of every numbered folder under a root directory.
///
/// The directory listing is the only input; nothing survives a restart, so a
/// fresh tracker simply re-derives state and re-offers uncleaned folders.
#[derive(Debug)]
pub struct FolderTracker {
    root: PathBuf,
    prefix: String,
    folders: BTreeMap<u64, Folder>,
}

impl FolderTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_prefix(root, DEFAULT_PREFIX)
    }

    pub fn with_prefix(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            folders: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-list the root and advance folder states.
    ///
    /// The folder with the highest index is `Active`; every other folder not
    /// yet cleaned becomes `Eligible`. Folders that vanished are dropped.
    pub fn scan(&mut self) -> Result<ScanOutcome> {
        let listed = list_numbered_folders(&self.root, &self.prefix)?;
        self.reconcile(listed);

        let max_index = self.folders.keys().next_back().copied();
        for folder in self.folders.values_mut() {
            let is_max = Some(folder.index) == max_index;
            folder.state = match folder.state {
                FolderState::Cleaned => FolderState::Cleaned,
                FolderState::Eligible => FolderState::Eligible,
                FolderState::Idle | FolderState::Active if is_max => FolderState::Active,
                FolderState::Idle | FolderState::Active => FolderState::Eligible,
            };
        }

        Ok(self.outcome())
    }

    /// Final pass: re-list and treat every uncleaned folder, including the
    /// active one, as eligible.
    pub fn finalize(&mut self) -> Result<ScanOutcome> {
        let listed = list_numbered_folders(&self.root, &self.prefix)?;
        self.reconcile(listed);

        for folder in self.folders.values_mut() {
            if folder.state != FolderState::Cleaned {
                folder.state = FolderState::Eligible;
            }
        }

        Ok(self.outcome())
    }

    /// Record that the cleaner fully processed a folder.
    ///
    /// Only eligible folders can be marked; an active folder is never cleaned.
    pub fn mark_cleaned(&mut self, index: u64) -> bool {
        match self.folders.get_mut(&index) {
            Some(folder) if folder.state == FolderState::Eligible => {
                folder.state = FolderState::Cleaned;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, index: u64) -> Option<&Folder> {
        self.folders.get(&index)
    }

    pub fn state_of(&self, index: u64) -> Option<FolderState> {
        self.folders.get(&index).map(|f| f.state)
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn cleaned_count(&self) -> usize {
        self.folders
            .values()
            .filter(|f| f.state == FolderState::Cleaned)
            .count()
    }

    pub fn active(&self) -> Option<&Folder> {
        self.folders
            .values()
            .find(|f| f.state == FolderState::Active)
    }

    fn reconcile(&mut self, listed: Vec<(u64, PathBuf)>) {
        let before = self.folders.len();
        let present: std::collections::BTreeSet<u64> = listed.iter().map(|(i, _)| *i).collect();
        self.folders.retain(|index, _| present.contains(index));
        if self.folders.len() < before {
            debug!(dropped = before - self.folders.len(), "numbered folders disappeared");
        }

        for (index, path) in listed {
            self.folders.entry(index).or_insert_with(|| {
                debug!(index, path = %path.display(), "new numbered folder");
                Folder {
                    index,
                    path,
                    state: FolderState::Idle,
                }
            });
        }
    }

    fn outcome(&self) -> ScanOutcome {
        ScanOutcome {
            active: self.active().map(|f| f.index),
            eligible: self
                .folders
                .values()
                .filter(|f| f.state == FolderState::Eligible)
                .cloned()
                .collect(),
        }
    }
}
