// Folder sweeping
// Applies the rule set to every file of an eligible folder and deletes rejects

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use jwalk::{Parallelism, WalkDir};
use tracing::{debug, warn};

use super::error::{CleanerError, Result};
use super::log::{ActionSink, LogRecord};
use super::rules::{self, Decision, RuleSet};
use super::tracker::Folder;

/// One classified file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Index of the numbered folder the file was found in.
    pub folder_index: u64,
    /// Lowercase extension, possibly compound (`xml.gz`); empty if none.
    pub extension: String,
    pub decision: Decision,
    pub size: Option<u64>,
}

impl FileEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory name this file is grouped under when reorganizing.
    pub fn type_key(&self) -> String {
        rules::type_key(&self.file_name())
    }
}

/// Outcome of sweeping one folder.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub folder_index: u64,
    pub kept: Vec<FileEntry>,
    pub deleted: Vec<FileEntry>,
    pub bytes_freed: u64,
    /// Files that could not be inspected or removed; retried next time.
    pub failures: Vec<CleanerError>,
}

impl SweepReport {
    pub fn files_seen(&self) -> usize {
        self.kept.len() + self.deleted.len() + self.failures.len()
    }
}

/// Type alias for activity callback function
pub type ActivityCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Applies a [`RuleSet`] to numbered folders.
pub struct Cleaner {
    rules: RuleSet,
    sink: Option<Box<dyn ActionSink>>,
    activity_callback: Option<Arc<ActivityCallback>>,
    /// Kept files already written to the sink; re-sweeps don't log them again.
    logged_kept: HashSet<PathBuf>,
}

impl Cleaner {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            sink: None,
            activity_callback: None,
            logged_kept: HashSet::new(),
        }
    }

    /// Emit one log record per classified file.
    pub fn with_sink(mut self, sink: Box<dyn ActionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Receive activity messages such as "Processing recup_dir.4 (12 files)".
    pub fn with_activity_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.activity_callback = Some(Arc::new(Box::new(callback)));
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Flush and release the log sink, if any.
    pub fn finish(&mut self) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    /// Sweep a folder: delete rejected files, report kept ones.
    ///
    /// Per-file errors are collected in the report instead of aborting. A
    /// folder that no longer exists yields an empty report, and sweeping an
    /// already-swept folder deletes nothing.
    pub fn process(&mut self, folder: &Folder) -> Result<SweepReport> {
        let mut report = SweepReport {
            folder_index: folder.index,
            ..SweepReport::default()
        };

        match fs::metadata(&folder.path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(report),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(folder = %folder.path.display(), "folder vanished before sweep");
                return Ok(report);
            }
            Err(e) => {
                return Err(CleanerError::from_io_error(
                    e,
                    "reading directory",
                    Some(folder.path.clone()),
                ))
            }
        }

        let folder_name = folder.name();
        let walker = WalkDir::new(&folder.path)
            .sort(true)
            .skip_hidden(false)
            .parallelism(Parallelism::Serial);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf);
                    let err = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("directory walk failed"));
                    report
                        .failures
                        .push(CleanerError::from_io_error(err, "reading directory", path));
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let seen = report.files_seen() + 1;
            self.notify(&format!("Processing {} ({} files)", folder_name, seen));

            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let decision = self.rules.classify(&name);
            let mut file = FileEntry {
                extension: rules::extension_of(&name).unwrap_or_default(),
                path,
                folder_index: folder.index,
                decision,
                size: None,
            };

            match decision {
                Decision::Keep => {
                    file.size = fs::symlink_metadata(&file.path).ok().map(|m| m.len());
                    if self.logged_kept.insert(file.path.clone()) {
                        self.log(&folder_name, &file);
                    }
                    report.kept.push(file);
                }
                Decision::Delete => match delete_file(&file.path) {
                    Ok(Some(size)) => {
                        file.size = Some(size);
                        report.bytes_freed += size;
                        self.log(&folder_name, &file);
                        report.deleted.push(file);
                    }
                    // Gone already; nothing to do.
                    Ok(None) => {}
                    Err(err) => {
                        warn!(path = %file.path.display(), "could not delete file: {}", err);
                        report.failures.push(err);
                    }
                },
            }
        }

        debug!(
            folder = %folder_name,
            kept = report.kept.len(),
            deleted = report.deleted.len(),
            failures = report.failures.len(),
            "folder swept"
        );
        Ok(report)
    }

    fn notify(&self, message: &str) {
        if let Some(callback) = &self.activity_callback {
            callback(message);
        }
    }

    fn log(&mut self, folder_name: &str, file: &FileEntry) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let record = LogRecord {
            timestamp: Local::now(),
            action: file.decision,
            folder: folder_name.to_string(),
            path: file.path.clone(),
            extension: file.extension.clone(),
            size: file.size,
        };
        if let Err(err) = sink.record(&record) {
            warn!("action log write failed: {}", err);
        }
    }
}

/// Remove one file, returning its size, or `None` if it was already gone.
fn delete_file(path: &Path) -> Result<Option<u64>> {
    let size = match fs::symlink_metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CleanerError::from_io_error(
                e,
                "inspecting file",
                Some(path.to_path_buf()),
            ))
        }
    };

    match fs::remove_file(path) {
        Ok(()) => Ok(Some(size)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CleanerError::from_io_error(
            e,
            "deleting file",
            Some(path.to_path_buf()),
        )),
    }
}
