//! Per-file action log.
//!
//! One CSV file per run, named after the run's start time. Each kept or
//! deleted file produces one row.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::error::{CleanerError, Result};
use super::rules::Decision;

pub const LOG_HEADER: &str = "timestamp,folder,filename,extension,action,size,path";

/// A single logged decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub action: Decision,
    pub folder: String,
    pub path: PathBuf,
    pub extension: String,
    pub size: Option<u64>,
}

impl LogRecord {
    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Render as one CSV line (without the trailing newline).
    pub fn to_csv_line(&self) -> String {
        let size = self.size.map(|s| s.to_string()).unwrap_or_else(|| "-1".to_string());
        [
            self.timestamp.to_rfc3339(),
            escape_field(&self.folder),
            escape_field(&self.file_name()),
            escape_field(&self.extension),
            self.action.as_str().to_string(),
            size,
            escape_field(&self.path.to_string_lossy()),
        ]
        .join(",")
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Receiver of per-file decisions.
pub trait ActionSink: Send {
    fn record(&mut self, record: &LogRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory sink, mostly useful for tests and summaries.
impl ActionSink for Vec<LogRecord> {
    fn record(&mut self, record: &LogRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Append-only CSV writer.
pub struct ActionLog<W: Write + Send = BufWriter<File>> {
    writer: W,
    path: PathBuf,
    rows: usize,
}

impl ActionLog {
    /// Create `recup_cleaner_log_<YYYYmmdd_HHMMSS>.csv` inside `dir`.
    pub fn create_in(dir: &Path, started: DateTime<Local>) -> Result<Self> {
        let path = dir.join(log_file_name(started));
        let file = File::create(&path).map_err(|e| CleanerError::LogSink {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::from_writer(BufWriter::new(file), path)
    }
}

impl<W: Write + Send> ActionLog<W> {
    /// Wrap an arbitrary writer; the header row is written immediately.
    pub fn from_writer(mut writer: W, path: PathBuf) -> Result<Self> {
        writeln!(writer, "{}", LOG_HEADER).map_err(|e| CleanerError::LogSink {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            writer,
            path,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ActionSink for ActionLog<W> {
    fn record(&mut self, record: &LogRecord) -> Result<()> {
        writeln!(self.writer, "{}", record.to_csv_line()).map_err(|e| CleanerError::LogSink {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| CleanerError::LogSink {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("recup_cleaner_log_{}.csv", started.format("%Y%m%d_%H%M%S"))
}
