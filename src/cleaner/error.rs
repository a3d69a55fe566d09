// Centralized error handling for the cleaner
// Every error carries the path and operation it relates to plus a suggestion line

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for the cleaner.
/// Provides context-rich error messages with file paths and operations
#[derive(Debug)]
pub enum CleanerError {
    /// Configuration errors, fatal before any scanning begins
    MissingInputPath,
    InputNotADirectory { path: PathBuf },
    EmptyRuleSet,
    InvalidBatchSize { size: usize },
    InvalidInterval { seconds: u64 },
    ConfigRead { path: PathBuf, reason: String },
    ConfigParse { path: PathBuf, reason: String },

    /// File system errors with context
    FileNotFound { path: PathBuf },
    DirectoryNotFound { path: PathBuf },
    PermissionDenied { path: PathBuf, operation: String },
    IoError { path: Option<PathBuf>, operation: String, source: io::Error },

    /// Reorganization errors
    Collision { source: PathBuf, destination: PathBuf },

    /// Action log errors
    LogSink { path: PathBuf, reason: String },
}

impl fmt::Display for CleanerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            // Configuration errors
            CleanerError::MissingInputPath => {
                writeln!(f, "No input directory given")?;
                write!(f, "Suggestion: Pass the PhotoRec output directory as the first argument")
            }
            CleanerError::InputNotADirectory { path } => {
                writeln!(f, "Input is not a directory: {}", path.display())?;
                write!(f, "Suggestion: Point at the directory that contains the recup_dir folders")
            }
            CleanerError::EmptyRuleSet => {
                writeln!(f, "Both the keep list and the exclude list are empty")?;
                write!(f, "Suggestion: Use --keep jpg,png or --exclude tmp to describe what to retain")
            }
            CleanerError::InvalidBatchSize { size } => {
                writeln!(f, "Invalid batch size: {}", size)?;
                write!(f, "Suggestion: Use a batch size of at least 1")
            }
            CleanerError::InvalidInterval { seconds } => {
                writeln!(f, "Invalid scan interval: {}s", seconds)?;
                write!(f, "Suggestion: Use an interval of at least 1 second")
            }
            CleanerError::ConfigRead { path, reason } => {
                writeln!(f, "Failed to read config file {}: {}", path.display(), reason)?;
                write!(f, "Suggestion: Check that the config file exists and is readable")
            }
            CleanerError::ConfigParse { path, reason } => {
                writeln!(f, "Failed to parse config file {}: {}", path.display(), reason)?;
                write!(f, "Suggestion: Check the TOML syntax and field names")
            }

            // File system errors
            CleanerError::FileNotFound { path } => {
                writeln!(f, "File not found: {}", path.display())?;
                write!(f, "Suggestion: The file may have been removed by another process")
            }
            CleanerError::DirectoryNotFound { path } => {
                writeln!(f, "Directory not found: {}", path.display())?;
                write!(f, "Suggestion: Check that the directory path is correct and the directory exists")
            }
            CleanerError::PermissionDenied { path, operation } => {
                writeln!(f, "Permission denied while {}: {}", operation, path.display())?;
                write!(f, "Suggestion: Check file permissions or run with appropriate privileges")
            }
            CleanerError::IoError { path, operation, source } => {
                if let Some(p) = path {
                    writeln!(f, "I/O error while {} {}: {}", operation, p.display(), source)?;
                } else {
                    writeln!(f, "I/O error while {}: {}", operation, source)?;
                }
                write!(f, "Suggestion: Check file permissions and disk space")
            }

            // Reorganization errors
            CleanerError::Collision { source, destination } => {
                writeln!(
                    f,
                    "Name collision moving {} to {}",
                    source.display(),
                    destination.display()
                )?;
                write!(f, "Suggestion: The file was left in place; move it by hand")
            }

            // Action log errors
            CleanerError::LogSink { path, reason } => {
                writeln!(f, "Failed to write action log {}: {}", path.display(), reason)?;
                write!(f, "Suggestion: Check that the log directory exists and is writable")
            }
        }
    }
}

impl std::error::Error for CleanerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CleanerError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl CleanerError {
    /// Create an error with context about the operation and optional path
    pub fn from_io_error(err: io::Error, operation: &str, path: Option<PathBuf>) -> Self {
        match (err.kind(), path) {
            (io::ErrorKind::NotFound, Some(p)) => {
                if operation.contains("directory") || operation.contains("scan") {
                    CleanerError::DirectoryNotFound { path: p }
                } else {
                    CleanerError::FileNotFound { path: p }
                }
            }
            (io::ErrorKind::PermissionDenied, Some(p)) => CleanerError::PermissionDenied {
                path: p,
                operation: operation.to_string(),
            },
            (_, path) => CleanerError::IoError {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }

    /// Whether the error is worth retrying on the next cycle.
    ///
    /// A missing root directory is irrecoverable; everything else on the I/O
    /// side (locked files, briefly unreadable folders) is retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CleanerError::FileNotFound { .. }
                | CleanerError::PermissionDenied { .. }
                | CleanerError::IoError { .. }
                | CleanerError::Collision { .. }
        )
    }

    /// Whether the error stems from configuration rather than the filesystem.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            CleanerError::MissingInputPath
                | CleanerError::InputNotADirectory { .. }
                | CleanerError::EmptyRuleSet
                | CleanerError::InvalidBatchSize { .. }
                | CleanerError::InvalidInterval { .. }
                | CleanerError::ConfigRead { .. }
                | CleanerError::ConfigParse { .. }
        )
    }
}

impl From<io::Error> for CleanerError {
    fn from(err: io::Error) -> Self {
        CleanerError::from_io_error(err, "unknown operation", None)
    }
}

pub type Result<T, E = CleanerError> = std::result::Result<T, E>;
