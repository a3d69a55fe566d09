//! Running tallies for a cleaning run.

use serde::Serialize;

use super::sweep::SweepReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub folders_cleaned: usize,
    pub files_kept: usize,
    pub files_deleted: usize,
    pub bytes_freed: u64,
    pub failures: usize,
}

impl Stats {
    /// Add a sweep's deletions and failures.
    ///
    /// Kept files and cleaned folders are not summed here: a folder swept twice
    /// reports the same kept files again, so the scheduler counts those from
    /// its own deduplicated state.
    pub fn absorb(&mut self, report: &SweepReport) {
        self.files_deleted += report.deleted.len();
        self.bytes_freed += report.bytes_freed;
        self.failures += report.failures.len();
    }

    pub fn freed_human(&self) -> String {
        humansize::format_size(self.bytes_freed, humansize::BINARY)
    }
}
