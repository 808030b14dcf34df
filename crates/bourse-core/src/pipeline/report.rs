use serde::Serialize;
use uuid::Uuid;

use bourse_warehouse::GapFillReport;

use crate::domain::{DateWindow, Source};
use crate::error::ErrorKind;
use crate::map::DropCounts;

/// Files skipped because of a per-file error, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub format: usize,
    pub io: usize,
    pub timeout: usize,
}

impl FailureCounts {
    pub const fn total(&self) -> usize {
        self.format + self.io + self.timeout
    }

    pub(crate) fn count(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::Io => self.io += 1,
            ErrorKind::Timeout => self.timeout += 1,
            _ => self.format += 1,
        }
    }
}

/// One skipped file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of ingesting one source over one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub source: Source,
    pub window: DateWindow,
    pub files_seen: usize,
    pub files_already_done: usize,
    pub files_out_of_window: usize,
    pub files_failed: FailureCounts,
    pub files_recorded: usize,
    pub rows_parsed: usize,
    pub rows_dropped: DropCounts,
    pub rows_written: usize,
    pub companies_created: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FileFailure>,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn new(source: Source, window: DateWindow) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source,
            window,
            files_seen: 0,
            files_already_done: 0,
            files_out_of_window: 0,
            files_failed: FailureCounts::default(),
            files_recorded: 0,
            rows_parsed: 0,
            rows_dropped: DropCounts::default(),
            rows_written: 0,
            companies_created: 0,
            failures: Vec::new(),
            elapsed_ms: 0,
        }
    }

    /// Files handed to the parser.
    pub const fn files_attempted(&self) -> usize {
        self.files_seen
            .saturating_sub(self.files_already_done)
            .saturating_sub(self.files_out_of_window)
    }

    /// Nothing was eligible for parsing.
    pub const fn no_input(&self) -> bool {
        self.files_attempted() == 0
    }

    /// Every parsed file failed.
    pub const fn all_failed(&self) -> bool {
        let attempted = self.files_attempted();
        attempted > 0 && self.files_failed.total() == attempted
    }
}

/// Outcome of `Pipeline::run_window`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowReport {
    pub window: DateWindow,
    pub batches: Vec<BatchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_fill: Option<GapFillReport>,
}

impl WindowReport {
    pub fn rows_written(&self) -> usize {
        self.batches.iter().map(|batch| batch.rows_written).sum()
    }

    /// At least one batch parsed files and every batch that did saw them all fail.
    pub fn all_failed(&self) -> bool {
        let attempted: Vec<&BatchReport> = self.batches.iter().filter(|batch| !batch.no_input()).collect();
        !attempted.is_empty() && attempted.iter().all(|batch| batch.all_failed())
    }
}
