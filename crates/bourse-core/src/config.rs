use std::path::PathBuf;
use std::thread;

use bourse_warehouse::{WarehouseConfig, WriteMode};

use crate::parse::HeaderRules;

/// Configuration for an ingestion run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the `euronext/` and `boursorama/` input trees.
    pub data_root: PathBuf,
    /// Parse/map worker threads.
    pub workers: usize,
    /// Per-file processing budget in milliseconds.
    pub file_timeout_ms: u64,
    /// Files larger than this are refused before being read.
    pub max_file_bytes: u64,
    /// How loads treat keys that may already be stored.
    pub write_mode: WriteMode,
    /// Header detection knobs.
    pub header: HeaderRules,
    /// Run the daily gap-fill after both sources of a window are loaded.
    pub gap_fill: bool,
    /// Clear the window from the sink and ignore the ledger before loading.
    pub reload: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1)
            .min(8);
        Self {
            data_root: WarehouseConfig::default().bourse_home.join("data"),
            workers,
            file_timeout_ms: 60_000,
            max_file_bytes: 512 * 1024 * 1024,
            write_mode: WriteMode::default(),
            header: HeaderRules::default(),
            gap_fill: true,
            reload: false,
        }
    }
}
