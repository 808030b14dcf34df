use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use bourse_warehouse::WarehouseError;

/// Errors raised while ingesting snapshot files.
///
/// `Format`, `Io` and `Timeout` are per-file: the batch skips the file and moves
/// on. `Parse` and `Resolution` describe dropped rows and are counted rather than
/// raised. `Warehouse`, `WorkerPool` and `InvalidWindow` abort the batch.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported layout in '{path}': {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("cannot coerce '{value}' for field '{field}'")]
    Parse { field: &'static str, value: String },

    #[error("symbol '{symbol}' has no registry entry")]
    Resolution { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("file processing exceeded {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid window: {0}")]
    InvalidWindow(String),
}

/// Coarse classification used in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Format,
    Parse,
    Resolution,
    Io,
    Timeout,
    Warehouse,
    InvalidWindow,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Parse => "parse",
            Self::Resolution => "resolution",
            Self::Io => "io",
            Self::Timeout => "timeout",
            Self::Warehouse => "warehouse",
            Self::InvalidWindow => "invalid_window",
        }
    }
}

impl IngestError {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Format { .. } => ErrorKind::Format,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::Io(_) => ErrorKind::Io,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Warehouse(_) | Self::WorkerPool(_) => ErrorKind::Warehouse,
            Self::InvalidWindow(_) => ErrorKind::InvalidWindow,
        }
    }

    /// Whether the batch can continue after this error.
    pub const fn is_file_scoped(&self) -> bool {
        matches!(
            self,
            Self::Format { .. } | Self::Io(_) | Self::Timeout { .. }
        )
    }
}
