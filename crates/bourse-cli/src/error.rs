use thiserror::Error;

use bourse_core::{IngestError, WarehouseError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("every attempted file failed ({failed} of {attempted})")]
    AllFilesFailed { failed: usize, attempted: usize },

    #[error("seed file: {0}")]
    Seed(#[from] csv::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_)
            | Self::Seed(_)
            | Self::Ingest(IngestError::InvalidWindow(_))
            | Self::Warehouse(WarehouseError::QueryRejected(_)) => 2,
            Self::AllFilesFailed { .. } => 3,
            Self::Ingest(_) | Self::Warehouse(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
