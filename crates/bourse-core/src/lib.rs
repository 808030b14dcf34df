//! Snapshot ingestion for bourse.
//!
//! This crate contains:
//! - Format detection and parsing of text, spreadsheet and snapshot files
//! - Column alias resolution and canonical row mapping
//! - The batch driver feeding the warehouse, with its reports

pub mod config;
pub mod domain;
pub mod error;
pub mod map;
pub mod parse;
pub mod pipeline;

pub use bourse_warehouse::{
    CompanyIds, CompanySeed, GapFillReport, Granularity, NewCompany, RebuildReport, SeriesPoint,
    SeriesQuery, StoreCounts, Venue, Warehouse, WarehouseConfig, WarehouseError, WriteMode,
};
pub use config::PipelineConfig;
pub use domain::{CanonicalRow, DateWindow, Deadline, Source};
pub use error::{ErrorKind, IngestError};
pub use map::{map_table, DropCounts, MapContext, MappedFile};
pub use parse::{parse_file, FileFormat, FileKind, HeaderRules, ParseLimits, RawTable};
pub use pipeline::{BatchReport, FailureCounts, FileFailure, Pipeline, SourceFile, WindowReport};
