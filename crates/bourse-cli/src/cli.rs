//! CLI argument definitions for bourse.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Load snapshot files of a window into the warehouse |
//! | `gap-fill` | Synthesize missing daily bars from intraday samples |
//! | `rebuild-registry` | Empty the store and reload the company registry |
//! | `status` | Row counts per table |
//! | `series` | Stored series for symbols over a window |
//!
//! # Examples
//!
//! ```bash
//! bourse ingest --start 2024-01-01 --end 2024-02-01 --pretty
//! bourse ingest --source boursorama --start 2024-01-02 --end 2024-01-03 --no-gap-fill
//! bourse series AIR BNP --start 2024-01-01 --end 2024-02-01 --granularity daily
//! bourse rebuild-registry --confirm --seed companies.csv
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use bourse_core::{Granularity, Source, WriteMode};

#[derive(Debug, Parser)]
#[command(
    name = "bourse",
    author,
    version,
    about = "Market snapshot ingestion into a local time-series warehouse"
)]
pub struct Cli {
    /// DuckDB file; defaults to `$BOURSE_HOME/warehouse.duckdb`.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Directory holding `euronext/` and `boursorama/`; defaults to `$BOURSE_HOME/data`.
    #[arg(long, global = true)]
    pub data_root: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest one source, or both followed by a gap-fill.
    Ingest(IngestArgs),
    /// Fill missing daily bars of a window from intraday samples.
    GapFill(WindowArgs),
    /// Empty every table, then reload the registry from an optional seed file.
    RebuildRegistry(RebuildArgs),
    /// Row counts per table.
    Status,
    /// Stored series for symbols over a window.
    Series(SeriesArgs),
}

/// Half-open `[start, end)` window; bounds are dates or date-times.
#[derive(Debug, Clone, Args)]
pub struct WindowArgs {
    #[arg(long)]
    pub start: String,

    #[arg(long)]
    pub end: String,
}

#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Restrict the run to one source.
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    #[arg(long, value_enum, default_value_t = WriteModeArg::ReplaceKeys)]
    pub write_mode: WriteModeArg,

    /// Parse/map worker threads.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Per-file processing budget in milliseconds.
    #[arg(long)]
    pub file_timeout_ms: Option<u64>,

    /// Skip the daily gap-fill after loading.
    #[arg(long, default_value_t = false)]
    pub no_gap_fill: bool,

    /// Delete the window from the store and ignore the ledger before loading.
    #[arg(long, default_value_t = false)]
    pub reload: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RebuildArgs {
    /// Required: the rebuild deletes every stored series and the ledger.
    #[arg(long, default_value_t = false)]
    pub confirm: bool,

    /// CSV with `name,symbol,isin,euronext,boursorama` columns.
    #[arg(long)]
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SeriesArgs {
    /// Symbols to return; none selects every company.
    pub symbols: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    #[arg(long, value_enum, default_value_t = GranularityArg::Daily)]
    pub granularity: GranularityArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Euronext,
    Boursorama,
}

impl From<SourceArg> for Source {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Euronext => Self::Euronext,
            SourceArg::Boursorama => Self::Boursorama,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteModeArg {
    /// Delete stored rows sharing a key with the batch, then append.
    ReplaceKeys,
    /// Append without looking at stored rows.
    AppendOnly,
}

impl From<WriteModeArg> for WriteMode {
    fn from(value: WriteModeArg) -> Self {
        match value {
            WriteModeArg::ReplaceKeys => Self::ReplaceKeys,
            WriteModeArg::AppendOnly => Self::AppendOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GranularityArg {
    Intraday,
    Daily,
}

impl From<GranularityArg> for Granularity {
    fn from(value: GranularityArg) -> Self {
        match value {
            GranularityArg::Intraday => Self::Intraday,
            GranularityArg::Daily => Self::Daily,
        }
    }
}
