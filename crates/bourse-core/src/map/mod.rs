//! Canonical record mapping: resolve columns once per file, then coerce each row.

pub mod aliases;
pub mod number;
pub mod timestamp;

use std::collections::HashSet;
use std::ops::AddAssign;
use std::path::PathBuf;

use serde::Serialize;
use time::PrimitiveDateTime;

pub use aliases::{ColumnResolution, ResolvedColumn};
pub use number::parse_number;
pub use timestamp::{parse_timestamp, select_strategy, TimestampStrategy};

use crate::domain::{CanonicalRow, DateWindow, Deadline, Source};
use crate::parse::RawTable;
use crate::IngestError;

/// Rows dropped per reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub timestamp: usize,
    pub symbol: usize,
    pub numeric: usize,
    pub window: usize,
    pub duplicate: usize,
    pub unresolved: usize,
}

impl DropCounts {
    pub const fn total(&self) -> usize {
        self.timestamp + self.symbol + self.numeric + self.window + self.duplicate + self.unresolved
    }
}

impl AddAssign for DropCounts {
    fn add_assign(&mut self, other: Self) {
        self.timestamp += other.timestamp;
        self.symbol += other.symbol;
        self.numeric += other.numeric;
        self.window += other.window;
        self.duplicate += other.duplicate;
        self.unresolved += other.unresolved;
    }
}

/// What the mapper needs to know about the file being mapped.
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    pub source: Source,
    pub file_name: &'a str,
    pub window: &'a DateWindow,
}

/// Mapper output for one file.
#[derive(Debug, Clone)]
pub struct MappedFile {
    pub rows: Vec<CanonicalRow>,
    pub rows_parsed: usize,
    pub drops: DropCounts,
    pub resolution: ColumnResolution,
    pub strategy: TimestampStrategy,
}

/// Key under which rows of `source` are considered duplicates: daily rows collapse
/// per calendar day.
pub fn dedup_key(source: Source, symbol: &str, ts: PrimitiveDateTime) -> (String, PrimitiveDateTime) {
    let ts = if source.is_daily() {
        ts.date().midnight()
    } else {
        ts
    };
    (symbol.to_string(), ts)
}

/// Map a parsed table onto canonical rows.
///
/// Fails with `Format` when the file has no usable timestamp, symbol or price
/// columns. Row-level problems drop the row and are counted.
pub fn map_table(
    table: &RawTable,
    context: &MapContext<'_>,
    deadline: &Deadline,
) -> Result<MappedFile, IngestError> {
    let resolution = ColumnResolution::resolve(table);
    let strategy = select_strategy(table, context.file_name).ok_or_else(|| {
        missing_columns(context, "no timestamp column and no timestamp in the file name")
    })?;
    let symbol_column = resolution
        .symbol
        .ok_or_else(|| missing_columns(context, "no symbol column"))?;
    let close_column = resolution
        .close
        .ok_or_else(|| missing_columns(context, "no close price column"))?;
    let bar = if context.source.is_daily() {
        match (resolution.open, resolution.high, resolution.low) {
            (Some(open), Some(high), Some(low)) => Some((open, high, low)),
            _ => return Err(missing_columns(context, "no open/high/low columns")),
        }
    } else {
        None
    };

    tracing::debug!(
        file = context.file_name,
        source = %context.source,
        strategy = ?strategy,
        resolution = ?resolution,
        "columns resolved"
    );

    let mut drops = DropCounts::default();
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        deadline.tick(index)?;

        let Some(ts) = strategy.timestamp(row) else {
            drops.timestamp += 1;
            continue;
        };

        let symbol_text = cell(row, symbol_column).trim();
        if symbol_text.is_empty() {
            drops.symbol += 1;
            continue;
        }

        let numbers = (|| -> Result<_, IngestError> {
            let close = number::coerce("close", cell(row, close_column))?;
            let volume = resolution
                .volume
                .map(|column| number::coerce("volume", cell(row, column)))
                .transpose()?;
            let ohlc = bar
                .map(|(open, high, low)| -> Result<_, IngestError> {
                    Ok((
                        number::coerce("open", cell(row, open))?,
                        number::coerce("high", cell(row, high))?,
                        number::coerce("low", cell(row, low))?,
                    ))
                })
                .transpose()?;
            Ok((close, volume, ohlc))
        })();
        let (close, volume, ohlc) = match numbers {
            Ok(values) => values,
            Err(error) => {
                tracing::trace!(file = context.file_name, row = index, %error, "row dropped");
                drops.numeric += 1;
                continue;
            }
        };

        if !context.window.contains(ts) {
            drops.window += 1;
            continue;
        }

        if !seen.insert(dedup_key(context.source, symbol_text, ts)) {
            drops.duplicate += 1;
            continue;
        }

        let isin = resolution
            .isin
            .map(|column| cell(row, column).trim())
            .filter(|isin| !isin.is_empty())
            .map(String::from);
        rows.push(CanonicalRow {
            ts,
            symbol: symbol_text.to_string(),
            isin,
            open: ohlc.map(|(open, _, _)| open),
            high: ohlc.map(|(_, high, _)| high),
            low: ohlc.map(|(_, _, low)| low),
            close,
            volume,
        });
    }

    Ok(MappedFile {
        rows,
        rows_parsed: table.len(),
        drops,
        resolution,
        strategy,
    })
}

fn cell(row: &[String], column: ResolvedColumn) -> &str {
    row.get(column.index).map_or("", String::as_str)
}

fn missing_columns(context: &MapContext<'_>, reason: &str) -> IngestError {
    IngestError::format(PathBuf::from(context.file_name), reason)
}
