//! Bulk writes into the intraday (`stocks`) and daily (`daystocks`) sinks.
//!
//! Writes are appends. The loader never checks for rows already stored; the
//! [`WriteMode::ReplaceKeys`] mode instead deletes the exact (company, time) keys
//! of the batch inside the same transaction before appending. The `reload_*`
//! variants clear a whole time range in that transaction too.

use ::duckdb::{params, Connection};
use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};

use crate::timefmt::{sql_date, sql_timestamp};
use crate::{Warehouse, WarehouseError};

/// How a load treats keys that may already be stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Delete the batch's (company, time) keys, then append.
    #[default]
    ReplaceKeys,
    /// Append only; re-loading overlapping data duplicates rows.
    AppendOnly,
}

/// Target table of a load or a range deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sink {
    Intraday,
    Daily,
}

impl Sink {
    const fn table(self) -> &'static str {
        match self {
            Self::Intraday => "stocks",
            Self::Daily => "daystocks",
        }
    }
}

/// Half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

/// One intraday sample ready for the `stocks` sink.
#[derive(Debug, Clone, PartialEq)]
pub struct IntradaySample {
    pub ts: PrimitiveDateTime,
    pub cid: i64,
    pub value: f64,
    pub volume: Option<f64>,
}

/// One daily bar ready for the `daystocks` sink.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub day: Date,
    pub cid: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl DailyBar {
    /// Build a bar from a venue's reference prices; `mean` and `std` summarize the
    /// four prices (sample standard deviation).
    pub fn from_prices(
        day: Date,
        cid: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
    ) -> Self {
        let prices = [open, high, low, close];
        let mean = prices.iter().sum::<f64>() / 4.0;
        let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / 3.0;
        Self {
            day,
            cid,
            open,
            high,
            low,
            close,
            volume,
            mean: Some(mean),
            std: Some(variance.sqrt()),
        }
    }
}

impl Warehouse {
    /// Append intraday samples; returns the number of rows written.
    pub fn load_intraday(
        &self,
        rows: &[IntradaySample],
        mode: WriteMode,
    ) -> Result<usize, WarehouseError> {
        self.write_intraday(None, rows, mode)
    }

    /// Delete the intraday rows of `range` and append `rows` in one transaction.
    pub fn reload_intraday(
        &self,
        range: TimeRange,
        rows: &[IntradaySample],
        mode: WriteMode,
    ) -> Result<usize, WarehouseError> {
        self.write_intraday(Some(range), rows, mode)
    }

    /// Append daily bars; returns the number of rows written.
    pub fn load_daily(&self, rows: &[DailyBar], mode: WriteMode) -> Result<usize, WarehouseError> {
        self.write_daily(None, rows, mode)
    }

    /// Delete the daily bars of `range` and append `rows` in one transaction.
    pub fn reload_daily(
        &self,
        range: TimeRange,
        rows: &[DailyBar],
        mode: WriteMode,
    ) -> Result<usize, WarehouseError> {
        self.write_daily(Some(range), rows, mode)
    }

    fn write_intraday(
        &self,
        clear: Option<TimeRange>,
        rows: &[IntradaySample],
        mode: WriteMode,
    ) -> Result<usize, WarehouseError> {
        if let Some(range) = clear {
            check_range(range)?;
        } else if rows.is_empty() {
            return Ok(0);
        }

        let connection = self.connection()?;
        let written = connection.transaction(|tx| {
            if let Some(range) = clear {
                delete_range_in(tx, Sink::Intraday, range)?;
            }
            if rows.is_empty() {
                return Ok(0);
            }
            tx.execute_batch(
                "CREATE OR REPLACE TEMP TABLE stage_stocks \
                 (date TIMESTAMP, cid BIGINT, value DOUBLE, volume DOUBLE)",
            )?;
            {
                let mut stage = tx.prepare(
                    "INSERT INTO stage_stocks VALUES (CAST(? AS TIMESTAMP), ?, ?, ?)",
                )?;
                for row in rows {
                    stage.execute(params![sql_timestamp(row.ts), row.cid, row.value, row.volume])?;
                }
            }
            publish_stage(tx, Sink::Intraday, "stage_stocks", mode)
        })?;

        tracing::debug!(rows = written, ?mode, "intraday samples appended");
        Ok(written)
    }

    fn write_daily(
        &self,
        clear: Option<TimeRange>,
        rows: &[DailyBar],
        mode: WriteMode,
    ) -> Result<usize, WarehouseError> {
        if let Some(range) = clear {
            check_range(range)?;
        } else if rows.is_empty() {
            return Ok(0);
        }

        let connection = self.connection()?;
        let written = connection.transaction(|tx| {
            if let Some(range) = clear {
                delete_range_in(tx, Sink::Daily, range)?;
            }
            if rows.is_empty() {
                return Ok(0);
            }
            tx.execute_batch(
                "CREATE OR REPLACE TEMP TABLE stage_daystocks \
                 (date DATE, cid BIGINT, open DOUBLE, high DOUBLE, low DOUBLE, close DOUBLE, \
                  volume DOUBLE, mean DOUBLE, std DOUBLE)",
            )?;
            {
                let mut stage = tx.prepare(
                    "INSERT INTO stage_daystocks VALUES (CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?)",
                )?;
                for row in rows {
                    stage.execute(params![
                        sql_date(row.day),
                        row.cid,
                        row.open,
                        row.high,
                        row.low,
                        row.close,
                        row.volume,
                        row.mean,
                        row.std
                    ])?;
                }
            }
            publish_stage(tx, Sink::Daily, "stage_daystocks", mode)
        })?;

        tracing::debug!(rows = written, ?mode, "daily bars appended");
        Ok(written)
    }

    /// Delete every row of `sink` whose time lies in `range`.
    pub fn delete_range(&self, sink: Sink, range: TimeRange) -> Result<usize, WarehouseError> {
        check_range(range)?;
        let connection = self.connection()?;
        connection.transaction(|tx| delete_range_in(tx, sink, range))
    }
}

fn check_range(range: TimeRange) -> Result<(), WarehouseError> {
    if range.start >= range.end {
        return Err(WarehouseError::QueryRejected(String::from(
            "range start must be before range end",
        )));
    }
    Ok(())
}

fn delete_range_in(tx: &Connection, sink: Sink, range: TimeRange) -> Result<usize, WarehouseError> {
    let sql = format!(
        "DELETE FROM {table} \
         WHERE CAST(date AS TIMESTAMP) >= CAST(? AS TIMESTAMP) \
           AND CAST(date AS TIMESTAMP) < CAST(? AS TIMESTAMP)",
        table = sink.table()
    );
    let removed = tx.execute(
        sql.as_str(),
        params![sql_timestamp(range.start), sql_timestamp(range.end)],
    )?;
    tracing::info!(sink = sink.table(), removed, "deleted range");
    Ok(removed)
}

fn publish_stage(
    tx: &Connection,
    sink: Sink,
    stage: &str,
    mode: WriteMode,
) -> Result<usize, WarehouseError> {
    let table = sink.table();
    if mode == WriteMode::ReplaceKeys {
        let delete = format!(
            "DELETE FROM {table} WHERE EXISTS \
             (SELECT 1 FROM {stage} s WHERE s.cid = {table}.cid AND s.date = {table}.date)"
        );
        let replaced = tx.execute(delete.as_str(), [])?;
        if replaced > 0 {
            tracing::debug!(table, replaced, "replaced existing keys");
        }
    }

    let written = tx.execute(format!("INSERT INTO {table} SELECT * FROM {stage}").as_str(), [])?;
    tx.execute_batch(format!("DROP TABLE IF EXISTS {stage}").as_str())?;
    Ok(written)
}
