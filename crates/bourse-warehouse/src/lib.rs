//! # Bourse Warehouse
//!
//! DuckDB-backed time-series store for the bourse ingestion pipeline.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `companies` | Company registry, one row per symbol |
//! | `stocks` | Intraday samples (append-only) |
//! | `daystocks` | Daily OHLC bars (append-only) |
//! | `file_done` | Ingestion ledger |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_intraday_series` | Intraday samples keyed by symbol |
//! | `vw_daily_series` | Daily bars keyed by symbol |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bourse_warehouse::{Venue, NewCompany, Warehouse};
//!
//! let warehouse = Warehouse::open_default()?;
//! let sync = warehouse.sync_companies(
//!     Venue::Euronext,
//!     &[NewCompany { symbol: "AIR".to_string(), isin: None }],
//! )?;
//! println!("AIR -> {:?}", sync.ids.resolve("AIR"));
//! # Ok::<(), bourse_warehouse::WarehouseError>(())
//! ```

pub mod aggregate;
pub mod duckdb;
pub mod ledger;
pub mod loader;
pub mod migrations;
pub mod registry;
pub mod series;
pub mod timefmt;
pub mod views;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub use aggregate::{business_days, GapFillReport};
pub use duckdb::{DuckDbConnectionManager, PooledConnection};
pub use loader::{DailyBar, IntradaySample, Sink, TimeRange, WriteMode};
pub use registry::{CompanyIds, CompanySeed, NewCompany, RebuildReport, RegistrySync, Venue};
pub use series::{Granularity, SeriesPoint, SeriesQuery};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Request was rejected before reaching the database.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// A stored value could not be decoded.
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for bourse data.
    pub bourse_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let bourse_home = resolve_bourse_home();
        let db_path = bourse_home.join("warehouse.duckdb");
        Self {
            bourse_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// Row counts of every table in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub companies: u64,
    pub intraday_samples: u64,
    pub daily_bars: u64,
    pub files_done: u64,
}

/// The time-series store.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration, creating the schema if needed.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        tracing::debug!(db_path = %config.db_path.display(), "warehouse opened");
        Ok(warehouse)
    }

    /// Apply migrations and (re)create views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Count the rows of every table.
    pub fn counts(&self) -> Result<StoreCounts, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count = |table: &str| -> Result<u64, WarehouseError> {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            let value: i64 = connection.query_row(sql.as_str(), [], |row| row.get(0))?;
            Ok(u64::try_from(value).unwrap_or_default())
        };

        Ok(StoreCounts {
            companies: count("companies")?,
            intraday_samples: count("stocks")?,
            daily_bars: count("daystocks")?,
            files_done: count("file_done")?,
        })
    }

    pub(crate) fn connection(&self) -> Result<PooledConnection, WarehouseError> {
        Ok(self.manager.acquire()?)
    }
}

fn resolve_bourse_home() -> PathBuf {
    if let Some(path) = env::var_os("BOURSE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".bourse");
    }

    PathBuf::from(".bourse")
}


#[cfg(test)]
mod tests {
    use super::testing::open_temp;
    use super::*;

    #[test]
    fn initializes_tables_and_views() {
        let (_temp, warehouse) = open_temp();
        let connection = warehouse.connection().expect("connection");
        let tables: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_name IN ('companies', 'stocks', 'daystocks', 'file_done', \
                 'vw_intraday_series', 'vw_daily_series')",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(tables, 6);
    }

    #[test]
    fn reopening_keeps_schema_and_is_empty() {
        let (temp, warehouse) = open_temp();
        drop(warehouse);

        let reopened = Warehouse::open(WarehouseConfig {
            bourse_home: temp.path().to_path_buf(),
            db_path: temp.path().join("warehouse.duckdb"),
            max_pool_size: 2,
        })
        .expect("reopen");
        assert_eq!(reopened.counts().expect("counts"), StoreCounts::default());
    }
}
