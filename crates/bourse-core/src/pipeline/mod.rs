//! Batch driver: discovery, ledger gate, parallel parse/map, registry sync, load.

mod discover;
mod report;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rayon::prelude::*;

use bourse_warehouse::{CompanyIds, DailyBar, GapFillReport, IntradaySample, NewCompany, Warehouse};

pub use discover::{discover, SourceFile};
pub use report::{BatchReport, FailureCounts, FileFailure, WindowReport};

use crate::config::PipelineConfig;
use crate::domain::{DateWindow, Deadline, Source};
use crate::map::timestamp::date_from_file_name;
use crate::map::{dedup_key, map_table, MapContext, MappedFile};
use crate::parse::{parse_file, ParseLimits};
use crate::IngestError;

/// Ingestion pipeline over one warehouse and one data root.
pub struct Pipeline {
    warehouse: Warehouse,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(warehouse: Warehouse, config: PipelineConfig) -> Self {
        Self { warehouse, config }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest Euronext, then Boursorama, then fill daily gaps when enabled.
    pub fn run_window(&self, window: &DateWindow) -> Result<WindowReport, IngestError> {
        let mut batches = Vec::with_capacity(Source::ALL.len());
        for source in Source::ALL {
            batches.push(self.run_source(source, window)?);
        }

        let gap_fill = if self.config.gap_fill {
            Some(self.fill_gaps(window)?)
        } else {
            None
        };

        Ok(WindowReport {
            window: *window,
            batches,
            gap_fill,
        })
    }

    /// Synthesize daily bars for every day the window touches.
    pub fn fill_gaps(&self, window: &DateWindow) -> Result<GapFillReport, IngestError> {
        let (first, last) = window.days();
        Ok(self.warehouse.fill_daily_gaps(first, last)?)
    }

    /// Ingest every pending file of `source` whose content may fall in `window`.
    ///
    /// Per-file failures are counted in the report; store failures abort the batch.
    pub fn run_source(&self, source: Source, window: &DateWindow) -> Result<BatchReport, IngestError> {
        let started = Instant::now();
        let mut report = BatchReport::new(source, *window);
        let span = tracing::info_span!("batch", run_id = %report.run_id, source = %source);
        let _entered = span.enter();

        let files = discover(&self.config.data_root, source, window)?;
        report.files_seen = files.len();

        let done = if self.config.reload {
            HashSet::new()
        } else {
            self.warehouse.done_files()?
        };
        let mut pending = Vec::with_capacity(files.len());
        for file in files {
            if done.contains(&file.ledger_name) {
                report.files_already_done += 1;
                continue;
            }
            if let Some(day) = date_from_file_name(file.file_name()) {
                if !window.touches_day(day) {
                    report.files_out_of_window += 1;
                    continue;
                }
            }
            pending.push(file);
        }

        let outcomes = parse_and_map(&self.config, source, window, &pending)?;
        let mut mapped_files: Vec<(&SourceFile, MappedFile)> = Vec::with_capacity(pending.len());
        for (file, outcome) in pending.iter().zip(outcomes) {
            match outcome {
                Ok(mapped) => {
                    report.rows_parsed += mapped.rows_parsed;
                    report.rows_dropped += mapped.drops;
                    mapped_files.push((file, mapped));
                }
                Err(error) if error.is_file_scoped() => {
                    tracing::warn!(file = %file.ledger_name, %error, "file skipped");
                    report.files_failed.count(error.kind());
                    report.failures.push(FileFailure {
                        file: file.ledger_name.clone(),
                        kind: error.kind(),
                        message: error.to_string(),
                    });
                }
                Err(error) => return Err(error),
            }
        }

        // First file in path order wins a (symbol, time) key.
        let mut seen = HashSet::new();
        for (_, mapped) in &mut mapped_files {
            let before = mapped.rows.len();
            mapped
                .rows
                .retain(|row| seen.insert(dedup_key(source, &row.symbol, row.ts)));
            let removed = before - mapped.rows.len();
            mapped.drops.duplicate += removed;
            report.rows_dropped.duplicate += removed;
        }

        let sync = self
            .warehouse
            .sync_companies(source.venue(), &batch_companies(&mapped_files))?;
        report.companies_created = sync.created;

        let mut samples = Vec::new();
        let mut bars = Vec::new();
        let mut completed = Vec::new();
        for (file, mapped) in &mut mapped_files {
            let mut staged = 0;
            for row in &mapped.rows {
                let cid = match resolve(&sync.ids, &row.symbol) {
                    Ok(cid) => cid,
                    Err(error) => {
                        tracing::trace!(file = %file.ledger_name, %error, "row dropped");
                        mapped.drops.unresolved += 1;
                        report.rows_dropped.unresolved += 1;
                        continue;
                    }
                };

                if source.is_daily() {
                    let (Some(open), Some(high), Some(low)) = (row.open, row.high, row.low) else {
                        mapped.drops.numeric += 1;
                        report.rows_dropped.numeric += 1;
                        continue;
                    };
                    bars.push(DailyBar::from_prices(
                        row.ts.date(),
                        cid,
                        open,
                        high,
                        low,
                        row.close,
                        row.volume,
                    ));
                } else {
                    samples.push(IntradaySample {
                        ts: row.ts,
                        cid,
                        value: row.close,
                        volume: row.volume,
                    });
                }
                staged += 1;
            }

            // A file partly outside the window stays eligible for a wider run. A file
            // whose rows all went to an earlier file is consumed all the same.
            let superseded = mapped.rows.is_empty() && mapped.drops.duplicate > 0;
            let clean = mapped.drops.window == 0 && mapped.drops.unresolved == 0;
            if clean && (staged > 0 || superseded) {
                completed.push(file.ledger_name.clone());
            }
        }

        let mode = self.config.write_mode;
        report.rows_written = match (self.config.reload, source.is_daily()) {
            (true, true) => self.warehouse.reload_daily(window.as_range(), &bars, mode)?,
            (true, false) => self.warehouse.reload_intraday(window.as_range(), &samples, mode)?,
            (false, true) => self.warehouse.load_daily(&bars, mode)?,
            (false, false) => self.warehouse.load_intraday(&samples, mode)?,
        };
        report.files_recorded = self.warehouse.record_files(&completed)?;
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            files_seen = report.files_seen,
            files_failed = report.files_failed.total(),
            rows_written = report.rows_written,
            companies_created = report.companies_created,
            elapsed_ms = report.elapsed_ms,
            "batch finished"
        );
        Ok(report)
    }
}

fn parse_and_map(
    config: &PipelineConfig,
    source: Source,
    window: &DateWindow,
    files: &[SourceFile],
) -> Result<Vec<Result<MappedFile, IngestError>>, IngestError> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()?;
    Ok(pool.install(|| {
        files
            .par_iter()
            .map(|file| process_file(config, source, window, file))
            .collect()
    }))
}

fn process_file(
    config: &PipelineConfig,
    source: Source,
    window: &DateWindow,
    file: &SourceFile,
) -> Result<MappedFile, IngestError> {
    let deadline = Deadline::start(config.file_timeout_ms);
    let table = parse_file(
        &file.path,
        file.kind,
        ParseLimits {
            rules: &config.header,
            max_file_bytes: config.max_file_bytes,
            deadline: &deadline,
        },
    )?;
    let mapped = map_table(
        &table,
        &MapContext {
            source,
            file_name: file.file_name(),
            window,
        },
        &deadline,
    )?;

    tracing::debug!(
        file = %file.ledger_name,
        rows = mapped.rows.len(),
        dropped = mapped.drops.total(),
        elapsed_ms = deadline.elapsed_ms(),
        "file mapped"
    );
    Ok(mapped)
}

/// Distinct symbols of the batch, first occurrence first, with the first ISIN seen.
fn batch_companies(files: &[(&SourceFile, MappedFile)]) -> Vec<NewCompany> {
    let mut companies: Vec<NewCompany> = Vec::new();
    let mut positions = HashMap::new();
    for (_, mapped) in files {
        for row in &mapped.rows {
            match positions.get(&row.symbol) {
                Some(&position) => {
                    let company: &mut NewCompany = &mut companies[position];
                    if company.isin.is_none() {
                        company.isin.clone_from(&row.isin);
                    }
                }
                None => {
                    positions.insert(row.symbol.clone(), companies.len());
                    companies.push(NewCompany {
                        symbol: row.symbol.clone(),
                        isin: row.isin.clone(),
                    });
                }
            }
        }
    }
    companies
}

fn resolve(ids: &CompanyIds, symbol: &str) -> Result<i64, IngestError> {
    ids.resolve(symbol).ok_or_else(|| IngestError::Resolution {
        symbol: symbol.to_string(),
    })
}
