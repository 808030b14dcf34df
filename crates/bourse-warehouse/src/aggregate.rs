//! Daily gap-fill: synthesize missing daily bars from intraday samples.

use ::duckdb::params;
use serde::Serialize;
use time::{Date, Weekday};

use crate::timefmt::sql_date;
use crate::{Warehouse, WarehouseError};

/// Outcome of a gap-fill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapFillReport {
    pub business_days: usize,
    /// Business days crossed with every registered company.
    pub candidate_pairs: usize,
    /// Candidate pairs without a daily bar before the pass.
    pub missing_pairs: usize,
    /// Bars synthesized; missing pairs without intraday data stay unfilled.
    pub filled: usize,
}

/// Monday to Friday days in `[first, last]`.
pub fn business_days(first: Date, last: Date) -> Vec<Date> {
    let mut days = Vec::new();
    let mut day = first;
    while day <= last {
        if !matches!(day.weekday(), Weekday::Saturday | Weekday::Sunday) {
            days.push(day);
        }
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

const FILL_SQL: &str = r#"
INSERT INTO daystocks (date, cid, open, high, low, close, volume, mean, std)
SELECT agg.day, agg.cid, agg.open, agg.high, agg.low, agg.close, agg.volume, agg.mean, agg.std
FROM (
    SELECT
        CAST(s.date AS DATE) AS day,
        s.cid,
        arg_min(s.value, s.date) AS open,
        max(s.value) AS high,
        min(s.value) AS low,
        arg_max(s.value, s.date) AS close,
        sum(s.volume) AS volume,
        avg(s.value) AS mean,
        stddev_samp(s.value) AS std
    FROM stocks s
    WHERE s.date >= CAST(? AS TIMESTAMP) AND s.date < CAST(? AS TIMESTAMP)
    GROUP BY 1, 2
) agg
JOIN gapfill_calendar cal ON cal.day = agg.day
JOIN companies c ON c.id = agg.cid
WHERE NOT EXISTS (
    SELECT 1 FROM daystocks d WHERE d.cid = agg.cid AND d.date = agg.day
)
"#;

const MISSING_SQL: &str = r#"
SELECT COUNT(*)
FROM gapfill_calendar cal
CROSS JOIN companies c
WHERE NOT EXISTS (
    SELECT 1 FROM daystocks d WHERE d.cid = c.id AND d.date = cal.day
)
"#;

impl Warehouse {
    /// Fill daily bars for every (company, business day) in `[first, last]` that has
    /// intraday samples but no daily bar.
    ///
    /// Open/close are the first/last sample by time, high/low the extremes, volume
    /// the sum, mean and std the average and sample deviation of the values. A day
    /// with a single sample gets a NULL std.
    pub fn fill_daily_gaps(&self, first: Date, last: Date) -> Result<GapFillReport, WarehouseError> {
        if first > last {
            return Err(WarehouseError::QueryRejected(String::from(
                "gap-fill first day must not be after last day",
            )));
        }
        let end = last.next_day().ok_or_else(|| {
            WarehouseError::QueryRejected(String::from("gap-fill last day is out of range"))
        })?;

        let days = business_days(first, last);
        if days.is_empty() {
            return Ok(GapFillReport::default());
        }

        let connection = self.connection()?;
        let report = connection.transaction(|tx| {
            tx.execute_batch("CREATE OR REPLACE TEMP TABLE gapfill_calendar (day DATE)")?;
            {
                let mut stage = tx.prepare("INSERT INTO gapfill_calendar VALUES (CAST(? AS DATE))")?;
                for day in &days {
                    stage.execute(params![sql_date(*day)])?;
                }
            }

            let companies: i64 = tx.query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;
            let missing: i64 = tx.query_row(MISSING_SQL, [], |row| row.get(0))?;
            let filled = tx.execute(FILL_SQL, params![sql_date(first), sql_date(end)])?;
            tx.execute_batch("DROP TABLE IF EXISTS gapfill_calendar")?;

            Ok(GapFillReport {
                business_days: days.len(),
                candidate_pairs: days.len() * usize::try_from(companies).unwrap_or_default(),
                missing_pairs: usize::try_from(missing).unwrap_or_default(),
                filled,
            })
        })?;

        tracing::info!(
            first = %first,
            last = %last,
            missing = report.missing_pairs,
            filled = report.filled,
            "daily gaps filled"
        );
        Ok(report)
    }
}
