//! Read-only range queries over the consumer views.

use ::duckdb::{params_from_iter, Row};
use serde::{Serialize, Serializer};
use time::PrimitiveDateTime;

use crate::timefmt::{parse_sql_timestamp, sql_timestamp};
use crate::{Warehouse, WarehouseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Intraday,
    Daily,
}

/// Series for `symbols` inside `[start, end)`; an empty symbol list selects every company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesQuery {
    pub symbols: Vec<String>,
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
    pub granularity: Granularity,
}

/// One point of a series. Intraday points carry only `close` (the sample value)
/// and `volume`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub symbol: String,
    #[serde(serialize_with = "serialize_ts")]
    pub ts: PrimitiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

fn serialize_ts<S: Serializer>(ts: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(sql_timestamp(*ts).trim_end_matches(".000000"))
}

impl Warehouse {
    /// Points ordered by symbol, then time.
    pub fn series(&self, query: &SeriesQuery) -> Result<Vec<SeriesPoint>, WarehouseError> {
        if query.start >= query.end {
            return Err(WarehouseError::QueryRejected(String::from(
                "series start must be before series end",
            )));
        }

        let columns = match query.granularity {
            Granularity::Intraday => {
                "symbol, CAST(ts AS VARCHAR), NULL, NULL, NULL, value, volume, NULL, NULL \
                 FROM vw_intraday_series"
            }
            Granularity::Daily => {
                "symbol, CAST(ts AS VARCHAR), open, high, low, close, volume, mean, std \
                 FROM vw_daily_series"
            }
        };
        let mut sql = format!(
            "SELECT {columns} WHERE ts >= CAST(? AS TIMESTAMP) AND ts < CAST(? AS TIMESTAMP)"
        );
        if !query.symbols.is_empty() {
            let placeholders = vec!["?"; query.symbols.len()].join(", ");
            sql.push_str(&format!(" AND symbol IN ({placeholders})"));
        }
        sql.push_str(" ORDER BY symbol, ts");

        let mut bound = vec![sql_timestamp(query.start), sql_timestamp(query.end)];
        bound.extend(query.symbols.iter().cloned());

        let connection = self.connection()?;
        let mut statement = connection.prepare(sql.as_str())?;
        let rows = statement.query_map(params_from_iter(bound.iter()), raw_point)?;

        let mut points = Vec::new();
        for row in rows {
            let raw = row?;
            points.push(SeriesPoint {
                symbol: raw.symbol,
                ts: parse_sql_timestamp(&raw.ts)?,
                open: raw.open,
                high: raw.high,
                low: raw.low,
                close: raw.close,
                volume: raw.volume,
                mean: raw.mean,
                std: raw.std,
            });
        }

        tracing::debug!(
            granularity = ?query.granularity,
            symbols = query.symbols.len(),
            points = points.len(),
            "series query"
        );
        Ok(points)
    }
}

struct RawPoint {
    symbol: String,
    ts: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: Option<f64>,
    mean: Option<f64>,
    std: Option<f64>,
}

fn raw_point(row: &Row<'_>) -> Result<RawPoint, ::duckdb::Error> {
    Ok(RawPoint {
        symbol: row.get(0)?,
        ts: row.get(1)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
        mean: row.get(7)?,
        std: row.get(8)?,
    })
}
