//! Read-only views exposing the sinks by symbol for downstream consumers.

use ::duckdb::Connection;

/// Create the consumer views.
///
/// - `vw_intraday_series`: intraday samples with their company symbol
/// - `vw_daily_series`: daily bars with their company symbol
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_intraday_series AS
SELECT
    c.symbol,
    s.date AS ts,
    s.value,
    s.volume
FROM stocks s
JOIN companies c ON c.id = s.cid;

CREATE OR REPLACE VIEW vw_daily_series AS
SELECT
    c.symbol,
    CAST(d.date AS TIMESTAMP) AS ts,
    d.open,
    d.high,
    d.low,
    d.close,
    d.volume,
    d.mean,
    d.std
FROM daystocks d
JOIN companies c ON c.id = d.cid;
",
    )?;

    Ok(())
}
