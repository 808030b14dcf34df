//! Text encodings of timestamps and days as bound into / read back from SQL.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use crate::WarehouseError;

const SQL_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");
const SQL_TIMESTAMP_FRACTION: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
const SQL_TIMESTAMP_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const SQL_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Render a timestamp the way it is bound into `CAST(? AS TIMESTAMP)`.
pub fn sql_timestamp(value: PrimitiveDateTime) -> String {
    value
        .format(SQL_TIMESTAMP)
        .unwrap_or_else(|_| value.to_string())
}

/// Render a day the way it is bound into `CAST(? AS DATE)`.
pub fn sql_date(value: Date) -> String {
    value.format(SQL_DATE).unwrap_or_else(|_| value.to_string())
}

/// Parse a `CAST(ts AS VARCHAR)` value; `DuckDB` omits the fraction when it is zero.
pub fn parse_sql_timestamp(value: &str) -> Result<PrimitiveDateTime, WarehouseError> {
    let trimmed = value.trim();
    let parsed = if trimmed.contains('.') {
        PrimitiveDateTime::parse(trimmed, SQL_TIMESTAMP_FRACTION)
    } else {
        PrimitiveDateTime::parse(trimmed, SQL_TIMESTAMP_SECONDS)
    };
    parsed.map_err(|_| WarehouseError::InvalidValue(format!("unreadable timestamp '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn timestamps_round_trip_through_sql_text() {
        let ts = datetime!(2024-03-01 09:30:15.250);
        assert_eq!(sql_timestamp(ts), "2024-03-01 09:30:15.250000");
        assert_eq!(parse_sql_timestamp("2024-03-01 09:30:15.25").expect("parse"), ts);
        assert_eq!(
            parse_sql_timestamp("2024-03-01 09:30:00").expect("parse"),
            datetime!(2024-03-01 09:30:00)
        );
    }
}
