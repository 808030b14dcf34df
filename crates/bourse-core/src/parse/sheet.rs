use std::io::{self, Cursor};
use std::path::PathBuf;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use time::macros::{date, format_description};
use time::{Date, Duration};

use super::{normalize_column, HeaderRules, RawTable};
use crate::domain::Deadline;
use crate::IngestError;

const EXCEL_EPOCH: Date = date!(1899-12-30);
// Far beyond the last date `time` can represent, far below `i64::MAX`.
const MAX_SERIAL_MILLIS: f64 = 1.0e15;

/// Read the first worksheet, locating the header row the same way as text files.
pub(super) fn parse_sheet(
    bytes: Vec<u8>,
    rules: &HeaderRules,
    deadline: &Deadline,
) -> Result<RawTable, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(io::Error::other)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::format(PathBuf::new(), "workbook has no worksheet"))?
        .map_err(io::Error::other)?;

    let mut table: Option<RawTable> = None;
    for (index, row) in range.rows().enumerate() {
        deadline.tick(index)?;
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        match table.as_mut() {
            Some(table) => table.push_row(cells),
            None => {
                let columns: Vec<String> = cells.iter().map(|cell| normalize_column(cell)).collect();
                if rules.is_header(&columns) {
                    table = Some(RawTable {
                        columns,
                        rows: Vec::new(),
                    });
                }
            }
        }
    }

    table.ok_or_else(|| IngestError::format(PathBuf::new(), "no header row carries a marker column"))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => {
            value.trim().to_string()
        }
        Data::Int(value) => value.to_string(),
        Data::Float(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => excel_serial_to_text(value.as_f64()),
    }
}

/// Excel serial day number (1899-12-30 epoch) as `YYYY-MM-DD HH:MM:SS`.
fn excel_serial_to_text(serial: f64) -> String {
    let millis = (serial * 86_400_000.0).round();
    if !millis.is_finite() || millis.abs() > MAX_SERIAL_MILLIS {
        return String::new();
    }
    let ts = EXCEL_EPOCH
        .midnight()
        .checked_add(Duration::milliseconds(millis as i64));
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    ts.and_then(|ts| ts.format(format).ok()).unwrap_or_default()
}
