//! Timestamp resolution: fixed format list, per-file strategies and the
//! file-name fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use super::aliases::{first_present, ResolvedColumn, COMBINED_TIMESTAMP, DATE, TIME};
use crate::parse::RawTable;

const DATE_TIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[day]/[month]/[year] [hour]:[minute]:[second]"),
    format_description!("[day]/[month]/[year] [hour]:[minute]"),
];

const DATE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]"),
    format_description!("[day]/[month]/[year]"),
];

static FILE_NAME_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})[ _T](\d{2})[:\-](\d{2})[:\-](\d{2})(\.\d+)?")
        .expect("file-name timestamp pattern is valid")
});

static FILE_NAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("file-name date pattern is valid"));

/// Parse a cell with the first matching format; date-only values land on midnight.
pub fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let trimmed = raw.trim().trim_end_matches('Z');
    if trimmed.is_empty() {
        return None;
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(trimmed, *format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| Date::parse(trimmed, *format).ok())
                .map(Date::midnight)
        })
}

/// Base name with trailing extensions removed; an all-digit suffix is a fraction
/// of seconds, not an extension.
fn strip_extensions(file_name: &str) -> &str {
    let mut base = file_name;
    while let Some((stem, extension)) = base.rsplit_once('.') {
        if stem.is_empty() || extension.is_empty() || extension.chars().all(|ch| ch.is_ascii_digit()) {
            break;
        }
        base = stem;
    }
    base
}

/// Timestamp embedded in a file name (`YYYY-MM-DD[ _T]HH[:-]MM[:-]SS[.ffffff]`).
pub fn timestamp_from_file_name(file_name: &str) -> Option<PrimitiveDateTime> {
    let captures = FILE_NAME_TIMESTAMP.captures(strip_extensions(file_name))?;
    let normalized = format!(
        "{} {}:{}:{}{}",
        &captures[1],
        &captures[2],
        &captures[3],
        &captures[4],
        captures.get(5).map_or("", |fraction| fraction.as_str())
    );
    parse_timestamp(&normalized)
}

/// Calendar day embedded in a file name; used to skip files before parsing.
pub fn date_from_file_name(file_name: &str) -> Option<Date> {
    if let Some(ts) = timestamp_from_file_name(file_name) {
        return Some(ts.date());
    }
    let found = FILE_NAME_DATE.find(strip_extensions(file_name))?;
    Date::parse(found.as_str(), DATE_FORMATS[0]).ok()
}

/// How the rows of one file get their timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum TimestampStrategy {
    Combined { column: ResolvedColumn },
    DateAndTime { date: ResolvedColumn, time: ResolvedColumn },
    DateOnly { column: ResolvedColumn },
    FileName {
        #[serde(skip)]
        ts: PrimitiveDateTime,
    },
}

impl TimestampStrategy {
    pub fn timestamp(&self, row: &[String]) -> Option<PrimitiveDateTime> {
        let cell = |column: &ResolvedColumn| row.get(column.index).map(String::as_str).unwrap_or("");
        match self {
            Self::Combined { column } | Self::DateOnly { column } => parse_timestamp(cell(column)),
            Self::DateAndTime { date, time } => {
                parse_timestamp(&format!("{} {}", cell(date).trim(), cell(time).trim()))
            }
            Self::FileName { ts } => Some(*ts),
        }
    }
}

type TimestampRule = fn(&RawTable, &str) -> Option<TimestampStrategy>;

/// Strategies in priority order; the first applicable one is used for the whole file.
pub const TIMESTAMP_RULES: &[TimestampRule] = &[
    combined_column,
    date_and_time_columns,
    date_column,
    file_name_pattern,
];

pub fn select_strategy(table: &RawTable, file_name: &str) -> Option<TimestampStrategy> {
    TIMESTAMP_RULES
        .iter()
        .find_map(|rule| rule(table, file_name))
}

fn combined_column(table: &RawTable, _file_name: &str) -> Option<TimestampStrategy> {
    first_present(table, COMBINED_TIMESTAMP).map(|column| TimestampStrategy::Combined { column })
}

fn date_and_time_columns(table: &RawTable, _file_name: &str) -> Option<TimestampStrategy> {
    let date = first_present(table, DATE)?;
    let time = first_present(table, TIME)?;
    Some(TimestampStrategy::DateAndTime { date, time })
}

fn date_column(table: &RawTable, _file_name: &str) -> Option<TimestampStrategy> {
    first_present(table, DATE).map(|column| TimestampStrategy::DateOnly { column })
}

fn file_name_pattern(_table: &RawTable, file_name: &str) -> Option<TimestampStrategy> {
    timestamp_from_file_name(file_name).map(|ts| TimestampStrategy::FileName { ts })
}
