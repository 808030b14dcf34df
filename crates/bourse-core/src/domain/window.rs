use std::ops::RangeInclusive;

use serde::{Serialize, Serializer};
use time::{Date, Duration, PrimitiveDateTime};

use bourse_warehouse::timefmt::sql_timestamp;
use bourse_warehouse::TimeRange;

use crate::map::timestamp::parse_timestamp;
use crate::IngestError;

/// Half-open `[start, end)` ingestion window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    #[serde(serialize_with = "serialize_bound")]
    start: PrimitiveDateTime,
    #[serde(serialize_with = "serialize_bound")]
    end: PrimitiveDateTime,
}

fn serialize_bound<S: Serializer>(
    value: &PrimitiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(sql_timestamp(*value).trim_end_matches(".000000"))
}

impl DateWindow {
    pub fn new(start: PrimitiveDateTime, end: PrimitiveDateTime) -> Result<Self, IngestError> {
        if start >= end {
            return Err(IngestError::InvalidWindow(format!(
                "start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse bounds written as dates or date-times (`2021-03-12`, `2021-03-12 09:00`).
    pub fn parse(start: &str, end: &str) -> Result<Self, IngestError> {
        let bound = |value: &str| {
            parse_timestamp(value)
                .ok_or_else(|| IngestError::InvalidWindow(format!("unreadable bound '{value}'")))
        };
        Self::new(bound(start)?, bound(end)?)
    }

    pub const fn start(&self) -> PrimitiveDateTime {
        self.start
    }

    pub const fn end(&self) -> PrimitiveDateTime {
        self.end
    }

    pub fn contains(&self, ts: PrimitiveDateTime) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Whether any instant of `day` falls inside the window.
    pub fn touches_day(&self, day: Date) -> bool {
        let day_start = day.midnight();
        let day_end = day_start.saturating_add(Duration::DAY);
        day_start < self.end && self.start < day_end
    }

    /// First and last calendar day holding an instant of the window.
    pub fn days(&self) -> (Date, Date) {
        let last = self.end.saturating_sub(Duration::NANOSECOND).date();
        (self.start.date(), last)
    }

    /// Calendar years the window spans.
    pub fn years(&self) -> RangeInclusive<i32> {
        let (first, last) = self.days();
        first.year()..=last.year()
    }

    pub const fn as_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }
}
