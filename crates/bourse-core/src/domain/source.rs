use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use bourse_warehouse::Venue;

use crate::parse::FileFormat;

/// Input source of snapshot files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// End-of-day reference dumps; loaded as daily bars.
    Euronext,
    /// Intraday snapshot captures; loaded as intraday samples.
    Boursorama,
}

impl Source {
    pub const ALL: [Self; 2] = [Self::Euronext, Self::Boursorama];

    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Euronext => "euronext",
            Self::Boursorama => "boursorama",
        }
    }

    pub const fn venue(self) -> Venue {
        match self {
            Self::Euronext => Venue::Euronext,
            Self::Boursorama => Venue::Boursorama,
        }
    }

    /// Rows of this source become daily bars rather than intraday samples.
    pub const fn is_daily(self) -> bool {
        matches!(self, Self::Euronext)
    }

    pub const fn accepts(self, format: FileFormat) -> bool {
        match self {
            Self::Euronext => matches!(format, FileFormat::Text | FileFormat::Sheet),
            Self::Boursorama => matches!(format, FileFormat::Snapshot | FileFormat::Text),
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "euronext" => Ok(Self::Euronext),
            "boursorama" | "bourso" => Ok(Self::Boursorama),
            other => Err(format!(
                "unknown source '{other}', expected euronext or boursorama"
            )),
        }
    }
}
