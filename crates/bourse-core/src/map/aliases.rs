//! File-scoped column alias resolution.

use serde::Serialize;

use crate::parse::RawTable;

pub(crate) const COMBINED_TIMESTAMP: &[&str] = &[
    "timestamp",
    "last_date_time",
    "last_datetime",
    "last_trade_mic_time",
    "closing_price_datetime",
    "datetime",
    "date_time",
    "index",
];
pub(crate) const DATE: &[&str] = &["date"];
pub(crate) const TIME: &[&str] = &["time"];
const SYMBOL: &[&str] = &["symbol", "ticker", "isin", "code", "mnemo", "name", "libelle"];
const ISIN: &[&str] = &["isin"];
const OPEN: &[&str] = &["open", "price_open", "ouverture"];
const HIGH: &[&str] = &["high", "price_high", "haut"];
const LOW: &[&str] = &["low", "price_low", "bas"];
const CLOSE: &[&str] = &["close", "last", "price_close", "price_last", "dernier", "cloture"];
const VOLUME: &[&str] = &["volume", "vol", "volume_traded", "quantite"];

/// A canonical field bound to a source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub alias: &'static str,
    #[serde(skip)]
    pub index: usize,
}

/// Chosen source column per canonical field for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColumnResolution {
    pub symbol: Option<ResolvedColumn>,
    pub isin: Option<ResolvedColumn>,
    pub open: Option<ResolvedColumn>,
    pub high: Option<ResolvedColumn>,
    pub low: Option<ResolvedColumn>,
    pub close: Option<ResolvedColumn>,
    pub volume: Option<ResolvedColumn>,
}

impl ColumnResolution {
    pub fn resolve(table: &RawTable) -> Self {
        Self {
            symbol: first_present(table, SYMBOL),
            isin: first_present(table, ISIN),
            open: first_present(table, OPEN),
            high: first_present(table, HIGH),
            low: first_present(table, LOW),
            close: first_present(table, CLOSE),
            volume: first_present(table, VOLUME),
        }
    }
}

/// First alias, in priority order, naming a column of `table`.
pub(crate) fn first_present(table: &RawTable, aliases: &[&'static str]) -> Option<ResolvedColumn> {
    aliases.iter().find_map(|&alias| {
        table
            .column_index(alias)
            .map(|index| ResolvedColumn { alias, index })
    })
}
