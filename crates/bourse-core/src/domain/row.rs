use time::PrimitiveDateTime;

/// One source row in the canonical schema.
///
/// `close` is always present; `open`, `high` and `low` are present for daily rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub ts: PrimitiveDateTime,
    pub symbol: String,
    pub isin: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}
