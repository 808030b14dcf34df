use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{normalize_column, RawTable};
use crate::domain::Deadline;
use crate::map::parse_timestamp;
use crate::IngestError;

/// Intraday snapshot in "split" or "records" orientation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Split {
        columns: Vec<Value>,
        #[serde(default)]
        index: Vec<Value>,
        data: Vec<Vec<Value>>,
    },
    Records(Vec<Map<String, Value>>),
}

pub(super) fn parse_snapshot(bytes: &[u8], deadline: &Deadline) -> Result<RawTable, IngestError> {
    let snapshot: Snapshot = serde_json::from_slice(bytes).map_err(|error| {
        IngestError::format(PathBuf::new(), format!("not a tabular JSON snapshot: {error}"))
    })?;

    match snapshot {
        Snapshot::Split {
            columns,
            index,
            data,
        } => read_split(&columns, &index, data, deadline),
        Snapshot::Records(records) => read_records(records, deadline),
    }
}

fn read_split(
    columns: &[Value],
    index: &[Value],
    data: Vec<Vec<Value>>,
    deadline: &Deadline,
) -> Result<RawTable, IngestError> {
    let mut names: Vec<String> = columns.iter().map(|column| normalize_column(&cell_text(column))).collect();
    let index_name = index_column(&names, index, data.len());
    if let Some(name) = index_name {
        names.push(name.to_string());
    }

    let mut table = RawTable {
        columns: names,
        rows: Vec::with_capacity(data.len()),
    };
    for (position, row) in data.into_iter().enumerate() {
        deadline.tick(position)?;
        let mut cells: Vec<String> = row.iter().map(cell_text).collect();
        if index_name.is_some() {
            cells.resize(columns.len(), String::new());
            cells.push(index.get(position).map(cell_text).unwrap_or_default());
        }
        table.push_row(cells);
    }
    Ok(table)
}

/// Column a split index is exposed under. A positional integer index is dropped;
/// timestamps become `index`; other labels name the instrument and become `symbol`
/// unless the table already has one.
fn index_column(names: &[String], index: &[Value], rows: usize) -> Option<&'static str> {
    if index.len() != rows || index.iter().all(|value| value.is_i64() || value.is_u64()) {
        return None;
    }
    let temporal = index
        .iter()
        .all(|value| parse_timestamp(&cell_text(value)).is_some());
    let name = if temporal { "index" } else { "symbol" };
    (!names.iter().any(|existing| existing == name)).then_some(name)
}

fn read_records(records: Vec<Map<String, Value>>, deadline: &Deadline) -> Result<RawTable, IngestError> {
    let mut keys: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }

    let mut table = RawTable {
        columns: keys.iter().map(|key| normalize_column(key)).collect(),
        rows: Vec::with_capacity(records.len()),
    };
    for (position, record) in records.iter().enumerate() {
        deadline.tick(position)?;
        table.push_row(
            keys.iter()
                .map(|key| record.get(key).map(cell_text).unwrap_or_default())
                .collect(),
        );
    }
    Ok(table)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    }
}
