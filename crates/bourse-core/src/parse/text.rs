use std::path::PathBuf;

use csv::ReaderBuilder;

use super::{normalize_column, HeaderRules, RawTable};
use crate::domain::Deadline;
use crate::IngestError;

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Decode file bytes as UTF-8, falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

enum Layout {
    Delimited(u8),
    /// Start offsets (in chars) of each column.
    FixedWidth(Vec<usize>),
}

/// Locate the header line, then read every following line as a data row.
pub fn parse_text(text: &str, rules: &HeaderRules, deadline: &Deadline) -> Result<RawTable, IngestError> {
    let mut offset = 0;
    let mut found = None;
    for (index, raw_line) in text.split_inclusive('\n').enumerate() {
        deadline.tick(index)?;
        offset += raw_line.len();
        let line = raw_line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let (layout, cells) = split_header(line)?;
        let columns: Vec<String> = cells.iter().map(|cell| normalize_column(cell)).collect();
        if rules.is_header(&columns) {
            tracing::trace!(line = index, columns = columns.len(), "header located");
            found = Some((layout, columns));
            break;
        }
    }

    let Some((layout, columns)) = found else {
        return Err(IngestError::format(
            PathBuf::new(),
            "no header line carries a marker column",
        ));
    };

    let mut table = RawTable {
        columns,
        rows: Vec::new(),
    };
    let body = &text[offset..];
    match layout {
        Layout::Delimited(delimiter) => read_delimited(body, delimiter, &mut table, deadline)?,
        Layout::FixedWidth(starts) => read_fixed_width(body, &starts, &mut table, deadline)?,
    }
    Ok(table)
}

fn sniff_delimiter(line: &str) -> Option<u8> {
    let mut best = None;
    let mut best_count = 0;
    for delimiter in DELIMITERS {
        let count = line.bytes().filter(|byte| *byte == delimiter).count();
        if count > best_count {
            best = Some(delimiter);
            best_count = count;
        }
    }
    best
}

fn split_header(line: &str) -> Result<(Layout, Vec<String>), IngestError> {
    if let Some(delimiter) = sniff_delimiter(line) {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(line.as_bytes());
        let cells = match reader.records().next() {
            Some(record) => record
                .map_err(|error| IngestError::format(PathBuf::new(), error.to_string()))?
                .iter()
                .map(|cell| cell.trim().to_string())
                .collect(),
            None => Vec::new(),
        };
        return Ok((Layout::Delimited(delimiter), cells));
    }

    let (starts, cells): (Vec<usize>, Vec<String>) = fixed_width_tokens(line).into_iter().unzip();
    Ok((Layout::FixedWidth(starts), cells))
}

/// Tokens separated by a tab or by two or more spaces, with their char offsets.
fn fixed_width_tokens(line: &str) -> Vec<(usize, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;
    while index < chars.len() {
        if chars[index].is_whitespace() {
            index += 1;
            continue;
        }
        let start = index;
        while index < chars.len() {
            let ch = chars[index];
            let gap = ch == '\t'
                || (ch.is_whitespace()
                    && chars.get(index + 1).map_or(true, |next| next.is_whitespace()));
            if gap {
                break;
            }
            index += 1;
        }
        tokens.push((start, chars[start..index].iter().collect()));
    }
    tokens
}

fn read_delimited(
    body: &str,
    delimiter: u8,
    table: &mut RawTable,
    deadline: &Deadline,
) -> Result<(), IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(body.as_bytes());

    for (index, record) in reader.records().enumerate() {
        deadline.tick(index)?;
        let record =
            record.map_err(|error| IngestError::format(PathBuf::new(), error.to_string()))?;
        table.push_row(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok(())
}

fn read_fixed_width(
    body: &str,
    starts: &[usize],
    table: &mut RawTable,
    deadline: &Deadline,
) -> Result<(), IngestError> {
    for (index, line) in body.lines().enumerate() {
        deadline.tick(index)?;
        let chars: Vec<char> = line.chars().collect();
        let row = starts
            .iter()
            .enumerate()
            .map(|(column, &start)| {
                let end = starts.get(column + 1).copied().unwrap_or(chars.len());
                let end = end.min(chars.len());
                if start >= end {
                    return String::new();
                }
                chars[start..end].iter().collect::<String>().trim().to_string()
            })
            .collect();
        table.push_row(row);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<RawTable, IngestError> {
        parse_text(text, &HeaderRules::default(), &Deadline::start(10_000))
    }

    #[test]
    fn skips_preamble_and_reads_semicolon_rows() {
        let text = "Euronext export\r\nGenerated 2024-01-02\r\n\r\n\
                    Name;ISIN;Symbol;Open;Last\r\n\
                    Alpha;FR0000000001;AAA;1,0;1,5\r\n\
                    \r\n\
                    Beta;FR0000000002;BBB;2;\r\n";
        let table = parse(text).expect("table");
        assert_eq!(table.columns, vec!["name", "isin", "symbol", "open", "last"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], vec!["Beta", "FR0000000002", "BBB", "2", ""]);
    }

    #[test]
    fn majority_delimiter_wins() {
        let text = "symbol|name|last|comment\nAAA|Alpha, Inc|1.5|x,y\n";
        let table = parse(text).expect("table");
        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.rows[0][1], "Alpha, Inc");
    }

    #[test]
    fn short_rows_are_padded_and_quotes_honoured() {
        let text = "name,symbol,last,volume\n\"Alpha, SA\",AAA\n";
        let table = parse(text).expect("table");
        assert_eq!(table.rows[0], vec!["Alpha, SA", "AAA", "", ""]);
    }

    #[test]
    fn fixed_width_columns_follow_header_offsets() {
        let text = "\
Symbol  Last Price  Volume
AAA     12.50       1000
BBBB    7.25
";
        let table = parse(text).expect("table");
        assert_eq!(table.columns, vec!["symbol", "last_price", "volume"]);
        assert_eq!(table.rows[0], vec!["AAA", "12.50", "1000"]);
        assert_eq!(table.rows[1], vec!["BBBB", "7.25", ""]);
    }

    #[test]
    fn missing_marker_is_a_format_error() {
        let error = parse("open,high,low\n1,2,3\n").expect_err("no header");
        assert!(matches!(error, IngestError::Format { .. }));
    }

    #[test]
    fn latin1_bytes_are_decoded() {
        let decoded = decode_text(b"libell\xe9;symbol;last\n");
        assert!(decoded.starts_with("libellé"));
        assert_eq!(decode_text(b"\xEF\xBB\xBFname"), "name");
    }
}
