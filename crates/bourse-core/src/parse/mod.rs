//! Format detection and parsing of snapshot files into [`RawTable`]s.
//!
//! | Extension | Format |
//! |-----------|--------|
//! | `.csv`, `.txt`, `.tsv` | delimited or fixed-width text |
//! | `.xls`, `.xlsx`, `.xlsm`, `.ods` | spreadsheet (first sheet) |
//! | `.json` | serialized snapshot |
//!
//! A trailing `.gz` (or `.gz2`), `.bz2` or `.zip` is decompressed first.

mod sheet;
mod snapshot;
mod text;

use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use serde::Serialize;

use crate::domain::Deadline;
use crate::IngestError;

pub use text::{decode_text, parse_text};

/// Column names normalized, rows padded to the header width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn push_row(&mut self, mut row: Vec<String>) {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            return;
        }
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Text,
    Sheet,
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Zip,
}

/// Format and compression inferred from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileKind {
    pub format: FileFormat,
    pub compression: Compression,
}

impl FileKind {
    /// Returns `None` for extensions the parser does not handle.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        let (stem, compression) = if let Some(stem) = name
            .strip_suffix(".gz")
            .or_else(|| name.strip_suffix(".gz2"))
        {
            (stem, Compression::Gzip)
        } else if let Some(stem) = name.strip_suffix(".bz2") {
            (stem, Compression::Bzip2)
        } else if let Some(stem) = name.strip_suffix(".zip") {
            (stem, Compression::Zip)
        } else {
            (name.as_str(), Compression::None)
        };

        let extension = stem.rsplit_once('.')?.1;
        let format = match extension {
            "csv" | "txt" | "tsv" => FileFormat::Text,
            "xls" | "xlsx" | "xlsm" | "ods" => FileFormat::Sheet,
            "json" => FileFormat::Snapshot,
            _ => return None,
        };
        Some(Self {
            format,
            compression,
        })
    }
}

/// Header detection knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRules {
    /// Normalized column names that identify a header line.
    pub markers: Vec<String>,
    /// Minimum number of non-empty cells on a header line.
    pub min_cells: usize,
}

impl Default for HeaderRules {
    fn default() -> Self {
        Self {
            markers: ["symbol", "ticker", "isin", "name", "code", "mnemo", "libelle"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_cells: 3,
        }
    }
}

impl HeaderRules {
    /// `cells` must already be normalized.
    pub fn is_header(&self, cells: &[String]) -> bool {
        let filled = cells.iter().filter(|cell| !cell.is_empty()).count();
        filled >= self.min_cells.max(1)
            && cells
                .iter()
                .any(|cell| self.markers.iter().any(|marker| marker == cell))
    }
}

/// Replace runs of non-alphanumeric characters with `_`, lower-case, trim `_`.
pub fn normalize_column(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    normalized
}

/// Limits applied while parsing one file.
#[derive(Debug, Clone, Copy)]
pub struct ParseLimits<'a> {
    pub rules: &'a HeaderRules,
    pub max_file_bytes: u64,
    pub deadline: &'a Deadline,
}

/// Read, decompress and parse one file.
pub fn parse_file(path: &Path, kind: FileKind, limits: ParseLimits<'_>) -> Result<RawTable, IngestError> {
    let bytes = read_file(path, kind.compression, limits.max_file_bytes)?;
    limits.deadline.check()?;

    let table = match kind.format {
        FileFormat::Text => parse_text(&decode_text(&bytes), limits.rules, limits.deadline),
        FileFormat::Sheet => sheet::parse_sheet(bytes, limits.rules, limits.deadline),
        FileFormat::Snapshot => snapshot::parse_snapshot(&bytes, limits.deadline),
    };
    table.map_err(|error| match error {
        IngestError::Format { reason, .. } => IngestError::format(path, reason),
        other => other,
    })
}

fn read_file(path: &Path, compression: Compression, max_bytes: u64) -> Result<Vec<u8>, IngestError> {
    let size = fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is {size} bytes, above the {max_bytes} byte limit", path.display()),
        )
        .into());
    }

    let mut raw = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
    File::open(path)?.read_to_end(&mut raw)?;

    match compression {
        Compression::None => Ok(raw),
        Compression::Gzip => decode_stream(GzDecoder::new(raw.as_slice()), max_bytes),
        Compression::Bzip2 => decode_stream(BzDecoder::new(raw.as_slice()), max_bytes),
        Compression::Zip => {
            let mut archive = zip::ZipArchive::new(Cursor::new(raw)).map_err(io::Error::other)?;
            for index in 0..archive.len() {
                let entry = archive.by_index(index).map_err(io::Error::other)?;
                if !entry.is_file() {
                    continue;
                }
                let mut decoded = Vec::new();
                entry.take(max_bytes.saturating_add(1)).read_to_end(&mut decoded)?;
                ensure_within(decoded.len(), max_bytes)?;
                return Ok(decoded);
            }
            Err(io::Error::new(io::ErrorKind::InvalidData, "zip archive holds no file").into())
        }
    }
}

fn decode_stream(decoder: impl Read, max_bytes: u64) -> Result<Vec<u8>, IngestError> {
    let mut decoded = Vec::new();
    decoder
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut decoded)?;
    ensure_within(decoded.len(), max_bytes)?;
    Ok(decoded)
}

fn ensure_within(len: usize, max_bytes: u64) -> Result<(), IngestError> {
    if u64::try_from(len).unwrap_or(u64::MAX) > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed content exceeds the {max_bytes} byte limit"),
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression as BzLevel;
    use flate2::write::GzEncoder;
    use flate2::Compression as GzLevel;
    use std::io::Write;

    #[test]
    fn detects_formats_through_compression_suffixes() {
        let kind = FileKind::detect(Path::new("2021-03-12.CSV.gz")).expect("kind");
        assert_eq!(kind.format, FileFormat::Text);
        assert_eq!(kind.compression, Compression::Gzip);

        let kind = FileKind::detect(Path::new("dump.xlsx")).expect("kind");
        assert_eq!(kind.format, FileFormat::Sheet);

        let kind = FileKind::detect(Path::new("snap 2024-01-02 09:00:00.json.zip")).expect("kind");
        assert_eq!(kind.format, FileFormat::Snapshot);
        assert_eq!(kind.compression, Compression::Zip);

        let kind = FileKind::detect(Path::new("paris 2024-01-02 09:00:00.csv.bz2")).expect("kind");
        assert_eq!(kind.format, FileFormat::Text);
        assert_eq!(kind.compression, Compression::Bzip2);

        let kind = FileKind::detect(Path::new("2024-01-02.txt.gz2")).expect("kind");
        assert_eq!(kind.compression, Compression::Gzip);

        assert!(FileKind::detect(Path::new("notes.pdf")).is_none());
        assert!(FileKind::detect(Path::new("dump.bz2")).is_none());
        assert!(FileKind::detect(Path::new("archive.zip")).is_none());
    }

    #[test]
    fn normalizes_column_names() {
        assert_eq!(normalize_column("Last Date/Time"), "last_date_time");
        assert_eq!(normalize_column("  Symbol "), "symbol");
        assert_eq!(normalize_column("Price (Close)"), "price_close");
        assert_eq!(normalize_column("Libellé"), "libell");
    }

    #[test]
    fn header_rules_need_a_marker_and_enough_cells() {
        let rules = HeaderRules::default();
        let cells = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
        assert!(rules.is_header(&cells(&["name", "isin", "last"])));
        assert!(!rules.is_header(&cells(&["name", "", ""])));
        assert!(!rules.is_header(&cells(&["open", "high", "low"])));
    }

    #[test]
    fn gzip_files_are_decompressed_and_parsed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("day.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder
            .write_all(b"Name;Symbol;Last\nAlpha;AAA;1,5\n")
            .expect("write");
        fs::write(&path, encoder.finish().expect("finish")).expect("file");

        let deadline = Deadline::start(10_000);
        let rules = HeaderRules::default();
        let kind = FileKind::detect(&path).expect("kind");
        let table = parse_file(
            &path,
            kind,
            ParseLimits {
                rules: &rules,
                max_file_bytes: 1024,
                deadline: &deadline,
            },
        )
        .expect("table");

        assert_eq!(table.columns, vec!["name", "symbol", "last"]);
        assert_eq!(table.rows, vec![vec!["Alpha", "AAA", "1,5"]]);
    }

    #[test]
    fn bzip2_files_are_decompressed_within_the_size_cap() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("day.csv.bz2");
        let mut text = String::from("Name;Symbol;Last\n");
        for _ in 0..200 {
            text.push_str("Alpha;AAA;1.5\n");
        }
        let mut encoder = BzEncoder::new(Vec::new(), BzLevel::best());
        encoder.write_all(text.as_bytes()).expect("write");
        fs::write(&path, encoder.finish().expect("finish")).expect("file");

        let deadline = Deadline::start(10_000);
        let rules = HeaderRules::default();
        let kind = FileKind::detect(&path).expect("kind");
        let limits = |max_file_bytes| ParseLimits {
            rules: &rules,
            max_file_bytes,
            deadline: &deadline,
        };

        let table = parse_file(&path, kind, limits(1 << 16)).expect("table");
        assert_eq!(table.columns, vec!["name", "symbol", "last"]);
        assert_eq!(table.len(), 200);

        // The compressed file fits but its content does not.
        let compressed = fs::metadata(&path).expect("metadata").len();
        assert!(compressed < 1024);
        let error = parse_file(&path, kind, limits(1024)).expect_err("too large");
        assert!(matches!(error, IngestError::Io(_)));
    }

    #[test]
    fn oversized_files_are_refused() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("big.csv");
        fs::write(&path, "name,symbol,last\nA,B,1\n").expect("file");

        let deadline = Deadline::start(10_000);
        let rules = HeaderRules::default();
        let error = parse_file(
            &path,
            FileKind::detect(&path).expect("kind"),
            ParseLimits {
                rules: &rules,
                max_file_bytes: 4,
                deadline: &deadline,
            },
        )
        .expect_err("too large");
        assert!(matches!(error, IngestError::Io(_)));
    }
}
