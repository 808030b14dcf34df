//! Input discovery under the data root.
//!
//! ```text
//! <data_root>/euronext/<file>                 venue-A daily files, flat
//! <data_root>/boursorama/<YYYY...>/**/<file>  venue-B snapshots, by year
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::{DateWindow, Source};
use crate::parse::FileKind;

/// A candidate input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Ledger key: `<source>/<path relative to the source directory>`.
    pub ledger_name: String,
    pub kind: FileKind,
}

impl SourceFile {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Files of `source` the parser can handle, sorted by path. A missing source
/// directory yields nothing.
pub fn discover(data_root: &Path, source: Source, window: &DateWindow) -> io::Result<Vec<SourceFile>> {
    let source_root = data_root.join(source.dir_name());
    if !source_root.is_dir() {
        tracing::debug!(path = %source_root.display(), "source directory absent");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    match source {
        Source::Euronext => {
            for entry in fs::read_dir(&source_root)? {
                let path = entry?.path();
                if path.is_file() {
                    paths.push(path);
                }
            }
        }
        Source::Boursorama => {
            let years = window.years();
            for entry in fs::read_dir(&source_root)? {
                let path = entry?.path();
                if !path.is_dir() {
                    continue;
                }
                match leading_year(&path) {
                    Some(year) if years.contains(&year) => collect_files(&path, &mut paths)?,
                    Some(_) => {
                        tracing::trace!(path = %path.display(), "year outside window, not descended");
                    }
                    None => {}
                }
            }
        }
    }

    let mut files: Vec<SourceFile> = paths
        .into_iter()
        .filter_map(|path| {
            let kind = FileKind::detect(&path)?;
            if !source.accepts(kind.format) {
                return None;
            }
            let ledger_name = ledger_name(&source_root, &path, source)?;
            Some(SourceFile {
                path,
                ledger_name,
                kind,
            })
        })
        .collect();
    files.sort_by(|left, right| left.path.cmp(&right.path));
    Ok(files)
}

fn leading_year(path: &Path) -> Option<i32> {
    let name = path.file_name()?.to_str()?;
    let digits = name.get(..4)?;
    if !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

fn ledger_name(source_root: &Path, path: &Path, source: Source) -> Option<String> {
    let relative = path.strip_prefix(source_root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(format!("{}/{}", source.dir_name(), parts.join("/")))
}
