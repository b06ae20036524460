//! Single-column CSV table holding the raw directory rows.
//!
//! Rows are kept exactly as persisted. Normalization happens on comparison
//! and on insert, never on load, so legacy rows survive a rewrite untouched.

use crate::error::{Result, StoreError};
use domainbook_core::normalize_email;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub const DEFAULT_HEADER: &str = "Email";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    header: String,
    rows: Vec<String>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            rows: Vec::new(),
        }
    }
}

impl Table {
    pub fn with_rows<I, S>(header: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.to_string(),
            rows: rows.into_iter().map(Into::into).collect(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw rows with empty cells dropped.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(String::as_str)
            .filter(|row| !row.is_empty())
    }

    pub fn normalized_entries(&self) -> impl Iterator<Item = String> + '_ {
        self.entries().map(normalize_email)
    }

    pub fn contains_normalized(&self, email: &str) -> bool {
        self.normalized_entries().any(|entry| entry == email)
    }

    pub fn push(&mut self, row: impl Into<String>) {
        self.rows.push(row.into());
    }

    /// Drops byte-equal rows, keeping the first occurrence.
    pub fn dedup(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    /// Removes every row whose normalized value equals `email`.
    pub fn remove_normalized(&mut self, email: &str) -> usize {
        let before = self.rows.len();
        self.rows
            .retain(|row| row.is_empty() || normalize_email(row) != email);
        before - self.rows.len()
    }
}

pub fn load(path: &Path) -> Result<Table> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header = match reader.headers()?.get(0) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(StoreError::CorruptTable {
                path: path.to_path_buf(),
                reason: "missing header row".to_string(),
            })
        }
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.get(0).unwrap_or_default().to_string());
    }
    Ok(Table { header, rows })
}

/// Writes the full table to a sibling temp file and renames it over `path`.
pub fn persist(path: &Path, table: &Table) -> Result<()> {
    replace_atomically(path, |file| write_csv(file, table))
}

/// Fills a temp file in `path`'s directory, syncs it, then renames it over
/// `path`. Readers see either the old file or the complete new one.
pub(crate) fn replace_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| StoreError::Io(err.error))?;
    Ok(())
}

/// Creates a header-only table. Returns false when the file already exists.
pub fn create_if_missing(path: &Path) -> Result<bool> {
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    drop(file);
    if let Err(err) = persist(path, &Table::default()) {
        let _ = fs::remove_file(path);
        return Err(err);
    }
    Ok(true)
}

fn write_csv<W: Write>(out: W, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([table.header.as_str()])?;
    for row in &table.rows {
        writer.write_record([row.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
