use crate::error::{Result, StoreError};
use crate::paths;
use crate::table;
use crate::Store;
use domainbook_core::ExportRow;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub const EXPORT_HEADER: [&str; 2] = ["Domain", "Email"];
pub const EXPORT_FILENAME: &str = "emails.csv";

/// Writes the banded report as CSV: `Domain,Email`, then `<domain>,` per
/// group followed by `,<email>` per member.
pub fn write_banded_csv<W: Write>(out: W, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(EXPORT_HEADER)?;
    for row in rows {
        writer.write_record([row.domain.as_str(), row.email.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn banded_csv_string(rows: &[ExportRow]) -> Result<String> {
    let mut buf = Vec::new();
    write_banded_csv(&mut buf, rows)?;
    String::from_utf8(buf)
        .map_err(|err| StoreError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// Writes the banded export to `path` through a temp file and rename. Paths
/// that resolve to the table or its lock file are refused, whatever their
/// spelling.
pub fn export_to(store: &Store, path: &Path) -> Result<usize> {
    paths::ensure_parent_dir(path)?;
    if store.is_own_file(path)? {
        return Err(StoreError::InvalidExportPath(path.to_path_buf()));
    }

    let rows = store.directory().export_grouped()?;
    table::replace_atomically(path, |file| {
        let mut out = BufWriter::new(file);
        write_banded_csv(&mut out, &rows)?;
        out.flush()?;
        Ok(())
    })?;
    debug!(path = %path.display(), rows = rows.len(), "export written");
    Ok(rows.len())
}
