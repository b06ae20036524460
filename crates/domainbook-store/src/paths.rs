use crate::error::{Result, StoreError};
use chrono::Local;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "domainbook";
const TABLE_FILENAME: &str = "contacts.csv";
const BACKUP_DIR: &str = "backups";

pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME") {
        let path = PathBuf::from(dir);
        if path.as_os_str().is_empty() {
            return Err(StoreError::InvalidDataPath(path));
        }
        return Ok(path.join(APP_DIR));
    }

    let home = dirs::home_dir().ok_or(StoreError::MissingHomeDir)?;
    Ok(home.join(".local").join("share").join(APP_DIR))
}

pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = data_dir()?;
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    restrict_dir_permissions(&dir)?;
    Ok(dir)
}

pub fn table_path() -> Result<PathBuf> {
    Ok(ensure_data_dir()?.join(TABLE_FILENAME))
}

/// Explicit path wins; otherwise the table lives in the data directory.
pub fn resolve_table_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(StoreError::InvalidDataPath(path));
            }
            Ok(path)
        }
        None => table_path(),
    }
}

pub fn backup_path() -> Result<PathBuf> {
    let dir = ensure_data_dir()?.join(BACKUP_DIR);
    let stamp = Local::now().format("%Y%m%dT%H%M%S");
    Ok(dir.join(format!("contacts-{stamp}.csv")))
}

pub fn lock_path_for(table: &Path) -> PathBuf {
    let mut raw: OsString = table.as_os_str().to_owned();
    raw.push(".lock");
    PathBuf::from(raw)
}

/// Credentials registry kept next to the table: `<table>.users.json`.
pub fn users_path_for(table: &Path) -> PathBuf {
    let mut raw: OsString = table.as_os_str().to_owned();
    raw.push(".users.json");
    PathBuf::from(raw)
}

/// Canonical form of `path`. A file that does not exist yet is resolved
/// through its parent directory.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(fs::canonicalize(path)?);
    }
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let parent = fs::canonicalize(parent)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| StoreError::InvalidDataPath(path.to_path_buf()))?;
    Ok(parent.join(file_name))
}

/// True when `a` and `b` name the same file, either through the same
/// canonical path or through a hard link to the same inode.
pub fn same_file(a: &Path, b: &Path) -> Result<bool> {
    let a = canonicalize_path(a)?;
    let b = canonicalize_path(b)?;
    if a == b {
        return Ok(true);
    }
    same_inode(&a, &b)
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;
    if !a.exists() || !b.exists() {
        return Ok(false);
    }
    let a_meta = fs::metadata(a)?;
    let b_meta = fs::metadata(b)?;
    Ok(a_meta.dev() == b_meta.dev() && a_meta.ino() == b_meta.ino())
}

#[cfg(not(unix))]
fn same_inode(_a: &Path, _b: &Path) -> Result<bool> {
    Ok(false)
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_dir_permissions(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o700);
    fs::set_permissions(dir, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_dir_permissions(_dir: &Path) -> Result<()> {
    Ok(())
}
