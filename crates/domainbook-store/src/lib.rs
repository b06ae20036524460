pub mod backup;
pub mod credentials;
pub mod error;
pub mod export;
pub mod lock;
pub mod paths;
pub mod repo;
pub mod table;

use crate::error::Result;
use crate::lock::TableLock;
use crate::table::Table;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle to the on-disk directory table. Holds paths only; every operation
/// reloads the file.
#[derive(Debug, Clone)]
pub struct Store {
    table_path: PathBuf,
    lock_path: PathBuf,
}

impl Store {
    /// Opens the table at `path`, creating an empty one (header only) if the
    /// file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        paths::ensure_parent_dir(path)?;
        let store = Self {
            table_path: path.to_path_buf(),
            lock_path: paths::lock_path_for(path),
        };
        let _guard = store.lock()?;
        if table::create_if_missing(&store.table_path)? {
            debug!(path = %store.table_path.display(), "created empty table");
        }
        Ok(store)
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    pub fn backup_to(&self, path: &Path) -> Result<()> {
        backup::backup_to(self, path)
    }

    /// Writes the banded export to `path`; returns the number of rows.
    pub fn export_to(&self, path: &Path) -> Result<usize> {
        export::export_to(self, path)
    }

    /// File-backed credential registry kept next to the table.
    pub fn credentials(&self) -> credentials::FileCredentialStore {
        credentials::FileCredentialStore::new(paths::users_path_for(&self.table_path))
    }

    pub fn directory(&self) -> repo::DirectoryRepo<'_> {
        repo::DirectoryRepo::new(self)
    }

    pub(crate) fn lock(&self) -> Result<TableLock> {
        TableLock::acquire(&self.lock_path)
    }

    /// True when `path` resolves to the table or its lock file.
    pub(crate) fn is_own_file(&self, path: &Path) -> Result<bool> {
        Ok(paths::same_file(path, &self.table_path)? || paths::same_file(path, &self.lock_path)?)
    }

    pub(crate) fn load(&self) -> Result<Table> {
        table::load(&self.table_path)
    }

    pub(crate) fn persist(&self, table: &Table) -> Result<()> {
        table::persist(&self.table_path, table)
    }
}
