use crate::error::{Result, StoreError};
use crate::paths;
use crate::table;
use crate::Store;
use std::path::Path;
use tracing::debug;

/// Snapshots the table to `path` while holding the table lock.
pub fn backup_to(store: &Store, path: &Path) -> Result<()> {
    paths::ensure_parent_dir(path)?;
    if store.is_own_file(path)? {
        return Err(StoreError::InvalidBackupPath(path.to_path_buf()));
    }
    let target = paths::canonicalize_path(path)?;

    let _guard = store.lock()?;
    let snapshot = store.load()?;
    table::persist(&target, &snapshot)?;
    debug!(path = %target.display(), rows = snapshot.len(), "table backed up");
    Ok(())
}
