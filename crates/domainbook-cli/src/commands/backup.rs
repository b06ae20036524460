use crate::commands::{print_json, Context};
use anyhow::{Context as _, Result};
use clap::Args;
use domainbook_store::error::StoreError;
use domainbook_store::paths;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Snapshot destination; defaults to the data directory's backups/ folder
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct BackupReport {
    table: String,
    output: String,
    size_bytes: u64,
}

pub fn backup(ctx: &Context<'_>, args: BackupArgs) -> Result<()> {
    let out = args.out.map_or_else(paths::backup_path, Ok)?;

    ctx.store.backup_to(&out).map_err(|err| {
        let message = match err {
            StoreError::InvalidBackupPath(_) => "backup path is the table itself",
            _ => "backup table",
        };
        anyhow::Error::new(err).context(format!("{message}: {}", out.display()))
    })?;

    let report = BackupReport {
        table: ctx.store.table_path().display().to_string(),
        output: out.display().to_string(),
        size_bytes: fs::metadata(&out)
            .with_context(|| format!("stat backup file {}", out.display()))?
            .len(),
    };

    if ctx.json {
        return print_json(&report);
    }
    println!("Backup of {} written to {}", report.table, report.output);
    Ok(())
}
