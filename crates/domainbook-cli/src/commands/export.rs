use crate::commands::{print_json, Context};
use anyhow::Result;
use clap::Args;
use domainbook_store::error::StoreError;
use domainbook_store::export::write_banded_csv;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn export(ctx: &Context<'_>, args: ExportArgs) -> Result<()> {
    let Some(path) = args.out else {
        let rows = ctx.store.directory().export_grouped()?;
        if ctx.json {
            return print_json(&rows);
        }
        write_banded_csv(io::stdout().lock(), &rows)?;
        return Ok(());
    };

    let rows = ctx.store.export_to(&path).map_err(|err| {
        let message = match err {
            StoreError::InvalidExportPath(_) => "export path is the directory table",
            _ => "write export",
        };
        anyhow::Error::new(err).context(format!("{message}: {}", path.display()))
    })?;

    if ctx.json {
        let groups = ctx.store.directory().list_domains()?.len();
        print_json(&serde_json::json!({
            "output": path.display().to_string(),
            "rows": rows,
            "domains": groups,
        }))?;
    } else {
        println!("Export written to {}", path.display());
    }
    Ok(())
}
