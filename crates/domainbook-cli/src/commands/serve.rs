use crate::commands::Context;
use crate::server::{self, ServeConfig};
use anyhow::{Context as _, Result};
use clap::Args;
use std::net::SocketAddr;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on; overrides server.bind from the config file
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

pub fn serve(ctx: &Context<'_>, args: ServeArgs) -> Result<()> {
    let server_config = &ctx.config.server;
    let config = ServeConfig {
        bind: args.bind.unwrap_or(server_config.bind),
        export_token: server_config.export_token.clone(),
        allowed_origins: server_config.allowed_origins.clone(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_context(|| "start async runtime")?;
    runtime.block_on(server::serve(ctx.store.clone(), config))
}
