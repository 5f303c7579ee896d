use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use server_comparison_core::params::RuntimeFlavor;
use server_comparison_env as site_env;
use server_comparison_site::{
    SiteConfig, config::EnvOverrides, site_router,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Server-comparison test site")]
struct Args {
    /// Optional JSON config file; environment variables override it.
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Args::parse();

    let config_path = cli.config.or_else(site_env::site_config_path);
    let config = SiteConfig::resolve(config_path.as_deref(), EnvOverrides::from_process_env())
        .context("failed to resolve site configuration")?;

    let filter = config
        .log_filter
        .clone()
        .or_else(site_env::rust_log)
        .unwrap_or_else(|| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let runtime = match config.runtime_flavor {
        RuntimeFlavor::MultiThread => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build(),
        RuntimeFlavor::CurrentThread => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build(),
    }
    .context("failed to build tokio runtime")?;

    runtime.block_on(serve(config))
}

async fn serve(config: SiteConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind site listener on {}", config.listen))?;

    info!(
        addr = %config.listen,
        environment = %config.environment,
        flavor = %config.runtime_flavor,
        "site listening"
    );

    axum::serve(listener, site_router(config.environment))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("site server terminated unexpectedly")
}
