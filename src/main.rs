mod backend;
mod cli;
mod config;
mod error;
mod logging;
mod migrate;
mod model;
mod paths;

use anyhow::Result;
use tracing::info;

use backend::azdo::AzdoClient;
use backend::tfs::TfsClient;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cfg = match cli::parse(&args)? {
        cli::Invocation::Help => {
            cli::print_help();
            return Ok(());
        }
        cli::Invocation::Run(cfg) => cfg,
    };

    let log_path = logging::default_run_log_path();
    logging::init(Some(&log_path))?;
    info!("Run log: {}", log_path.display());

    info!("Connecting to source..");
    let source = TfsClient::connect(&cfg.source_url, &cfg.source_project).await?;

    info!("Connecting to destination..");
    let dest = AzdoClient::connect(
        &cfg.dest_url,
        &cfg.dest_project,
        &cfg.dest_user,
        &cfg.dest_password,
    )
    .await?;

    if cfg.sync_paths {
        info!("Synchronizing area and iteration paths..");
        paths::sync(&source, &dest).await?;
    }

    if cfg.migrate_items {
        info!("Migrating work items..");
        let stats = migrate::run(&cfg, &source, &dest).await?;
        info!(
            "Migrated {} of {} work items ({} failed)",
            stats.migrated, stats.total, stats.failed
        );
    }

    info!("Press q to exit..");
    cli::wait_for_quit();
    info!("Exiting..");
    Ok(())
}
