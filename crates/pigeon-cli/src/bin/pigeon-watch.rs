//! Pigeon Watch - report fresh and purgeable files in a directory until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use pigeon_cli::{init_tracing, WatchCli};
use pigeon_watch::{BoxError, DirWatcher};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = WatchCli::parse();
    let config = cli.watcher_config()?;
    let watcher = Arc::new(
        DirWatcher::new(&cli.dir, config)
            .with_context(|| format!("Cannot watch {}", cli.dir.display()))?,
    );

    watcher.set_purge_handler(|path: &Path| -> Result<(), BoxError> {
        println!("purgeable: {}", path.display());
        Ok(())
    });
    watcher.set_retain_handler(|path: &Path| -> Result<(), BoxError> {
        println!("fresh: {}", path.display());
        Ok(())
    });

    let controller = watcher.bootstrap(SystemTime::now())?;
    tracing::info!(
        "Watching {} with {}, press Ctrl+C to stop",
        watcher.root().display(),
        controller
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    // Joining threads blocks; keep it off the runtime's workers.
    let stopper = Arc::clone(&watcher);
    let outcomes = tokio::task::spawn_blocking(move || stopper.kill_all()).await?;
    for (handle, outcome) in &outcomes {
        tracing::info!("{}: {}", handle, outcome.as_str());
    }

    println!("{}", watcher.metrics().summary());
    println!("Bye now..");
    Ok(())
}
