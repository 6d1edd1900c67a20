//! booking entry point.
//!
//! Loads the current booking through the read-through cache and prints it as
//! JSON on stdout. Logging goes to stderr so stdout stays machine-readable.

use std::sync::Arc;

use anyhow::{Result, bail};
use booking_client::BundledFetcher;
use booking_core::{AppConfig, BookingCoordinator, CacheDb, RemoteFetcher};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

mod view_model;

use view_model::BookingViewModel;

fn build_fetcher(config: &AppConfig) -> Result<Arc<dyn RemoteFetcher>> {
    match &config.source_url {
        #[cfg(feature = "http")]
        Some(url) => {
            let fetcher = booking_client::HttpFetcher::new(url, &config.user_agent, config.timeout())?;
            tracing::info!(url = %fetcher.url(), "using HTTP booking source");
            Ok(Arc::new(fetcher))
        }
        #[cfg(not(feature = "http"))]
        Some(_) => bail!("source_url is set but this build has no HTTP support"),
        None => {
            let fetcher = BundledFetcher::new(&config.resource_dir, config.fetch_delay());
            tracing::info!(path = %fetcher.path().display(), "using bundled booking source");
            Ok(Arc::new(fetcher))
        }
    }
}

/// Signal the purge task to stop and wait for it. Returns `false` if it panicked or was cancelled.
async fn stop_purge_task(shutdown: &broadcast::Sender<()>, task: JoinHandle<()>) -> bool {
    let _ = shutdown.send(());
    match task.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "purge task ended abnormally");
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let force_refresh = std::env::args().skip(1).any(|arg| arg == "--refresh");

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), cache_ttl_secs = config.cache_ttl_secs, "starting booking");

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = build_fetcher(&config)?;
    let coordinator = BookingCoordinator::open(Arc::new(db), fetcher, config.expiry_policy()).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let purge_task =
        config.purge_interval().map(|period| coordinator.spawn_purge_task(period, shutdown_tx.subscribe()));

    let view_model = BookingViewModel::new(coordinator);
    if force_refresh {
        view_model.refresh().await;
    } else {
        view_model.load().await;
    }

    if let Some(task) = purge_task {
        stop_purge_task(&shutdown_tx, task).await;
    }

    let state = view_model.state();
    if let Some(message) = state.error_message.filter(|_| state.has_error) {
        bail!("failed to load booking: {message}");
    }
    if let Some(booking) = state.booking {
        println!("{}", serde_json::to_string_pretty(&booking)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::ExpiryPolicy;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_purge_task_clean_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = BundledFetcher::new(dir.path(), Duration::ZERO);
        let coordinator = BookingCoordinator::open(Arc::new(db), Arc::new(fetcher), ExpiryPolicy::default())
            .await
            .unwrap();

        let (shutdown_tx, _) = broadcast::channel(1);
        let task = coordinator.spawn_purge_task(Duration::from_millis(10), shutdown_tx.subscribe());

        assert!(stop_purge_task(&shutdown_tx, task).await);
    }

    #[tokio::test]
    async fn test_stop_purge_task_reports_panic() {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let task: JoinHandle<()> = tokio::spawn(async { panic!("purge blew up") });

        assert!(!stop_purge_task(&shutdown_tx, task).await);
    }
}
