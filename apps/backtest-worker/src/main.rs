//! Backtest worker binary.
//!
//! Wires the HTTP queue client, the local bar cache, and the built-in
//! strategy library into a polling worker, then runs it until SIGINT or
//! SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use backtest_worker::adapter::ExecutionAdapter;
use backtest_worker::config::WorkerConfig;
use backtest_worker::data::JsonCacheMarketData;
use backtest_worker::queue::{HttpQueueClient, QueueConfig};
use backtest_worker::strategy::BuiltinStrategies;
use backtest_worker::worker::Worker;

fn load_dotenv() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("backtest_worker=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
    token.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_path = load_dotenv();
    init_tracing();
    match dotenv_path {
        Some(path) => info!(path = %path.display(), "loaded .env"),
        None => info!("no .env file found, using process environment"),
    }

    let config = WorkerConfig::from_env().context("loading configuration")?;
    info!(
        worker_id = %config.worker_id,
        api_base = %config.api_base,
        cache_dir = %config.data_cache_dir,
        "starting backtest worker"
    );

    let mut queue_config = QueueConfig::new(config.api_base.clone(), config.worker_id.clone())
        .with_timeout(config.http_timeout);
    if let Some(token) = &config.api_token {
        queue_config = queue_config.with_token(token.clone());
    }
    let queue = Arc::new(HttpQueueClient::new(queue_config).context("building queue client")?);

    let adapter = ExecutionAdapter::new(
        Arc::new(BuiltinStrategies),
        Arc::new(JsonCacheMarketData::new(config.data_cache_dir.clone())),
    );

    let shutdown = CancellationToken::new();
    let signal_task = tokio::spawn(shutdown_signal(shutdown.clone()));

    let mut worker = Worker::new(queue, adapter, config.poll_interval);
    let outcome = worker.run(shutdown.clone()).await;

    shutdown.cancel();
    signal_task.abort();

    outcome.context("worker stopped with a fatal error")?;
    info!("worker drained, exiting");
    Ok(())
}
