//! Offline parameter sweep binary.
//!
//! Enumerates the strategy's default sweep axes over a cached date
//! range, ranks the outcomes by every metric, logs the top entries, and
//! writes a timestamped JSON report.

use std::sync::Arc;

use anyhow::{Context, bail};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use backtest_worker::adapter::ExecutionAdapter;
use backtest_worker::data::JsonCacheMarketData;
use backtest_worker::strategy::{BuiltinStrategies, registry};
use backtest_worker::sweep::{
    Metric, ParameterGrid, SweepConfig, SweepOrchestrator, SweepRequest, rank,
};

struct SweepSettings {
    strategy_key: String,
    symbol: String,
    start_date: String,
    end_date: String,
    initial_cash: Decimal,
    top_k: usize,
    max_threads: usize,
    cache_dir: String,
    output_dir: String,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{name} must be set"))
}

fn settings_from_env() -> anyhow::Result<SweepSettings> {
    Ok(SweepSettings {
        strategy_key: env_required("SWEEP_STRATEGY")?,
        symbol: env_required("SWEEP_SYMBOL")?,
        start_date: env_required("SWEEP_START")?,
        end_date: env_required("SWEEP_END")?,
        initial_cash: env_or("SWEEP_CASH", "100000")
            .parse()
            .context("SWEEP_CASH must be a number")?,
        top_k: env_or("SWEEP_TOP_K", "3")
            .parse()
            .context("SWEEP_TOP_K must be a positive integer")?,
        max_threads: env_or("SWEEP_MAX_THREADS", "0")
            .parse()
            .context("SWEEP_MAX_THREADS must be an integer")?,
        cache_dir: env_or("DATA_CACHE_DIR", "./cache"),
        output_dir: env_or("SWEEP_OUTPUT_DIR", "./sweep_reports"),
    })
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("backtest_worker=info,sweep=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = settings_from_env()?;

    let Some(axes) = registry::default_axes(&settings.strategy_key) else {
        bail!("unknown strategy '{}'", settings.strategy_key);
    };
    let grid = ParameterGrid::from_axes(axes);
    info!(
        strategy = %settings.strategy_key,
        symbol = %settings.symbol,
        combinations = grid.total_combinations(),
        "sweep configured"
    );

    let market_data = JsonCacheMarketData::new(settings.cache_dir.clone());
    let adapter = ExecutionAdapter::new(Arc::new(BuiltinStrategies), Arc::new(market_data.clone()));
    let orchestrator = SweepOrchestrator::new(
        adapter,
        SweepConfig {
            max_threads: settings.max_threads,
            ..SweepConfig::default()
        },
    );

    let request = SweepRequest {
        strategy_key: settings.strategy_key.clone(),
        symbol: settings.symbol.clone(),
        start_date: settings.start_date.clone(),
        end_date: settings.end_date.clone(),
        initial_cash: settings.initial_cash,
        grid,
    };

    let outcome = orchestrator
        .run(&request, &market_data)
        .context("sweep failed")?;
    let report = rank(&outcome.results, &Metric::ALL, settings.top_k);

    for ranking in &report.rankings {
        for entry in &ranking.top {
            info!(
                metric = ranking.metric.key(),
                rank = entry.rank,
                index = entry.sweep_index,
                value = %entry.value,
                params = %serde_json::to_string(&entry.result.parameters)?,
                "ranked combination"
            );
        }
    }
    info!(
        ranked = report.ranked,
        skipped_no_data = report.skipped_no_data,
        skipped_error = report.skipped_error,
        elapsed_ms = outcome.elapsed_ms,
        "sweep complete"
    );

    // Timestamped filename: each sweep's report is written exactly once
    // and never overwritten.
    std::fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("creating {}", settings.output_dir))?;
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = std::path::Path::new(&settings.output_dir).join(format!(
        "sweep_{}_{}_{stamp}.json",
        settings.strategy_key, settings.symbol
    ));
    let body = serde_json::to_string_pretty(&report)?;
    std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "report written");

    Ok(())
}
