use std::{env, path::PathBuf};

use anyhow::Result;
use charge_analyzer::{
    config::AppConfig,
    dashboard_server::{self, SharedState},
    metrics_server, observability,
    pipeline::{load_dashboard_state, DashboardState},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // An explicit path on the command line wins over `[source] path`.
    let input = env::args().nth(1).map(PathBuf::from).or_else(|| cfg.source.path.clone());
    let state = match input {
        Some(path) => load_dashboard_state(&path, &cfg.analysis),
        None => {
            tracing::warn!("no charge session export configured");
            DashboardState::no_data("Error loading data: no input file given")
        }
    };

    dashboard_server::serve(&cfg.server.bind_addr, SharedState::new(state, cfg.analysis)).await
}
