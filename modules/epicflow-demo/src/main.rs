mod config;
mod script;

use std::sync::Arc;

use anyhow::Result;
use epicflow_client::{HttpBackend, SimulatedBackend};
use epicflow_domains::{AnalysisService, PanelDataSource, ResultState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::DemoConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("epicflow=info".parse()?))
        .init();

    info!("epicflow demo starting...");

    let config = DemoConfig::from_env()?;

    match &config.api_url {
        Some(url) => run(Arc::new(HttpBackend::new(url.clone())), &config).await,
        None => {
            let backend = SimulatedBackend::new(config.sim_latency, config.sim_polls);
            run(Arc::new(backend), &config).await
        }
    }
}

async fn run<B>(backend: Arc<B>, config: &DemoConfig) -> Result<()>
where
    B: PanelDataSource + AnalysisService + 'static,
{
    let panel = script::run_panel(backend.clone(), &config.query).await?;
    match &panel.result_state {
        ResultState::Success(results) => info!(
            query = %panel.query,
            series = results.series.len(),
            points = results.point_count(),
            "panel loaded"
        ),
        ResultState::Error(message) => warn!(query = %panel.query, %message, "panel failed"),
        other => info!(result = other.label(), "panel settled"),
    }

    let sentiment =
        script::run_sentiment(backend, &config.text, config.poll_interval, config.cancel_after)
            .await?;
    match &sentiment.result_state {
        ResultState::Success(result) => {
            info!(text = %sentiment.text, sentiment = ?result.sentiment, "analysis finished")
        }
        ResultState::Error(message) => warn!(text = %sentiment.text, %message, "analysis failed"),
        ResultState::Empty => info!(text = %sentiment.text, "analysis cancelled"),
        ResultState::Loading => info!(text = %sentiment.text, "analysis still loading"),
    }

    info!("epicflow demo finished");
    Ok(())
}
