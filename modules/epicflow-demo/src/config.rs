use std::time::Duration;

use anyhow::{Context, Result};

/// Demo configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Remote API base URL. Unset means the simulated backend.
    pub api_url: Option<String>,
    pub poll_interval: Duration,
    pub sim_latency: Duration,
    pub sim_polls: u32,
    pub query: String,
    pub text: String,
    /// Request cancellation this long after submitting the text.
    pub cancel_after: Option<Duration>,
}

impl DemoConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, default: u64| -> Result<Duration> {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map(Duration::from_millis)
                    .with_context(|| format!("{key} must be a whole number of milliseconds")),
                None => Ok(Duration::from_millis(default)),
            }
        };

        Ok(Self {
            api_url: var("EPICFLOW_API_URL"),
            poll_interval: millis("EPICFLOW_POLL_INTERVAL_MS", 1000)?,
            sim_latency: millis("EPICFLOW_SIM_LATENCY_MS", 1000)?,
            sim_polls: match var("EPICFLOW_SIM_POLLS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .context("EPICFLOW_SIM_POLLS must be a positive integer")?,
                None => 2,
            },
            query: var("EPICFLOW_QUERY").unwrap_or_else(|| "sales".to_string()),
            text: var("EPICFLOW_TEXT").unwrap_or_else(|| "great day".to_string()),
            cancel_after: match var("EPICFLOW_CANCEL_AFTER_MS") {
                Some(_) => Some(millis("EPICFLOW_CANCEL_AFTER_MS", 0)?),
                None => None,
            },
        })
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  EPICFLOW_API_URL: {}",
            self.api_url.as_deref().unwrap_or("<not set, simulated>")
        );
        tracing::info!("  EPICFLOW_POLL_INTERVAL_MS: {}", self.poll_interval.as_millis());
        if self.api_url.is_none() {
            tracing::info!("  EPICFLOW_SIM_LATENCY_MS: {}", self.sim_latency.as_millis());
            tracing::info!("  EPICFLOW_SIM_POLLS: {}", self.sim_polls);
        }
        tracing::info!("  EPICFLOW_QUERY: {}", self.query);
        tracing::info!("  EPICFLOW_TEXT: {}", self.text);
        if let Some(cancel_after) = self.cancel_after {
            tracing::info!("  EPICFLOW_CANCEL_AFTER_MS: {}", cancel_after.as_millis());
        }
    }
}
