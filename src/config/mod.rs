use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::config::load_base_url::load_base_url;
use crate::config::load_timeout::load_timeout;

mod load_base_url;
mod load_timeout;

pub use load_base_url::validate_base_url;

/// Settings for a webhook validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Workflow engine base URL, without a trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ValidatorConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Load from the process environment, after reading `.env` if one exists.
    pub fn from_env() -> Result<ValidatorConfig> {
        let _ = dotenvy::dotenv();

        let base_url = load_base_url().context("Failed to load workflow engine base URL")?;
        let timeout = load_timeout().context("Failed to load webhook timeout")?;

        let config = Self { base_url, timeout };
        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            "validator configured"
        );

        Ok(config)
    }

    /// Full URL of a webhook path, e.g. `kpi-cbbi`.
    pub fn webhook_url(&self, path: &str) -> String {
        format!("{}/webhook/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_url() {
        let config = ValidatorConfig::new("http://localhost:5678/", Duration::from_secs(30));
        assert_eq!(config.base_url, "http://localhost:5678");
        assert_eq!(config.webhook_url("kpi-cbbi"), "http://localhost:5678/webhook/kpi-cbbi");
        assert_eq!(config.webhook_url("/kpi-cmc"), "http://localhost:5678/webhook/kpi-cmc");
    }
}
