use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

const TIMEOUT_ENV_VAR: &str = "WEBHOOK_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Loads the per-request webhook timeout. Zero is rejected.
pub(crate) fn load_timeout() -> Result<Duration> {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(raw) => parse_timeout(&raw),
        Err(_) => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
    }
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{TIMEOUT_ENV_VAR} must be a whole number of seconds, got '{raw}'"))?;

    if secs == 0 {
        bail!("{TIMEOUT_ENV_VAR} must be greater than zero");
    }

    Ok(Duration::from_secs(secs))
}
