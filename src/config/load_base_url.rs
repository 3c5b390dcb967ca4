use anyhow::{bail, Result};
use std::env;
use tracing::debug;

const BASE_URL_ENV_VAR: &str = "N8N_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:5678";

/// Loads the workflow engine base URL from the environment, falling back to a
/// local instance. A trailing slash is dropped so paths can be appended.
pub(crate) fn load_base_url() -> Result<String> {
    let base_url = match env::var(BASE_URL_ENV_VAR) {
        Ok(url) => url,
        Err(_) => {
            debug!("{BASE_URL_ENV_VAR} not set, using {DEFAULT_BASE_URL}");
            DEFAULT_BASE_URL.to_string()
        }
    };

    validate_base_url(&base_url)?;

    Ok(base_url.trim().trim_end_matches('/').to_string())
}

pub fn validate_base_url(input: &str) -> Result<()> {
    let s = input.trim();

    if s.is_empty() {
        bail!("{BASE_URL_ENV_VAR} cannot be empty.");
    }
    if !s.starts_with("http://") && !s.starts_with("https://") {
        bail!("Invalid {BASE_URL_ENV_VAR}: expected an http:// or https:// URL, got '{s}'");
    }
    if s.contains('?') || s.contains('#') {
        bail!("{BASE_URL_ENV_VAR} must not carry a query or fragment.");
    }
    if s.split_whitespace().count() != 1 {
        bail!("{BASE_URL_ENV_VAR} must not contain spaces or tabs.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("http://localhost:5678").is_ok());
        assert!(validate_base_url("https://n8n.example.com/").is_ok());

        assert!(validate_base_url("").is_err());
        assert!(validate_base_url("localhost:5678").is_err());
        assert!(validate_base_url("http://host?x=1").is_err());
        assert!(validate_base_url("http://my host").is_err());
    }
}
