//! End-to-end check of live multi-KPI workflow webhooks.
//!
//! Each endpoint gets a synthetic [`MultiKpiTrigger`]; the JSON reply must
//! parse as the matching aggregate response and fan out to at least one
//! canonical update. Endpoints are exercised concurrently and every failure is
//! captured in the [`ValidationReport`] instead of aborting the run.

mod report;

pub use report::{EndpointReport, ValidationReport};

use crate::config::ValidatorConfig;
use crate::schemas::responses::{parse_multi_kpi_response, MultiKpiKind};
use crate::schemas::triggers::MultiKpiTrigger;
use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// A workflow webhook under validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookEndpoint {
    pub name: &'static str,
    pub path: &'static str,
    pub kind: MultiKpiKind,
}

pub const ENDPOINTS: [WebhookEndpoint; 2] = [
    WebhookEndpoint {
        name: "cbbi",
        path: "kpi-cbbi",
        kind: MultiKpiKind::Cbbi,
    },
    WebhookEndpoint {
        name: "cmc",
        path: "kpi-cmc",
        kind: MultiKpiKind::Cmc,
    },
];

#[derive(Debug, Clone)]
pub struct WebhookValidator {
    client: Client,
    config: ValidatorConfig,
}

impl WebhookValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Trigger asking for every KPI the source reports, tagged as a test run.
    pub fn create_test_trigger(kind: MultiKpiKind) -> MultiKpiTrigger {
        let now = Utc::now();
        let metadata = json!({"validation": true, "test_run": true})
            .as_object()
            .cloned();

        MultiKpiTrigger {
            trace_id: format!("validation_{}_{}", now.format("%Y%m%d_%H%M%S"), kind.kpi_type()),
            kpi_ids: kind.kpi_ids().iter().map(|id| id.to_string()).collect(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            kpi_type: kind.kpi_type().to_string(),
            metadata,
        }
    }

    /// POST a trigger and return the JSON reply. Anything but a 200 is an error.
    pub async fn call_webhook(&self, path: &str, trigger: &MultiKpiTrigger) -> Result<Value> {
        let url = self.config.webhook_url(path);
        debug!(%url, trace_id = %trigger.trace_id, "calling webhook");

        let resp = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .json(trigger)
            .send()
            .await
            .with_context(|| format!("Failed to call webhook {path}"))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            bail!("Webhook {path} returned {status}: {body}");
        }

        resp.json()
            .await
            .with_context(|| format!("Webhook {path} did not return a JSON body"))
    }

    /// Check a reply against the aggregate contract, returning the number of
    /// canonical updates it fans out to.
    pub fn validate_response(kind: MultiKpiKind, body: &Value) -> Result<usize> {
        let response = parse_multi_kpi_response(body).context("Response does not match schema")?;

        if response.kind() != kind {
            bail!(
                "Expected kpiType '{}', got '{}'",
                kind.kpi_type(),
                response.kind().kpi_type()
            );
        }
        if response.trace_id().is_empty() {
            bail!("Missing required field: traceId");
        }
        if response.timestamp().is_empty() {
            bail!("Missing required field: timestamp");
        }

        check_metrics(kind, body)?;

        let updates = response.to_kpi_data_updates();
        if updates.is_empty() {
            bail!("Response produced no KPI updates");
        }

        Ok(updates.len())
    }

    async fn validate_endpoint(&self, endpoint: WebhookEndpoint) -> EndpointReport {
        let trigger = Self::create_test_trigger(endpoint.kind);
        info!(
            endpoint = endpoint.name,
            trace_id = %trigger.trace_id,
            "testing {} webhook",
            endpoint.kind.kpi_type()
        );

        let outcome = match self.call_webhook(endpoint.path, &trigger).await {
            Ok(body) => {
                debug!(endpoint = endpoint.name, %body, "response received");
                Self::validate_response(endpoint.kind, &body)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(update_count) => {
                info!(endpoint = endpoint.name, update_count, "validation passed");
                EndpointReport::passed(endpoint.name, endpoint.path, update_count)
            }
            Err(e) => {
                warn!(endpoint = endpoint.name, "validation failed: {e:#}");
                EndpointReport::failed(endpoint.name, endpoint.path, format!("{e:#}"))
            }
        }
    }

    /// Validate both webhooks concurrently.
    pub async fn run(&self) -> ValidationReport {
        let [cbbi, cmc] = ENDPOINTS;
        let (cbbi, cmc) = tokio::join!(self.validate_endpoint(cbbi), self.validate_endpoint(cmc));

        ValidationReport {
            endpoints: vec![cbbi, cmc],
        }
    }
}

/// Every metric the workflow reports must be a number. Metrics it left out
/// were read as 0.0 and only produce a warning.
fn check_metrics(kind: MultiKpiKind, body: &Value) -> Result<()> {
    let Some(raw) = body.get("data").and_then(Value::as_object) else {
        return Ok(());
    };

    let mut missing = Vec::new();
    for kpi_id in kind.kpi_ids() {
        match raw.get(*kpi_id) {
            Some(v) if v.is_number() => {}
            Some(v) => bail!("KPI {kpi_id} should be numeric, got {v}"),
            None => missing.push(*kpi_id),
        }
    }

    if !missing.is_empty() {
        warn!(kpi_type = kind.kpi_type(), ?missing, "metrics defaulted to 0.0");
    }

    Ok(())
}
