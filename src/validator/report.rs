use serde::Serialize;
use tracing::info;

/// Outcome of validating one webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointReport {
    /// Short endpoint name, e.g. "cbbi"
    pub name: &'static str,
    /// Webhook path, e.g. "kpi-cbbi"
    pub path: &'static str,
    pub passed: bool,
    /// Canonical updates the response fanned out to
    pub update_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl EndpointReport {
    pub(crate) fn passed(name: &'static str, path: &'static str, update_count: usize) -> Self {
        Self {
            name,
            path,
            passed: true,
            update_count,
            failure: None,
        }
    }

    pub(crate) fn failed(name: &'static str, path: &'static str, failure: String) -> Self {
        Self {
            name,
            path,
            passed: false,
            update_count: 0,
            failure: Some(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub endpoints: Vec<EndpointReport>,
}

impl ValidationReport {
    pub fn all_passed(&self) -> bool {
        self.endpoints.iter().all(|e| e.passed)
    }

    pub fn get(&self, name: &str) -> Option<&EndpointReport> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// Print the per-endpoint summary on the plain target.
    pub fn log_summary(&self) {
        info!(target: "plain", "\nValidation Summary\n{}", "=".repeat(50));

        for endpoint in &self.endpoints {
            match &endpoint.failure {
                None => info!(
                    target: "plain",
                    "{} webhook: PASSED ({} KPI updates)",
                    endpoint.name.to_uppercase(),
                    endpoint.update_count
                ),
                Some(failure) => info!(
                    target: "plain",
                    "{} webhook: FAILED ({failure})",
                    endpoint.name.to_uppercase()
                ),
            }
        }

        let overall = if self.all_passed() {
            "ALL VALIDATIONS PASSED"
        } else {
            "SOME VALIDATIONS FAILED"
        };
        info!(target: "plain", "\nOverall: {overall}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_passed() {
        let mut report = ValidationReport {
            endpoints: vec![
                EndpointReport::passed("cbbi", "kpi-cbbi", 4),
                EndpointReport::passed("cmc", "kpi-cmc", 4),
            ],
        };
        assert!(report.all_passed());

        report.endpoints[1] = EndpointReport::failed("cmc", "kpi-cmc", "returned 500".into());
        assert!(!report.all_passed());
        assert_eq!(report.get("cmc").and_then(|e| e.failure.as_deref()), Some("returned 500"));
    }

    #[test]
    fn test_endpoint_report_json() {
        let json = serde_json::to_value(EndpointReport::passed("cbbi", "kpi-cbbi", 4)).unwrap();
        assert_eq!(
            json,
            json!({"name": "cbbi", "path": "kpi-cbbi", "passed": true, "updateCount": 4})
        );
    }
}
