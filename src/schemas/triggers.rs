//! Trigger payloads the scheduler posts to workflow webhooks.

use crate::utils::fields::JsonMap;
use serde::{Deserialize, Serialize};

/// Trigger for a workflow that collects a single KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualKpiTrigger {
    /// Job identifier (e.g. "trace_20250814_143022_abc123")
    pub trace_id: String,
    pub kpi_id: String,
    /// ISO 8601 time the job was triggered
    pub timestamp: String,
    pub kpi_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

/// Trigger for a workflow that collects several KPIs from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiKpiTrigger {
    pub trace_id: String,
    pub kpi_ids: Vec<String>,
    pub timestamp: String,
    /// Multi-KPI type, e.g. "cbbi-multi"
    pub kpi_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

/// Queue message that starts an aggregate stage (analysis, packaging, delivery).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTrigger {
    pub trace_id: String,
    pub queue_type: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_multi_trigger_wire_format() {
        let trigger = MultiKpiTrigger {
            trace_id: "trace_1".into(),
            kpi_ids: vec!["cbbi-rhodl".into(), "cbbi-mvrv".into()],
            timestamp: "2025-08-14T14:30:22Z".into(),
            kpi_type: "cbbi-multi".into(),
            metadata: None,
        };

        let json = serde_json::to_value(&trigger).unwrap();
        assert_eq!(
            json,
            json!({
                "traceId": "trace_1",
                "kpiIds": ["cbbi-rhodl", "cbbi-mvrv"],
                "timestamp": "2025-08-14T14:30:22Z",
                "kpiType": "cbbi-multi"
            })
        );
    }

    #[test]
    fn test_individual_trigger_from_json() {
        let raw = json!({
            "traceId": "trace_1",
            "kpiId": "cmc-btc-price",
            "timestamp": "2025-08-14T14:30:22Z",
            "kpiType": "price",
            "metadata": {"priority": "high"}
        });

        let trigger: IndividualKpiTrigger = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(trigger.kpi_id, "cmc-btc-price");
        assert_eq!(serde_json::to_value(&trigger).unwrap(), raw);
    }

    #[test]
    fn test_queue_trigger_requires_queue_type() {
        let raw = json!({"traceId": "t", "timestamp": "2025-08-14T14:30:22Z"});
        let err = serde_json::from_value::<QueueTrigger>(raw).unwrap_err();
        assert!(err.to_string().contains("queueType"));
    }
}
