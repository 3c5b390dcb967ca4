//! Canonical update records accepted by the ingestion boundary.
//!
//! [`KpiDataUpdate`] is the single-KPI success shape every workflow response
//! is eventually reduced to. [`KpiErrorUpdate`] is the failure shape; it
//! accepts any error structure a workflow produces and keeps unknown
//! top-level keys so they survive a parse/serialize round trip.

use crate::error::{Result, SchemaError};
use crate::utils::fields::{
    as_object, display_value, first_present, is_blank, optional_count, optional_object,
    optional_str, optional_str_list, required, required_id, required_str, JsonMap,
};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

const UNKNOWN: &str = "unknown";

/// Chart information for KPI visualizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartInfo {
    /// URL of the generated chart image
    pub url: String,
    /// Chart type (e.g. "line", "candlestick")
    #[serde(rename = "type")]
    pub chart_type: String,
    /// Time range covered by the chart
    #[serde(rename = "timeRange")]
    pub time_range: String,
}

impl ChartInfo {
    /// Read the optional `chart` entry of a record.
    ///
    /// Absent, `null` and empty mappings all mean "no chart". A chart that is
    /// present must carry a `url`; `type` and `timeRange` fall back to
    /// `"unknown"`.
    pub(crate) fn from_parent(map: &JsonMap) -> Result<Option<ChartInfo>> {
        let Some(raw) = map.get("chart") else {
            return Ok(None);
        };
        if is_blank(raw) {
            return Ok(None);
        }

        let chart = as_object(raw, "chart")?;
        let url = match chart.get("url") {
            Some(Value::String(url)) => url.clone(),
            Some(_) => return Err(SchemaError::invalid("chart.url", "expected string")),
            None => return Err(SchemaError::MissingField("chart.url")),
        };
        let chart_type = optional_str(chart, "type")?.unwrap_or_else(|| UNKNOWN.to_string());
        let time_range = optional_str(chart, "timeRange")?.unwrap_or_else(|| UNKNOWN.to_string());

        Ok(Some(ChartInfo {
            url,
            chart_type,
            time_range,
        }))
    }
}

/// Primary schema for successful KPI data updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiDataUpdate {
    /// Job identifier shared by every record of one workflow run
    pub trace_id: String,
    pub kpi_id: String,
    /// ISO 8601 timestamp of the data
    pub timestamp: String,
    pub kpi_type: String,
    /// Free-form KPI payload
    pub data: JsonMap,
    /// Every KPI id of the batch this record was produced from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

impl KpiDataUpdate {
    /// Build an update from a parsed JSON mapping.
    ///
    /// Requires `traceId`, `kpiId`, `timestamp`, `kpiType` and `data`; `data`
    /// must be an object.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = as_object(value, "<root>")?;

        // Presence first, in declared order, so the first absent key is reported.
        for key in ["traceId", "kpiId", "timestamp", "kpiType", "data"] {
            if !map.contains_key(key) {
                return Err(SchemaError::MissingField(key));
            }
        }

        Ok(KpiDataUpdate {
            trace_id: required_id(map, "traceId")?,
            kpi_id: required_id(map, "kpiId")?,
            timestamp: required_str(map, "timestamp")?,
            kpi_type: required_str(map, "kpiType")?,
            data: as_object(required(map, "data")?, "data")?.clone(),
            kpi_ids: optional_str_list(map, "kpiIds")?,
            chart: ChartInfo::from_parent(map)?,
            metadata: optional_object(map, "metadata")?,
        })
    }

    /// Check the fields a downstream consumer relies on are populated.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("traceId", &self.trace_id),
            ("kpiId", &self.kpi_id),
            ("timestamp", &self.timestamp),
            ("kpiType", &self.kpi_type),
        ];
        for (field, value) in checks {
            if value.is_empty() {
                return Err(SchemaError::invalid(field, "must not be empty"));
            }
        }
        Ok(())
    }
}

/// Keys of [`KpiErrorUpdate`] with a dedicated field. Anything else goes to
/// `additional_fields`.
const ERROR_KNOWN_FIELDS: [&str; 9] = [
    "traceId",
    "error",
    "timestamp",
    "kpiId",
    "kpiIds",
    "retryCount",
    "component",
    "workflowId",
    "executionId",
];

/// Primary schema for KPI error updates.
///
/// Only `trace_id` and `error` are required. `error` may be any non-empty JSON
/// value, typically an object produced by an HTTP client or a plain string.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiErrorUpdate {
    pub trace_id: String,
    pub error: Value,
    pub timestamp: Option<String>,
    pub kpi_id: Option<String>,
    pub kpi_ids: Option<Vec<String>>,
    pub retry_count: Option<u32>,
    /// Pipeline component the error occurred in
    pub component: Option<String>,
    pub workflow_id: Option<String>,
    pub execution_id: Option<String>,
    /// Unknown top-level keys, in the order they were first seen.
    /// `None` when there were none.
    pub additional_fields: Option<JsonMap>,
}

impl KpiErrorUpdate {
    /// Create an error update with only the required fields set.
    pub fn new(trace_id: impl Into<String>, error: Value) -> Self {
        KpiErrorUpdate {
            trace_id: trace_id.into(),
            error,
            timestamp: None,
            kpi_id: None,
            kpi_ids: None,
            retry_count: None,
            component: None,
            workflow_id: None,
            execution_id: None,
            additional_fields: None,
        }
    }

    /// Build an error update from a parsed JSON mapping.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = as_object(value, "<root>")?;

        let trace_id = match map.get("traceId") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(v) if !is_blank(v) => {
                return Err(SchemaError::invalid("traceId", "expected string"));
            }
            _ => return Err(SchemaError::MissingField("traceId")),
        };

        let error = match map.get("error") {
            Some(v) if !is_blank(v) => v.clone(),
            _ => return Err(SchemaError::MissingField("error")),
        };

        let additional: JsonMap = map
            .iter()
            .filter(|(key, _)| !ERROR_KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(KpiErrorUpdate {
            trace_id,
            error,
            timestamp: optional_str(map, "timestamp")?,
            kpi_id: optional_str(map, "kpiId")?,
            kpi_ids: optional_str_list(map, "kpiIds")?,
            retry_count: optional_count(map, "retryCount")?,
            component: optional_str(map, "component")?,
            workflow_id: optional_str(map, "workflowId")?,
            execution_id: optional_str(map, "executionId")?,
            additional_fields: (!additional.is_empty()).then_some(additional),
        })
    }

    /// Serialize to a flat JSON mapping.
    ///
    /// Known keys are written first; additional fields are merged in at the
    /// top level afterwards and never overwrite a known key.
    pub fn to_map(&self) -> JsonMap {
        let mut out = JsonMap::new();
        out.insert("traceId".into(), Value::String(self.trace_id.clone()));
        out.insert("error".into(), self.error.clone());

        let optional_strings = [
            ("timestamp", &self.timestamp),
            ("kpiId", &self.kpi_id),
        ];
        for (key, value) in optional_strings {
            if let Some(v) = value {
                out.insert(key.into(), Value::String(v.clone()));
            }
        }
        if let Some(ids) = &self.kpi_ids {
            out.insert("kpiIds".into(), Value::from(ids.clone()));
        }
        if let Some(count) = self.retry_count {
            out.insert("retryCount".into(), Value::from(count));
        }

        let context = [
            ("component", &self.component),
            ("workflowId", &self.workflow_id),
            ("executionId", &self.execution_id),
        ];
        for (key, value) in context {
            if let Some(v) = value {
                out.insert(key.into(), Value::String(v.clone()));
            }
        }

        if let Some(extra) = &self.additional_fields {
            for (key, value) in extra {
                out.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        out
    }

    /// Human-readable error message.
    ///
    /// For object errors this is the first non-null of `message`, `error`,
    /// `description`, falling back to the whole object as JSON.
    pub fn error_message(&self) -> String {
        match &self.error {
            Value::Object(obj) => first_present(obj, &["message", "error", "description"])
                .map(display_value)
                .unwrap_or_else(|| self.error.to_string()),
            other => display_value(other),
        }
    }

    /// Error code from `code` or `errorCode`, else the HTTP `status`.
    pub fn error_code(&self) -> Option<String> {
        let obj = self.error.as_object()?;
        first_present(obj, &["code", "errorCode"])
            .or_else(|| first_present(obj, &["status"]))
            .map(display_value)
    }

    /// Error type or class name from `name`, `type` or `errorType`.
    pub fn error_type(&self) -> Option<String> {
        let obj = self.error.as_object()?;
        first_present(obj, &["name", "type", "errorType"]).map(display_value)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trace_id.is_empty() {
            return Err(SchemaError::invalid("traceId", "must not be empty"));
        }
        if is_blank(&self.error) {
            return Err(SchemaError::invalid("error", "must not be empty"));
        }
        Ok(())
    }
}

impl Serialize for KpiErrorUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}
