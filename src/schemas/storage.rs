//! Shapes the ingestion worker persists once an update has been accepted.

use super::core::{ChartInfo, KpiDataUpdate};
use crate::utils::fields::JsonMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall status of a collection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Partial,
    Completed,
    Failed,
    Timeout,
}

/// Status of a single KPI within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiState {
    Pending,
    Completed,
    Failed,
    Timeout,
}

/// A single point of a KPI time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

impl TimeSeriesPoint {
    /// Extract a point from an update whose `data.value` is numeric.
    pub fn from_update(update: &KpiDataUpdate) -> Option<Self> {
        let value = update.data.get("value")?.as_f64()?;
        Some(TimeSeriesPoint {
            timestamp: update.timestamp.clone(),
            value,
            metadata: update.metadata.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesData {
    pub kpi_id: String,
    pub kpi_type: String,
    pub data_points: Vec<TimeSeriesPoint>,
    pub last_updated: String,
    pub metadata: JsonMap,
}

impl TimeSeriesData {
    pub fn new(kpi_id: impl Into<String>, kpi_type: impl Into<String>) -> Self {
        TimeSeriesData {
            kpi_id: kpi_id.into(),
            kpi_type: kpi_type.into(),
            data_points: Vec::new(),
            last_updated: String::new(),
            metadata: JsonMap::new(),
        }
    }

    /// Append a point and move `last_updated` to its timestamp.
    pub fn push(&mut self, point: TimeSeriesPoint) {
        self.last_updated = point.timestamp.clone();
        self.data_points.push(point);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiStatus {
    pub kpi_id: String,
    pub status: KpiState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

/// Job tracking record, keyed by trace id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub trace_id: String,
    pub status: JobState,
    pub created_at: String,
    pub updated_at: String,
    pub kpis: BTreeMap<String, KpiStatus>,
    pub metadata: JsonMap,
}

impl JobStatus {
    /// Derive the job state from its KPI states.
    ///
    /// A job with no KPIs yet is `Pending`. All completed is `Completed`; any
    /// pending KPI keeps the job `Pending` unless something already completed,
    /// which makes it `Partial`. With nothing pending, some completed KPIs make
    /// it `Partial`, all timed out makes it `Timeout`, and anything else is
    /// `Failed`.
    pub fn derive_state(kpis: &BTreeMap<String, KpiStatus>) -> JobState {
        if kpis.is_empty() {
            return JobState::Pending;
        }

        let count = |state: KpiState| kpis.values().filter(|k| k.status == state).count();
        let completed = count(KpiState::Completed);
        let pending = count(KpiState::Pending);

        if completed == kpis.len() {
            JobState::Completed
        } else if pending > 0 {
            if completed > 0 {
                JobState::Partial
            } else {
                JobState::Pending
            }
        } else if completed > 0 {
            JobState::Partial
        } else if count(KpiState::Timeout) == kpis.len() {
            JobState::Timeout
        } else {
            JobState::Failed
        }
    }
}

/// Per-KPI package assembled for the packaging stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiPackage {
    pub trace_id: String,
    pub kpi_id: String,
    pub timestamp: String,
    pub kpi_type: String,
    pub data: JsonMap,
    pub metadata: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<JsonMap>,
}

impl KpiPackage {
    pub fn from_update(update: &KpiDataUpdate) -> Self {
        KpiPackage {
            trace_id: update.trace_id.clone(),
            kpi_id: update.kpi_id.clone(),
            timestamp: update.timestamp.clone(),
            kpi_type: update.kpi_type.clone(),
            data: update.data.clone(),
            metadata: update.metadata.clone().unwrap_or_default(),
            chart: update.chart.clone(),
            analysis: None,
        }
    }
}
