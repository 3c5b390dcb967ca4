//! Response shapes workflows send back, and the dispatch that tells them apart.
//!
//! A response is one of three shapes, keyed by `kpiType`:
//! - `"cbbi-multi"`: a CBBI aggregate bundling several KPI values
//! - `"cmc-multi"`: a CoinMarketCap aggregate
//! - anything else with a `kpiId`: a single-KPI response

use super::core::{ChartInfo, KpiDataUpdate, KpiErrorUpdate};
use crate::error::{Result, SchemaError, UnrecognizedShape};
use crate::normalize::{fan_out, lenient_metric, read_aggregate, AggregateData};
use crate::utils::fields::{
    as_object, display_value, is_blank, optional_object, optional_str_list, required,
    required_id, required_str, JsonMap,
};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Coin Bureau Bitcoin Index metrics.
///
/// `None` marks a metric the workflow reported without a usable value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CbbiData {
    /// BTC price in USD
    #[serde(deserialize_with = "lenient_metric")]
    pub cbbi_btc_price_usd: Option<f64>,
    /// RHODL ratio (0-1)
    #[serde(deserialize_with = "lenient_metric")]
    pub cbbi_rhodl: Option<f64>,
    /// MVRV ratio (0-1)
    #[serde(deserialize_with = "lenient_metric")]
    pub cbbi_mvrv: Option<f64>,
    /// Confidence index (0-1)
    #[serde(deserialize_with = "lenient_metric")]
    pub cbbi_confidence: Option<f64>,
}

impl Default for CbbiData {
    fn default() -> Self {
        CbbiData {
            cbbi_btc_price_usd: Some(0.0),
            cbbi_rhodl: Some(0.0),
            cbbi_mvrv: Some(0.0),
            cbbi_confidence: Some(0.0),
        }
    }
}

impl AggregateData for CbbiData {
    const KPI_TYPE: &'static str = "cbbi-multi";
    const KPI_IDS: &'static [&'static str] = &[
        "cbbi-btc-price-usd",
        "cbbi-rhodl",
        "cbbi-mvrv",
        "cbbi-confidence",
    ];
}

/// CoinMarketCap global metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CmcData {
    /// BTC dominance percentage (0-100)
    #[serde(deserialize_with = "lenient_metric")]
    pub cmc_btc_dominance: Option<f64>,
    /// ETH dominance percentage (0-100)
    #[serde(deserialize_with = "lenient_metric")]
    pub cmc_eth_dominance: Option<f64>,
    #[serde(deserialize_with = "lenient_metric")]
    pub cmc_totalmarketcap_usd: Option<f64>,
    #[serde(deserialize_with = "lenient_metric")]
    pub cmc_stablecoinmarketcap_usd: Option<f64>,
}

impl Default for CmcData {
    fn default() -> Self {
        CmcData {
            cmc_btc_dominance: Some(0.0),
            cmc_eth_dominance: Some(0.0),
            cmc_totalmarketcap_usd: Some(0.0),
            cmc_stablecoinmarketcap_usd: Some(0.0),
        }
    }
}

impl AggregateData for CmcData {
    const KPI_TYPE: &'static str = "cmc-multi";
    const KPI_IDS: &'static [&'static str] = &[
        "cmc-btc-dominance",
        "cmc-eth-dominance",
        "cmc-totalmarketcap-usd",
        "cmc-stablecoinmarketcap-usd",
    ];
}

/// A multi-KPI response from one aggregate source.
///
/// `kpiType` is not stored: it is always `D::KPI_TYPE`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResponse<D> {
    /// Must match the trigger's trace id
    pub trace_id: String,
    /// Data timestamp, which may differ from the trigger timestamp
    pub timestamp: String,
    pub kpi_ids: Option<Vec<String>>,
    pub data: Option<D>,
    pub metadata: Option<JsonMap>,
}

pub type CbbiMultiKpiResponse = AggregateResponse<CbbiData>;
pub type CmcMultiKpiResponse = AggregateResponse<CmcData>;

impl<D: AggregateData> AggregateResponse<D> {
    pub fn kpi_type(&self) -> &'static str {
        D::KPI_TYPE
    }

    /// Build from a mapping whose `kpiType` has already been matched to `D`.
    ///
    /// An absent, `null` or empty `data` entry leaves `data` unset.
    fn from_map(map: &JsonMap) -> Result<Self> {
        let trace_id = required_str(map, "traceId")?;
        let timestamp = required_str(map, "timestamp")?;

        let data = match map.get("data") {
            Some(raw) if !is_blank(raw) => Some(read_aggregate(as_object(raw, "data")?)?),
            _ => None,
        };

        Ok(AggregateResponse {
            trace_id,
            timestamp,
            kpi_ids: optional_str_list(map, "kpiIds")?,
            data,
            metadata: optional_object(map, "metadata")?,
        })
    }

    pub fn to_map(&self) -> JsonMap {
        let mut out = JsonMap::new();
        out.insert("traceId".into(), Value::String(self.trace_id.clone()));
        out.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        out.insert("kpiType".into(), Value::String(D::KPI_TYPE.to_string()));
        if let Some(ids) = &self.kpi_ids {
            out.insert("kpiIds".into(), Value::from(ids.clone()));
        }
        if let Some(data) = &self.data {
            out.insert("data".into(), Value::Object(data.to_external_map()));
        }
        if let Some(metadata) = &self.metadata {
            out.insert("metadata".into(), Value::Object(metadata.clone()));
        }
        out
    }

    /// Expand into one canonical update per listed KPI id.
    pub fn to_kpi_data_updates(&self) -> Vec<KpiDataUpdate> {
        fan_out(self)
    }
}

impl<D: AggregateData> Serialize for AggregateResponse<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

/// The aggregate sources a multi-KPI response can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiKpiKind {
    Cbbi,
    Cmc,
}

impl MultiKpiKind {
    pub const ALL: [MultiKpiKind; 2] = [MultiKpiKind::Cbbi, MultiKpiKind::Cmc];

    pub fn from_kpi_type(kpi_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.kpi_type() == kpi_type)
    }

    /// Match the `kpiType` entry of a mapping, if it is a multi-KPI literal.
    fn detect(map: &JsonMap) -> Option<Self> {
        map.get("kpiType")
            .and_then(Value::as_str)
            .and_then(Self::from_kpi_type)
    }

    pub fn kpi_type(&self) -> &'static str {
        match self {
            MultiKpiKind::Cbbi => CbbiData::KPI_TYPE,
            MultiKpiKind::Cmc => CmcData::KPI_TYPE,
        }
    }

    /// Every KPI id the source can report.
    pub fn kpi_ids(&self) -> &'static [&'static str] {
        match self {
            MultiKpiKind::Cbbi => CbbiData::KPI_IDS,
            MultiKpiKind::Cmc => CmcData::KPI_IDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MultiKpiResponse {
    Cbbi(CbbiMultiKpiResponse),
    Cmc(CmcMultiKpiResponse),
}

impl MultiKpiResponse {
    pub fn kind(&self) -> MultiKpiKind {
        match self {
            MultiKpiResponse::Cbbi(_) => MultiKpiKind::Cbbi,
            MultiKpiResponse::Cmc(_) => MultiKpiKind::Cmc,
        }
    }

    pub fn trace_id(&self) -> &str {
        match self {
            MultiKpiResponse::Cbbi(r) => &r.trace_id,
            MultiKpiResponse::Cmc(r) => &r.trace_id,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            MultiKpiResponse::Cbbi(r) => &r.timestamp,
            MultiKpiResponse::Cmc(r) => &r.timestamp,
        }
    }

    /// The aggregate data in external key form, if present.
    pub fn external_data(&self) -> Option<JsonMap> {
        match self {
            MultiKpiResponse::Cbbi(r) => r.data.as_ref().map(AggregateData::to_external_map),
            MultiKpiResponse::Cmc(r) => r.data.as_ref().map(AggregateData::to_external_map),
        }
    }

    pub fn to_kpi_data_updates(&self) -> Vec<KpiDataUpdate> {
        match self {
            MultiKpiResponse::Cbbi(r) => r.to_kpi_data_updates(),
            MultiKpiResponse::Cmc(r) => r.to_kpi_data_updates(),
        }
    }
}

/// A workflow response carrying exactly one KPI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualKpiResponse {
    pub trace_id: String,
    pub kpi_id: String,
    pub timestamp: String,
    /// KPI type, e.g. "price", "ratio", "index"
    pub kpi_type: String,
    pub data: JsonMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

impl IndividualKpiResponse {
    fn from_map(map: &JsonMap) -> Result<Self> {
        Ok(IndividualKpiResponse {
            trace_id: required_id(map, "traceId")?,
            kpi_id: required_id(map, "kpiId")?,
            timestamp: required_str(map, "timestamp")?,
            kpi_type: required_str(map, "kpiType")?,
            data: as_object(required(map, "data")?, "data")?.clone(),
            chart: ChartInfo::from_parent(map)?,
            metadata: optional_object(map, "metadata")?,
        })
    }

    pub fn to_kpi_data_update(&self) -> KpiDataUpdate {
        KpiDataUpdate {
            trace_id: self.trace_id.clone(),
            kpi_id: self.kpi_id.clone(),
            timestamp: self.timestamp.clone(),
            kpi_type: self.kpi_type.clone(),
            data: self.data.clone(),
            kpi_ids: None,
            chart: self.chart.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Any workflow response, one variant per shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KpiResponse {
    Individual(IndividualKpiResponse),
    CbbiMulti(CbbiMultiKpiResponse),
    CmcMulti(CmcMultiKpiResponse),
}

impl From<MultiKpiResponse> for KpiResponse {
    fn from(response: MultiKpiResponse) -> Self {
        match response {
            MultiKpiResponse::Cbbi(r) => KpiResponse::CbbiMulti(r),
            MultiKpiResponse::Cmc(r) => KpiResponse::CmcMulti(r),
        }
    }
}

impl KpiResponse {
    pub fn trace_id(&self) -> &str {
        match self {
            KpiResponse::Individual(r) => &r.trace_id,
            KpiResponse::CbbiMulti(r) => &r.trace_id,
            KpiResponse::CmcMulti(r) => &r.trace_id,
        }
    }

    /// Reduce to canonical updates: one for an individual response, one per
    /// reported KPI for an aggregate.
    pub fn to_kpi_data_updates(&self) -> Vec<KpiDataUpdate> {
        match self {
            KpiResponse::Individual(r) => vec![r.to_kpi_data_update()],
            KpiResponse::CbbiMulti(r) => r.to_kpi_data_updates(),
            KpiResponse::CmcMulti(r) => r.to_kpi_data_updates(),
        }
    }
}

/// Parse a multi-KPI response, routing on its `kpiType`.
pub fn parse_multi_kpi_response(value: &Value) -> Result<MultiKpiResponse> {
    let map = as_object(value, "<root>")?;

    match MultiKpiKind::detect(map) {
        Some(MultiKpiKind::Cbbi) => AggregateResponse::from_map(map).map(MultiKpiResponse::Cbbi),
        Some(MultiKpiKind::Cmc) => AggregateResponse::from_map(map).map(MultiKpiResponse::Cmc),
        None => {
            let offending = map
                .get("kpiType")
                .map(display_value)
                .unwrap_or_else(|| "null".to_string());
            Err(UnrecognizedShape::UnknownKpiType(offending).into())
        }
    }
}

pub fn parse_individual_kpi_response(value: &Value) -> Result<IndividualKpiResponse> {
    IndividualKpiResponse::from_map(as_object(value, "<root>")?)
}

/// Parse a response of unknown shape.
///
/// A multi-KPI `kpiType` takes precedence over the presence of `kpiId`.
pub fn parse_kpi_response(value: &Value) -> Result<KpiResponse> {
    let map = as_object(value, "<root>")?;

    match MultiKpiKind::detect(map) {
        Some(_) => parse_multi_kpi_response(value).map(KpiResponse::from),
        None if map.contains_key("kpiId") => {
            IndividualKpiResponse::from_map(map).map(KpiResponse::Individual)
        }
        None => Err(SchemaError::from(UnrecognizedShape::Indeterminate)),
    }
}

/// Parse an error response of any structure.
pub fn parse_error_response(value: &Value) -> Result<KpiErrorUpdate> {
    KpiErrorUpdate::from_value(value)
}
