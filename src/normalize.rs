//! Fan-out of aggregate multi-KPI responses into canonical single-KPI updates.
//!
//! A data source such as CBBI or CoinMarketCap answers one trigger with a
//! single payload carrying several KPI values. Ingestion only understands
//! [`KpiDataUpdate`], so every aggregate is expanded into one update per
//! requested KPI id.
//!
//! To add a new aggregate source:
//!
//! 1. Define a struct with one `Option<f64>` per metric, deriving serde with
//!    `rename_all = "kebab-case"`
//! 2. Implement [`AggregateData`] for it
//! 3. Add a variant to `MultiKpiKind` and `MultiKpiResponse`
//!
//! Normalization is permissive: ids with no matching value are skipped and
//! missing metrics are read as `0.0`. Partially populated aggregates degrade
//! instead of failing the whole batch.

use crate::error::{Result, SchemaError};
use crate::schemas::core::KpiDataUpdate;
use crate::schemas::responses::AggregateResponse;
use crate::utils::fields::JsonMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// A source-shaped record of named metrics with external hyphenated keys.
///
/// Implementors derive serde with `rename_all = "kebab-case"` so field names
/// map onto the external keys listed in `KPI_IDS`.
pub trait AggregateData: Serialize + DeserializeOwned {
    /// The `kpiType` literal identifying responses of this source.
    const KPI_TYPE: &'static str;

    /// External keys of every metric, in declaration order.
    const KPI_IDS: &'static [&'static str];

    /// Serialize to the external key form, e.g. `{"cbbi-rhodl": 0.75, ..}`.
    /// Metrics without a value come out as `null`.
    fn to_external_map(&self) -> JsonMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => JsonMap::new(),
        }
    }
}

/// Build an aggregate from its external key form.
///
/// An absent metric defaults to `0.0`. A metric that is present but `null` or
/// not a number has no value and is skipped during fan-out.
pub(crate) fn read_aggregate<D: AggregateData>(raw: &JsonMap) -> Result<D> {
    for key in D::KPI_IDS {
        match raw.get(*key) {
            None => debug!(metric = key, "metric missing from aggregate, defaulting to 0.0"),
            Some(Value::Number(_)) => {}
            Some(other) => debug!(metric = key, %other, "metric has no numeric value"),
        }
    }

    serde_json::from_value(Value::Object(raw.clone()))
        .map_err(|e| SchemaError::invalid("data", e.to_string()))
}

/// Field deserializer for aggregate metrics: anything but a number is `None`.
pub(crate) fn lenient_metric<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_f64())
}

/// Expand an aggregate response into one update per listed KPI id.
///
/// Returns an empty list when the response has no data or no KPI ids. Every
/// emitted update shares the response's trace id, timestamp, kpi type,
/// metadata and full KPI id list; only `data` differs.
pub fn fan_out<D: AggregateData>(response: &AggregateResponse<D>) -> Vec<KpiDataUpdate> {
    let (Some(data), Some(kpi_ids)) = (&response.data, &response.kpi_ids) else {
        return Vec::new();
    };

    let values = data.to_external_map();

    kpi_ids
        .iter()
        .filter_map(|kpi_id| {
            let value = values.get(kpi_id).filter(|v| !v.is_null());
            if value.is_none() {
                debug!(
                    trace_id = %response.trace_id,
                    kpi_id = %kpi_id,
                    kpi_type = D::KPI_TYPE,
                    "no value for requested KPI, skipping"
                );
            }
            let value = value?.clone();

            let mut payload = JsonMap::new();
            payload.insert("value".into(), value);

            Some(KpiDataUpdate {
                trace_id: response.trace_id.clone(),
                kpi_id: kpi_id.clone(),
                timestamp: response.timestamp.clone(),
                kpi_type: D::KPI_TYPE.to_string(),
                data: payload,
                kpi_ids: Some(kpi_ids.clone()),
                chart: None,
                metadata: response.metadata.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::responses::{CbbiData, CbbiMultiKpiResponse, CmcData, CmcMultiKpiResponse};
    use serde_json::json;

    fn cbbi(kpi_ids: Option<Vec<&str>>) -> CbbiMultiKpiResponse {
        CbbiMultiKpiResponse {
            trace_id: "trace_123".into(),
            timestamp: "2025-08-14T14:30:22Z".into(),
            kpi_ids: kpi_ids.map(|ids| ids.into_iter().map(String::from).collect()),
            data: Some(CbbiData {
                cbbi_btc_price_usd: Some(45000.0),
                cbbi_rhodl: Some(0.75),
                cbbi_mvrv: Some(0.65),
                cbbi_confidence: Some(0.80),
            }),
            metadata: json!({"source": "cbbi"}).as_object().cloned(),
        }
    }

    #[test]
    fn test_fan_out_one_update_per_id() {
        let response = cbbi(Some(vec!["cbbi-rhodl", "cbbi-mvrv"]));
        let updates = fan_out(&response);

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].kpi_id, "cbbi-rhodl");
        assert_eq!(updates[0].data, *json!({"value": 0.75}).as_object().unwrap());
        assert_eq!(updates[1].kpi_id, "cbbi-mvrv");
        assert_eq!(updates[1].data, *json!({"value": 0.65}).as_object().unwrap());

        for update in &updates {
            assert_eq!(
                update.kpi_ids.as_deref(),
                Some(&["cbbi-rhodl".to_string(), "cbbi-mvrv".to_string()][..])
            );
            assert_eq!(update.trace_id, "trace_123");
            assert_eq!(update.timestamp, "2025-08-14T14:30:22Z");
            assert_eq!(update.kpi_type, "cbbi-multi");
            assert_eq!(update.metadata, response.metadata);
            assert!(update.validate().is_ok());
        }
    }

    #[test]
    fn test_fan_out_preserves_declared_order() {
        let response = cbbi(Some(vec![
            "cbbi-confidence",
            "cbbi-btc-price-usd",
            "cbbi-mvrv",
            "cbbi-rhodl",
        ]));
        let ids: Vec<String> = fan_out(&response).into_iter().map(|u| u.kpi_id).collect();
        assert_eq!(
            ids,
            ["cbbi-confidence", "cbbi-btc-price-usd", "cbbi-mvrv", "cbbi-rhodl"]
        );
    }

    #[test]
    fn test_fan_out_skips_unknown_ids() {
        let response = cbbi(Some(vec!["cbbi-rhodl", "cbbi-puell", "cbbi-mvrv"]));
        let updates = fan_out(&response);

        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.kpi_id != "cbbi-puell"));
        // The full requested list still travels with every record.
        assert_eq!(updates[0].kpi_ids.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_fan_out_without_ids_or_data_is_empty() {
        assert!(fan_out(&cbbi(None)).is_empty());
        assert!(fan_out(&cbbi(Some(vec![]))).is_empty());

        let mut no_data = cbbi(Some(vec!["cbbi-rhodl"]));
        no_data.data = None;
        assert!(fan_out(&no_data).is_empty());
    }

    #[test]
    fn test_fan_out_cmc() {
        let response = CmcMultiKpiResponse {
            trace_id: "trace_456".into(),
            timestamp: "2025-08-14T14:30:22Z".into(),
            kpi_ids: Some(CmcData::KPI_IDS.iter().map(|s| s.to_string()).collect()),
            data: Some(CmcData {
                cmc_btc_dominance: Some(42.5),
                cmc_eth_dominance: Some(18.3),
                cmc_totalmarketcap_usd: Some(2.5e12),
                cmc_stablecoinmarketcap_usd: Some(1.5e11),
            }),
            metadata: None,
        };

        let updates = fan_out(&response);
        assert_eq!(updates.len(), 4);
        assert_eq!(updates[2].kpi_id, "cmc-totalmarketcap-usd");
        assert_eq!(updates[2].data["value"], 2.5e12);
        assert!(updates.iter().all(|u| u.kpi_type == "cmc-multi"));
        assert!(updates.iter().all(|u| u.metadata.is_none()));
    }

    #[test]
    fn test_null_metric_is_skipped_not_zeroed() {
        let mut response = cbbi(Some(vec!["cbbi-btc-price-usd", "cbbi-rhodl"]));
        response.data = Some(
            read_aggregate(
                json!({"cbbi-btc-price-usd": null, "cbbi-rhodl": 0.75, "cbbi-mvrv": 0.65})
                    .as_object()
                    .unwrap(),
            )
            .unwrap(),
        );

        let updates = fan_out(&response);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].kpi_id, "cbbi-rhodl");
        assert_eq!(updates[0].data["value"], 0.75);
    }

    #[test]
    fn test_read_aggregate_defaults_only_absent_metrics() {
        let raw = json!({"cbbi-rhodl": 0.5, "cbbi-mvrv": "high", "cbbi-confidence": null});
        let data: CbbiData = read_aggregate(raw.as_object().unwrap()).unwrap();

        assert_eq!(data.cbbi_rhodl, Some(0.5));
        assert_eq!(data.cbbi_mvrv, None);
        assert_eq!(data.cbbi_confidence, None);
        assert_eq!(data.cbbi_btc_price_usd, Some(0.0));

        assert_eq!(
            Value::Object(data.to_external_map()),
            json!({
                "cbbi-btc-price-usd": 0.0,
                "cbbi-rhodl": 0.5,
                "cbbi-mvrv": null,
                "cbbi-confidence": null
            })
        );
    }
}
