//! Data contracts for KPI collection workflows.
//!
//! Workflows answer triggers with either a single-KPI response, a multi-KPI
//! aggregate, or an error of arbitrary shape. This crate parses all three into
//! typed records, fans aggregates out into canonical [`KpiDataUpdate`]s, and
//! ships a validator that checks live webhooks against the contract.

pub mod config;
mod error;
pub mod normalize;
pub mod schemas;
mod utils;
pub mod validator;

pub use error::{Result, SchemaError, UnrecognizedShape};
pub use schemas::core::{ChartInfo, KpiDataUpdate, KpiErrorUpdate};
pub use schemas::responses::{
    parse_error_response, parse_individual_kpi_response, parse_kpi_response,
    parse_multi_kpi_response, CbbiData, CbbiMultiKpiResponse, CmcData, CmcMultiKpiResponse,
    IndividualKpiResponse, KpiResponse, MultiKpiKind, MultiKpiResponse,
};
pub use utils::fields::JsonMap;
