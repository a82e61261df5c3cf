use serde::Deserialize;

use crate::scoring::{FaultRecord, VehicleRecord};

/// Ingest boundary for externally-fetched rows
///
/// The upstream fetch returns loosely-typed joined rows (the
/// `vehicles + fault_reports` nested-select shape). Everything is typed
/// here, once, before the scorer sees it: missing brand/model become
/// empty strings, missing report lists become empty, and a null
/// `category_id` survives as `None` (origin unknown).
#[derive(Debug, Clone, Deserialize)]
pub struct RawVehicleRow {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub fault_reports: Vec<RawFaultRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFaultRow {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub category_id: Option<u32>,
}

/// Type a batch of raw rows for scoring
pub fn type_rows(rows: Vec<RawVehicleRow>) -> Vec<VehicleRecord> {
    rows.into_iter()
        .map(|row| VehicleRecord {
            id: row.id,
            brand: row.brand,
            model: row.model,
            fault_reports: row
                .fault_reports
                .into_iter()
                .map(|f| FaultRecord {
                    id: f.id,
                    is_verified: f.is_verified,
                    category_id: f.category_id,
                })
                .collect(),
        })
        .collect()
}

/// Parse a JSON array of joined rows (seed files, tests, external dumps)
pub fn parse_rows(value: serde_json::Value) -> anyhow::Result<Vec<VehicleRecord>> {
    let raw: Vec<RawVehicleRow> = serde_json::from_value(value)
        .map_err(|e| anyhow::anyhow!("Malformed vehicle rows: {}", e))?;
    Ok(type_rows(raw))
}
