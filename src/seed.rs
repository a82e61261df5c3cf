use serde::Deserialize;
use tracing::warn;

use crate::registry::engine::RegistryEngine;
use crate::registry::types::{NewFault, NewVehicle};

/// Seed data loader
///
/// Replaces the hosted database rows for local runs: a JSON file of
/// vehicles, each with optional fault entries, loaded into the store at
/// startup. Verified seed faults go through the same report-then-verify
/// path the API uses.
#[derive(Debug, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub vehicles: Vec<SeedVehicle>,
}

#[derive(Debug, Deserialize)]
pub struct SeedVehicle {
    #[serde(flatten)]
    pub vehicle: NewVehicle,
    #[serde(default)]
    pub faults: Vec<SeedFault>,
}

#[derive(Debug, Deserialize)]
pub struct SeedFault {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub category_id: Option<u32>,
}

/// Load a seed file into the engine. Returns the number of vehicles loaded.
pub fn load(engine: &RegistryEngine, path: &str) -> anyhow::Result<usize> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", path, e))?;
    let data: SeedData = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", path, e))?;
    load_data(engine, data)
}

pub fn load_data(engine: &RegistryEngine, data: SeedData) -> anyhow::Result<usize> {
    let mut loaded = 0;
    for seed_vehicle in data.vehicles {
        let vehicle = engine.add_vehicle(seed_vehicle.vehicle)?;
        loaded += 1;

        for fault in seed_vehicle.faults {
            let report = match engine.report_fault(
                vehicle.id,
                NewFault {
                    description: fault.description,
                    category_id: fault.category_id,
                },
            ) {
                Some(r) => r,
                None => {
                    warn!("Seed fault dropped, vehicle #{} vanished mid-load", vehicle.id);
                    continue;
                }
            };
            if fault.is_verified {
                engine.verify_fault(report.id);
            }
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::Arc;

    #[test]
    fn test_seed_round_trip_through_engine() {
        let engine = RegistryEngine::new(Arc::new(Config::default())).unwrap();
        let data: SeedData = serde_json::from_value(serde_json::json!({
            "vehicles": [
                {
                    "brand": "Toyota",
                    "model": "Corolla",
                    "year": 2018,
                    "faults": [
                        { "description": "frenos", "is_verified": true, "category_id": 2 },
                        { "description": "ruido", "is_verified": false, "category_id": 1 }
                    ]
                },
                { "brand": "Toyota", "model": "Corolla" }
            ]
        }))
        .unwrap();

        let loaded = load_data(&engine, data).unwrap();
        assert_eq!(loaded, 2);

        let report = engine.reliability_report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].vehicle_count, 2);
        assert_eq!(report[0].verified_faults, 1, "only the verified seed fault counts");
    }

    #[test]
    fn test_empty_seed_is_fine() {
        let engine = RegistryEngine::new(Arc::new(Config::default())).unwrap();
        let data: SeedData = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(load_data(&engine, data).unwrap(), 0);
    }
}
