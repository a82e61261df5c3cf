use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use crate::config::StoreConfig;
use crate::registry::types::{FaultReport, NewFault, NewVehicle, Vehicle};
use crate::scoring::{FaultRecord, VehicleRecord};

/// In-memory registry store
///
/// Holds vehicles and fault reports for the lifetime of the process.
/// Scoring never reads the maps directly; it works on a joined snapshot
/// taken with `scoring_rows()`, so a compute pass sees a consistent,
/// read-only input even while the API keeps mutating the store.
pub struct RegistryStore {
    vehicles: DashMap<u64, Vehicle>,
    faults: DashMap<u64, FaultReport>,
    config: StoreConfig,
    next_vehicle_id: AtomicU64,
    next_fault_id: AtomicU64,
    // Stats
    vehicles_added: AtomicU64,
    vehicles_removed: AtomicU64,
    faults_reported: AtomicU64,
    faults_verified: AtomicU64,
}

impl RegistryStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            vehicles: DashMap::new(),
            faults: DashMap::new(),
            config: config.clone(),
            next_vehicle_id: AtomicU64::new(1),
            next_fault_id: AtomicU64::new(1),
            vehicles_added: AtomicU64::new(0),
            vehicles_removed: AtomicU64::new(0),
            faults_reported: AtomicU64::new(0),
            faults_verified: AtomicU64::new(0),
        }
    }

    /// Register a vehicle. Fails only when the store is at capacity.
    pub fn add_vehicle(&self, new: NewVehicle) -> anyhow::Result<Vehicle> {
        if self.vehicles.len() >= self.config.max_vehicles {
            return Err(anyhow::anyhow!(
                "Vehicle capacity reached ({} max)",
                self.config.max_vehicles
            ));
        }

        let id = self.next_vehicle_id.fetch_add(1, Ordering::Relaxed);
        let vehicle = Vehicle {
            id,
            kind: new.kind,
            brand: new.brand,
            model: new.model,
            year: new.year,
            displacement_cc: new.displacement_cc,
            power_cv: new.power_cv,
            fuel: new.fuel,
            transmission: new.transmission,
            created_at: Utc::now(),
        };

        debug!("Vehicle #{} registered: {} {}", id, vehicle.brand, vehicle.model);
        self.vehicles.insert(id, vehicle.clone());
        self.vehicles_added.fetch_add(1, Ordering::Relaxed);
        Ok(vehicle)
    }

    pub fn get_vehicle(&self, id: u64) -> Option<Vehicle> {
        self.vehicles.get(&id).map(|v| v.value().clone())
    }

    /// All vehicles, ordered by id for a stable API surface
    pub fn list_vehicles(&self) -> Vec<Vehicle> {
        let mut vehicles: Vec<Vehicle> =
            self.vehicles.iter().map(|v| v.value().clone()).collect();
        vehicles.sort_by_key(|v| v.id);
        vehicles
    }

    /// Remove a vehicle and cascade to its fault reports
    pub fn remove_vehicle(&self, id: u64) -> Option<Vehicle> {
        let (_, vehicle) = self.vehicles.remove(&id)?;
        self.faults.retain(|_, f| f.vehicle_id != id);
        self.vehicles_removed.fetch_add(1, Ordering::Relaxed);
        Some(vehicle)
    }

    /// Report a fault against a vehicle. `None` when the vehicle is unknown.
    pub fn add_fault(&self, vehicle_id: u64, new: NewFault) -> Option<FaultReport> {
        if !self.vehicles.contains_key(&vehicle_id) {
            return None;
        }

        let id = self.next_fault_id.fetch_add(1, Ordering::Relaxed);
        let report = FaultReport {
            id,
            vehicle_id,
            description: new.description,
            is_verified: false,
            category_id: new.category_id,
            reported_at: Utc::now(),
        };

        self.faults.insert(id, report.clone());
        self.faults_reported.fetch_add(1, Ordering::Relaxed);
        Some(report)
    }

    /// Flip the moderation flag on a report
    pub fn verify_fault(&self, id: u64) -> Option<FaultReport> {
        let mut entry = self.faults.get_mut(&id)?;
        if !entry.is_verified {
            entry.is_verified = true;
            self.faults_verified.fetch_add(1, Ordering::Relaxed);
        }
        Some(entry.clone())
    }

    /// Fault reports for one vehicle, ordered by id
    pub fn faults_for(&self, vehicle_id: u64) -> Vec<FaultReport> {
        let mut reports: Vec<FaultReport> = self
            .faults
            .iter()
            .filter(|f| f.vehicle_id == vehicle_id)
            .map(|f| f.value().clone())
            .collect();
        reports.sort_by_key(|f| f.id);
        reports
    }

    /// Snapshot of joined `vehicles + fault_reports` rows for a scoring
    /// pass. Ordered by vehicle id so group encounter order (and thus
    /// tie-breaking in the ranking) is deterministic.
    pub fn scoring_rows(&self) -> Vec<VehicleRecord> {
        let mut rows: Vec<VehicleRecord> = self
            .vehicles
            .iter()
            .map(|v| VehicleRecord {
                id: v.id,
                brand: v.brand.clone(),
                model: v.model.clone(),
                fault_reports: Vec::new(),
            })
            .collect();
        rows.sort_by_key(|r| r.id);

        let index: std::collections::HashMap<u64, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();

        let mut reports: Vec<FaultReport> = self.faults.iter().map(|f| f.value().clone()).collect();
        reports.sort_by_key(|f| f.id);
        for report in reports {
            if let Some(&i) = index.get(&report.vehicle_id) {
                rows[i].fault_reports.push(FaultRecord {
                    id: report.id,
                    is_verified: report.is_verified,
                    category_id: report.category_id,
                });
            }
        }

        rows
    }

    /// Store stats for the API / dashboard
    pub fn get_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "vehicles": self.vehicles.len(),
            "max_vehicles": self.config.max_vehicles,
            "fault_reports": self.faults.len(),
            "vehicles_added": self.vehicles_added.load(Ordering::Relaxed),
            "vehicles_removed": self.vehicles_removed.load(Ordering::Relaxed),
            "faults_reported": self.faults_reported.load(Ordering::Relaxed),
            "faults_verified": self.faults_verified.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> RegistryStore {
        RegistryStore::new(&StoreConfig { max_vehicles: 3 })
    }

    fn new_vehicle(brand: &str, model: &str) -> NewVehicle {
        serde_json::from_value(serde_json::json!({ "brand": brand, "model": model })).unwrap()
    }

    #[test]
    fn test_add_and_list() {
        let store = test_store();
        store.add_vehicle(new_vehicle("Toyota", "Corolla")).unwrap();
        store.add_vehicle(new_vehicle("Seat", "Ibiza")).unwrap();
        let vehicles = store.list_vehicles();
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].brand, "Toyota");
        assert!(vehicles[0].id < vehicles[1].id);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let store = test_store();
        for i in 0..3 {
            store.add_vehicle(new_vehicle("Brand", &format!("M{}", i))).unwrap();
        }
        assert!(store.add_vehicle(new_vehicle("Brand", "M3")).is_err());
    }

    #[test]
    fn test_fault_against_unknown_vehicle() {
        let store = test_store();
        let fault = store.add_fault(42, NewFault { description: "ruido".into(), category_id: None });
        assert!(fault.is_none());
    }

    #[test]
    fn test_verify_is_idempotent_on_counter() {
        let store = test_store();
        let v = store.add_vehicle(new_vehicle("Opel", "Corsa")).unwrap();
        let f = store
            .add_fault(v.id, NewFault { description: "no arranca".into(), category_id: Some(6) })
            .unwrap();
        assert!(!f.is_verified);
        store.verify_fault(f.id).unwrap();
        store.verify_fault(f.id).unwrap();
        let stats = store.get_stats();
        assert_eq!(stats["faults_verified"], 1);
    }

    #[test]
    fn test_remove_cascades_to_faults() {
        let store = test_store();
        let v = store.add_vehicle(new_vehicle("Fiat", "Panda")).unwrap();
        store
            .add_fault(v.id, NewFault { description: "embrague".into(), category_id: Some(3) })
            .unwrap();
        assert_eq!(store.faults_for(v.id).len(), 1);
        store.remove_vehicle(v.id).unwrap();
        assert!(store.faults_for(v.id).is_empty());
        assert!(store.scoring_rows().is_empty());
    }

    #[test]
    fn test_scoring_rows_join_shape() {
        let store = test_store();
        let a = store.add_vehicle(new_vehicle("Toyota", "Corolla")).unwrap();
        let b = store.add_vehicle(new_vehicle("Toyota", "Corolla")).unwrap();
        let f = store
            .add_fault(a.id, NewFault { description: "frenos".into(), category_id: Some(2) })
            .unwrap();
        store.verify_fault(f.id).unwrap();

        let rows = store.scoring_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, a.id);
        assert_eq!(rows[0].fault_reports.len(), 1);
        assert!(rows[0].fault_reports[0].is_verified);
        assert_eq!(rows[1].id, b.id);
        assert!(rows[1].fault_reports.is_empty());
    }
}
