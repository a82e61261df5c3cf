use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::BrandCatalog;
use crate::config::Config;
use crate::journal::Journal;
use crate::registry::types::{
    default_categories, FaultCategory, FaultReport, NewFault, NewVehicle, Vehicle,
};
use crate::scoring::{self, ModelReliability};
use crate::store::RegistryStore;

/// One category row of a per-vehicle reliability breakdown
#[derive(Debug, Clone, Serialize)]
pub struct CategoryScore {
    pub category_id: u32,
    pub name: String,
    pub report_count: u64,
    pub score: f64,
}

/// Core registry engine - owns the store, catalog, category reference
/// set, journal, and the ranking snapshot the background loop refreshes.
pub struct RegistryEngine {
    pub config: Arc<Config>,
    pub store: Arc<RegistryStore>,
    pub catalog: Arc<BrandCatalog>,
    pub journal: Arc<Journal>,
    categories: Vec<FaultCategory>,
    ranking: RwLock<Vec<ModelReliability>>,
    ranking_refreshes: std::sync::atomic::AtomicU64,
}

impl RegistryEngine {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let store = Arc::new(RegistryStore::new(&config.store));
        let journal = Arc::new(Journal::new(&config.journal));

        let catalog = match &config.catalog.path {
            Some(path) => Arc::new(BrandCatalog::load(path)?),
            None => {
                let builtin = BrandCatalog::builtin();
                info!("No catalog path configured, using built-in set ({} brands)", builtin.len());
                Arc::new(builtin)
            }
        };

        Ok(Self {
            config,
            store,
            catalog,
            journal,
            categories: default_categories(),
            ranking: RwLock::new(Vec::new()),
            ranking_refreshes: std::sync::atomic::AtomicU64::new(0),
        })
    }

    pub fn categories(&self) -> &[FaultCategory] {
        &self.categories
    }

    pub fn add_vehicle(&self, new: NewVehicle) -> anyhow::Result<Vehicle> {
        let vehicle = self.store.add_vehicle(new)?;
        self.journal.record(
            "vehicle_added",
            format!("#{} {} {}", vehicle.id, vehicle.brand, vehicle.model),
        );
        Ok(vehicle)
    }

    pub fn remove_vehicle(&self, id: u64) -> Option<Vehicle> {
        let vehicle = self.store.remove_vehicle(id)?;
        self.journal.record(
            "vehicle_removed",
            format!("#{} {} {}", vehicle.id, vehicle.brand, vehicle.model),
        );
        Some(vehicle)
    }

    pub fn report_fault(&self, vehicle_id: u64, new: NewFault) -> Option<FaultReport> {
        let report = self.store.add_fault(vehicle_id, new)?;
        self.journal.record(
            "fault_reported",
            format!("vehicle #{}: {}", vehicle_id, report.description),
        );
        Some(report)
    }

    pub fn verify_fault(&self, fault_id: u64) -> Option<FaultReport> {
        let report = self.store.verify_fault(fault_id)?;
        self.journal.record(
            "fault_verified",
            format!("report #{} on vehicle #{}", report.id, report.vehicle_id),
        );
        Some(report)
    }

    /// The ranked model reliability report, computed fresh from the
    /// current store contents. No incremental state is kept.
    pub fn reliability_report(&self) -> Vec<ModelReliability> {
        scoring::score_by_model(&self.store.scoring_rows())
    }

    /// Per-category reliability breakdown for one vehicle, over its
    /// verified, origin-known reports. `None` when the vehicle is unknown.
    pub fn category_scores(&self, vehicle_id: u64) -> Option<Vec<CategoryScore>> {
        self.store.get_vehicle(vehicle_id)?;

        let reports: Vec<scoring::FaultRecord> = self
            .store
            .faults_for(vehicle_id)
            .into_iter()
            .filter(|f| f.is_verified && f.category_id.is_some())
            .map(|f| scoring::FaultRecord {
                id: f.id,
                is_verified: f.is_verified,
                category_id: f.category_id,
            })
            .collect();

        let scores = scoring::score_by_category(&reports, &self.categories);

        let mut counts: std::collections::HashMap<u32, u64> = std::collections::HashMap::new();
        for report in &reports {
            if let Some(id) = report.category_id {
                *counts.entry(id).or_insert(0) += 1;
            }
        }

        Some(
            self.categories
                .iter()
                .map(|c| CategoryScore {
                    category_id: c.id,
                    name: c.name.clone(),
                    report_count: counts.get(&c.id).copied().unwrap_or(0),
                    score: scores.get(&c.id).copied().unwrap_or(1.0),
                })
                .collect(),
        )
    }

    /// Recompute the ranking snapshot from the current store contents
    pub fn refresh_ranking(&self) {
        let report = self.reliability_report();
        debug!("Ranking refreshed: {} models", report.len());
        *self.ranking.write() = report;
        self.ranking_refreshes
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn ranking_snapshot(&self) -> Vec<ModelReliability> {
        self.ranking.read().clone()
    }

    /// Background refresh loop. Feeds the stats surface only; API reads
    /// of `/api/reliability` always recompute fresh.
    pub async fn run_ranking_loop(&self) {
        let interval_secs = self.config.ranking.refresh_interval_secs.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            self.refresh_ranking();
        }
    }

    /// Aggregated stats for the Web API
    pub fn get_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "store": self.store.get_stats(),
            "journal": self.journal.get_stats(),
            "catalog_brands": self.catalog.len(),
            "categories": self.categories.len(),
            "ranking": {
                "models": self.ranking.read().len(),
                "refreshes": self.ranking_refreshes.load(std::sync::atomic::Ordering::Relaxed),
                "refresh_interval_secs": self.config.ranking.refresh_interval_secs,
            },
        })
    }
}
