//! Reliability Scoring Engine
//!
//! Pure aggregation over already-fetched rows: no I/O, no shared state,
//! no randomness. Both operations are single-pass and deterministic, so
//! callers may recompute freely per request.
//!
//! Smoothing: empirical rates are blended with a fixed prior so that
//! models with one or two registered vehicles don't swing to 0% or 100%
//! off a single report.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::registry::types::FaultCategory;

/// Prior blended into every score; a model nobody has reported on sits
/// near 95%, not at a meaningless 100%
pub const PRIOR_SCORE: f64 = 0.95;
/// Pseudo-count weighting the prior against observed vehicles/reports
pub const PRIOR_COUNT: f64 = 5.0;

/// A vehicle row as consumed by the scorer: the joined
/// `vehicles + fault_reports` shape, already typed by ingest.
#[derive(Debug, Clone)]
pub struct VehicleRecord {
    pub id: u64,
    pub brand: String,
    pub model: String,
    pub fault_reports: Vec<FaultRecord>,
}

#[derive(Debug, Clone)]
pub struct FaultRecord {
    pub id: u64,
    pub is_verified: bool,
    pub category_id: Option<u32>,
}

/// One ranked entry of the model-level reliability report
#[derive(Debug, Clone, Serialize)]
pub struct ModelReliability {
    pub brand: String,
    pub model: String,
    pub vehicle_count: u64,
    pub verified_faults: u64,
    pub reliability_score: f64,
}

/// Score vehicles grouped by brand+model, ranked best first.
///
/// Grouping key is the case-sensitive concatenation `"{brand}-{model}"`,
/// exactly as supplied (no trimming). Empty brand or model strings are
/// valid keys.
///
/// Per group:
///   score = (PRIOR_COUNT * PRIOR_SCORE + (vehicle_count - verified_faults))
///           / (vehicle_count + PRIOR_COUNT)
///
/// `verified_faults` counts reports, not affected vehicles, so it may
/// exceed `vehicle_count` and push the numerator negative. The formula is
/// applied as-is, without clamping: clamping would silently reorder the
/// ranking for heavily-reported models.
///
/// Sort is stable descending by score; tied groups keep the order in
/// which they were first seen in the input.
pub fn score_by_model(vehicles: &[VehicleRecord]) -> Vec<ModelReliability> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, ModelReliability> = HashMap::new();

    for vehicle in vehicles {
        let key = format!("{}-{}", vehicle.brand, vehicle.model);

        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            ModelReliability {
                brand: vehicle.brand.clone(),
                model: vehicle.model.clone(),
                vehicle_count: 0,
                verified_faults: 0,
                reliability_score: 0.0,
            }
        });

        entry.vehicle_count += 1;
        entry.verified_faults += vehicle
            .fault_reports
            .iter()
            .filter(|f| f.is_verified)
            .count() as u64;
    }

    let mut ranked = Vec::with_capacity(order.len());
    for key in order {
        if let Some(mut group) = groups.remove(&key) {
            let vehicles = group.vehicle_count as f64;
            let faults = group.verified_faults as f64;
            group.reliability_score =
                (PRIOR_COUNT * PRIOR_SCORE + (vehicles - faults)) / (vehicles + PRIOR_COUNT);
            ranked.push(group);
        }
    }

    // Vec::sort_by is stable: equal scores keep first-encounter order
    ranked.sort_by(|a, b| b.reliability_score.total_cmp(&a.reliability_score));
    ranked
}

/// Score fault categories for a single vehicle (or any pre-filtered
/// report set). Callers supply reports already restricted to verified,
/// origin-known ones; reports without a category are skipped here as a
/// boundary guard.
///
/// Per reference category:
///   count > 0  =>  score = (PRIOR_SCORE * PRIOR_COUNT) / (PRIOR_COUNT + count)
///   count == 0 =>  score = 1.0 (no recorded faults: treated as perfectly reliable)
///
/// This is deliberately a different formula from `score_by_model` (no
/// vehicle denominator exists at category level) and must not be unified
/// with it. Every category in the reference list appears in the output.
pub fn score_by_category(
    reports: &[FaultRecord],
    categories: &[FaultCategory],
) -> BTreeMap<u32, f64> {
    let mut counts: HashMap<u32, u64> = HashMap::new();
    for report in reports {
        if let Some(category_id) = report.category_id {
            *counts.entry(category_id).or_insert(0) += 1;
        }
    }

    categories
        .iter()
        .map(|category| {
            let count = counts.get(&category.id).copied().unwrap_or(0);
            let score = if count > 0 {
                (PRIOR_SCORE * PRIOR_COUNT) / (PRIOR_COUNT + count as f64)
            } else {
                1.0
            };
            (category.id, score)
        })
        .collect()
}

/// Map a score to a display band (thresholds match the frontend bar colors)
pub fn score_to_band(score: f64) -> &'static str {
    let pct = score * 100.0;
    match pct {
        p if p >= 100.0 => "excellent",
        p if p >= 80.0 => "good",
        p if p >= 50.0 => "fair",
        _ => "poor",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(id: u64, brand: &str, model: &str, verified: usize, unverified: usize) -> VehicleRecord {
        let mut fault_reports = Vec::new();
        for i in 0..verified {
            fault_reports.push(FaultRecord {
                id: id * 100 + i as u64,
                is_verified: true,
                category_id: Some(1),
            });
        }
        for i in 0..unverified {
            fault_reports.push(FaultRecord {
                id: id * 100 + 50 + i as u64,
                is_verified: false,
                category_id: Some(1),
            });
        }
        VehicleRecord {
            id,
            brand: brand.to_string(),
            model: model.to_string(),
            fault_reports,
        }
    }

    fn category(id: u32, name: &str) -> FaultCategory {
        FaultCategory {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_input_yields_empty_report() {
        assert!(score_by_model(&[]).is_empty());
    }

    #[test]
    fn test_single_vehicle_no_faults() {
        // (5*0.95 + (1-0)) / (1+5) = 5.75/6
        let report = score_by_model(&[vehicle(1, "Toyota", "Corolla", 0, 0)]);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].vehicle_count, 1);
        assert_eq!(report[0].verified_faults, 0);
        assert!(
            (report[0].reliability_score - 5.75 / 6.0).abs() < 1e-12,
            "got {}",
            report[0].reliability_score
        );
    }

    #[test]
    fn test_two_vehicles_one_verified_fault() {
        // (5*0.95 + (2-1)) / (2+5) = 5.75/7
        let report = score_by_model(&[
            vehicle(1, "Toyota", "Corolla", 1, 0),
            vehicle(2, "Toyota", "Corolla", 0, 0),
        ]);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].vehicle_count, 2);
        assert_eq!(report[0].verified_faults, 1);
        assert!((report[0].reliability_score - 5.75 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_unverified_faults_never_count() {
        let report = score_by_model(&[vehicle(1, "Seat", "Ibiza", 0, 7)]);
        assert_eq!(report[0].verified_faults, 0);
        assert!((report[0].reliability_score - 5.75 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_grouping_is_case_sensitive() {
        let report = score_by_model(&[
            vehicle(1, "Toyota", "Corolla", 0, 0),
            vehicle(2, "toyota", "Corolla", 0, 0),
            vehicle(3, "Toyota", "Corolla", 0, 0),
        ]);
        assert_eq!(report.len(), 2, "one differing character is a distinct group");
        let toyota = report
            .iter()
            .find(|m| m.brand == "Toyota")
            .expect("Toyota group missing");
        assert_eq!(toyota.vehicle_count, 2);
    }

    #[test]
    fn test_empty_brand_is_a_valid_key() {
        let report = score_by_model(&[vehicle(1, "", "", 0, 0)]);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].brand, "");
    }

    #[test]
    fn test_ranked_descending() {
        let report = score_by_model(&[
            vehicle(1, "Alfa Romeo", "156", 3, 0),
            vehicle(2, "Toyota", "Corolla", 0, 0),
            vehicle(3, "Renault", "Clio", 1, 0),
        ]);
        assert_eq!(report[0].brand, "Toyota");
        assert_eq!(report[1].brand, "Renault");
        assert_eq!(report[2].brand, "Alfa Romeo");
        for pair in report.windows(2) {
            assert!(pair[0].reliability_score >= pair[1].reliability_score);
        }
    }

    #[test]
    fn test_ties_keep_first_encounter_order() {
        // Identical shapes score identically; input order must survive
        let report = score_by_model(&[
            vehicle(1, "Honda", "Civic", 1, 0),
            vehicle(2, "Mazda", "3", 1, 0),
            vehicle(3, "Kia", "Ceed", 1, 0),
        ]);
        assert_eq!(report[0].brand, "Honda");
        assert_eq!(report[1].brand, "Mazda");
        assert_eq!(report[2].brand, "Kia");
    }

    #[test]
    fn test_idempotent_including_order() {
        let input = vec![
            vehicle(1, "Opel", "Corsa", 2, 1),
            vehicle(2, "Opel", "Corsa", 0, 0),
            vehicle(3, "Fiat", "Panda", 1, 0),
        ];
        let a = score_by_model(&input);
        let b = score_by_model(&input);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.brand, y.brand);
            assert_eq!(x.model, y.model);
            assert_eq!(x.reliability_score.to_bits(), y.reliability_score.to_bits());
        }
    }

    #[test]
    fn test_negative_numerator_not_clamped() {
        // 1 vehicle, 20 verified reports: (4.75 + (1-20)) / 6 < 0
        let report = score_by_model(&[vehicle(1, "Lada", "Niva", 20, 0)]);
        let expected = (PRIOR_COUNT * PRIOR_SCORE + (1.0 - 20.0)) / (1.0 + PRIOR_COUNT);
        assert!(report[0].reliability_score < 0.0, "clamping would reorder rankings");
        assert!((report[0].reliability_score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_score_matches_formula_reevaluation() {
        let report = score_by_model(&[
            vehicle(1, "Ford", "Focus", 1, 2),
            vehicle(2, "Ford", "Focus", 3, 0),
            vehicle(3, "Ford", "Fiesta", 0, 0),
        ]);
        for entry in &report {
            let v = entry.vehicle_count as f64;
            let f = entry.verified_faults as f64;
            let expected = (PRIOR_COUNT * PRIOR_SCORE + (v - f)) / (v + PRIOR_COUNT);
            assert!((entry.reliability_score - expected).abs() < 1e-12);
            assert!(entry.reliability_score <= (PRIOR_COUNT * PRIOR_SCORE + v) / (v + PRIOR_COUNT));
        }
    }

    #[test]
    fn test_category_absent_scores_exactly_one() {
        let categories = vec![category(1, "Motor"), category(2, "Frenos")];
        let scores = score_by_category(&[], &categories);
        assert_eq!(scores.get(&1), Some(&1.0));
        assert_eq!(scores.get(&2), Some(&1.0));
    }

    #[test]
    fn test_category_with_reports() {
        // 2 reports for Frenos: 4.75/7; Motor untouched: 1.0
        let categories = vec![category(1, "Motor"), category(2, "Frenos")];
        let reports = vec![
            FaultRecord { id: 1, is_verified: true, category_id: Some(2) },
            FaultRecord { id: 2, is_verified: true, category_id: Some(2) },
        ];
        let scores = score_by_category(&reports, &categories);
        assert_eq!(scores.get(&1), Some(&1.0));
        let frenos = scores.get(&2).copied().expect("Frenos missing");
        assert!((frenos - 4.75 / 7.0).abs() < 1e-12, "got {}", frenos);
    }

    #[test]
    fn test_category_scores_stay_in_unit_interval() {
        let categories = vec![category(1, "Motor")];
        let reports: Vec<FaultRecord> = (0..500)
            .map(|i| FaultRecord { id: i, is_verified: true, category_id: Some(1) })
            .collect();
        let scores = score_by_category(&reports, &categories);
        let motor = scores.get(&1).copied().expect("Motor missing");
        assert!(motor > 0.0 && motor < 1.0);
    }

    #[test]
    fn test_uncategorized_reports_are_skipped() {
        let categories = vec![category(1, "Motor")];
        let reports = vec![FaultRecord { id: 1, is_verified: true, category_id: None }];
        let scores = score_by_category(&reports, &categories);
        assert_eq!(scores.get(&1), Some(&1.0));
    }

    #[test]
    fn test_unknown_category_ids_not_in_output() {
        let categories = vec![category(1, "Motor")];
        let reports = vec![FaultRecord { id: 1, is_verified: true, category_id: Some(99) }];
        let scores = score_by_category(&reports, &categories);
        assert_eq!(scores.len(), 1);
        assert!(!scores.contains_key(&99));
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(score_to_band(1.0), "excellent");
        assert_eq!(score_to_band(0.9583), "good");
        assert_eq!(score_to_band(0.55), "fair");
        assert_eq!(score_to_band(0.2), "poor");
        assert_eq!(score_to_band(-0.5), "poor");
    }
}
