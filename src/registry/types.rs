use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vehicle kinds supported by the garage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Car,
    Motorcycle,
}

impl VehicleKind {
    pub fn name(&self) -> &'static str {
        match self {
            VehicleKind::Car => "car",
            VehicleKind::Motorcycle => "motorcycle",
        }
    }
}

/// A registered vehicle
#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    pub id: u64,
    pub kind: VehicleKind,
    pub brand: String,
    pub model: String,
    pub year: u32,
    pub displacement_cc: u32,
    pub power_cv: u32,
    pub fuel: String,
    pub transmission: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for registering a vehicle. Brand and model default to empty
/// strings rather than rejecting the row; whatever string arrives is a
/// valid grouping key downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVehicle {
    #[serde(default = "default_kind")]
    pub kind: VehicleKind,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub displacement_cc: u32,
    #[serde(default)]
    pub power_cv: u32,
    #[serde(default = "default_fuel")]
    pub fuel: String,
    #[serde(default = "default_transmission")]
    pub transmission: String,
}

fn default_kind() -> VehicleKind {
    VehicleKind::Car
}
fn default_fuel() -> String {
    "gasoline".to_string()
}
fn default_transmission() -> String {
    "manual".to_string()
}

/// A fault reported against a vehicle. `is_verified` is flipped by an
/// out-of-band moderation step; only verified reports feed the scoring.
/// `category_id` is nullable: origin-unknown faults carry no category.
#[derive(Debug, Clone, Serialize)]
pub struct FaultReport {
    pub id: u64,
    pub vehicle_id: u64,
    pub description: String,
    pub is_verified: bool,
    pub category_id: Option<u32>,
    pub reported_at: DateTime<Utc>,
}

/// Payload for reporting a fault
#[derive(Debug, Clone, Deserialize)]
pub struct NewFault {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<u32>,
}

/// Static fault-category reference entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultCategory {
    pub id: u32,
    pub name: String,
}

/// Built-in category reference set (the `fault_categories` table of the
/// original deployment)
pub fn default_categories() -> Vec<FaultCategory> {
    [
        (1, "Motor"),
        (2, "Frenos"),
        (3, "Transmisión"),
        (4, "Suspensión"),
        (5, "Dirección"),
        (6, "Sistema eléctrico"),
        (7, "Climatización"),
        (8, "Carrocería"),
        (9, "Neumáticos"),
        (10, "Otros"),
    ]
    .into_iter()
    .map(|(id, name)| FaultCategory {
        id,
        name: name.to_string(),
    })
    .collect()
}
