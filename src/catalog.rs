use serde::{Deserialize, Serialize};
use tracing::info;

/// Brand/model catalog backing the add-vehicle autocomplete
///
/// Loaded once at startup from a JSON file of `{ brand, models[] }`
/// entries, or from a small built-in set when no path is configured.
/// Brand search is a case-insensitive prefix match; an empty query
/// matches nothing (the form shows no suggestions until typed into).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrandEntry {
    pub brand: String,
    pub models: Vec<String>,
}

pub struct BrandCatalog {
    entries: Vec<BrandEntry>,
}

impl BrandCatalog {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read catalog file '{}': {}", path, e))?;
        let entries: Vec<BrandEntry> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse catalog '{}': {}", path, e))?;
        info!("Brand catalog loaded from {} ({} brands)", path, entries.len());
        Ok(Self { entries })
    }

    pub fn builtin() -> Self {
        let entries = [
            ("Toyota", vec!["Corolla", "Yaris", "RAV4", "C-HR"]),
            ("Seat", vec!["Ibiza", "León", "Arona", "Ateca"]),
            ("Renault", vec!["Clio", "Mégane", "Captur"]),
            ("Ford", vec!["Fiesta", "Focus", "Kuga"]),
            ("Opel", vec!["Corsa", "Astra", "Mokka"]),
            ("Fiat", vec!["Panda", "500", "Tipo"]),
            ("Honda", vec!["Civic", "Jazz", "CR-V", "CB500F"]),
            ("Yamaha", vec!["MT-07", "MT-09", "Tracer 7"]),
            ("Kawasaki", vec!["Z650", "Ninja 400", "Versys 650"]),
        ]
        .into_iter()
        .map(|(brand, models)| BrandEntry {
            brand: brand.to_string(),
            models: models.into_iter().map(str::to_string).collect(),
        })
        .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Brands whose name starts with the query, case-insensitively.
    /// Empty or whitespace-only queries return nothing.
    pub fn search_brands(&self, query: &str) -> Vec<String> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.brand.to_lowercase().starts_with(&needle))
            .map(|e| e.brand.clone())
            .collect()
    }

    /// Models for an exact brand name, sorted. Unknown brands yield an
    /// empty list, same as the form's disabled model selector.
    pub fn models_for(&self, brand: &str) -> Vec<String> {
        let mut models: Vec<String> = self
            .entries
            .iter()
            .find(|e| e.brand == brand)
            .map(|e| e.models.clone())
            .unwrap_or_default();
        models.sort();
        models
    }
}
