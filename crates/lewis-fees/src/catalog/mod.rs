//! Fee catalog seam: where jurisdictions and their fee rows come from.

mod csv_source;
mod memory;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fees::FeeRule;

pub use csv_source::{load_fee_rules, load_jurisdictions, CsvCatalogPaths};
pub use memory::InMemoryFeeCatalog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jurisdiction {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Jurisdiction {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state_code: Some(state_code.into()),
            kind: None,
            population: None,
            is_active: true,
        }
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }
}

/// Read access to fee data. Implementations may block; async callers should
/// run them on the blocking pool.
pub trait FeeCatalog: Send + Sync {
    fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, CatalogError>;
    fn fee_rules(&self, jurisdiction_id: &str) -> Result<Vec<FeeRule>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("fee catalog unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid catalog row {line}: {message}")]
    InvalidRow { line: u64, message: String },
}

/// Resolves user-facing `(name, state)` pairs to canonical jurisdiction ids.
#[derive(Debug, Clone, Default)]
pub struct JurisdictionRegistry {
    jurisdictions: Vec<Jurisdiction>,
    by_name: HashMap<String, Vec<usize>>,
}

fn registry_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl JurisdictionRegistry {
    pub fn new(jurisdictions: Vec<Jurisdiction>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, jurisdiction) in jurisdictions.iter().enumerate() {
            by_name
                .entry(registry_key(&jurisdiction.name))
                .or_default()
                .push(index);
            let id_key = registry_key(&jurisdiction.id);
            if id_key != registry_key(&jurisdiction.name) {
                by_name.entry(id_key).or_default().push(index);
            }
        }

        Self {
            jurisdictions,
            by_name,
        }
    }

    pub fn from_catalog<C: FeeCatalog + ?Sized>(catalog: &C) -> Result<Self, CatalogError> {
        Ok(Self::new(catalog.jurisdictions()?))
    }

    /// Active jurisdiction matching the name (or id), narrowed by state when given.
    pub fn resolve(&self, name: &str, state_code: Option<&str>) -> Option<&Jurisdiction> {
        let candidates = self.by_name.get(&registry_key(name))?;
        let state = state_code
            .map(str::trim)
            .filter(|state| !state.is_empty());

        candidates
            .iter()
            .map(|index| &self.jurisdictions[*index])
            .filter(|jurisdiction| jurisdiction.is_active)
            .find(|jurisdiction| match (state, jurisdiction.state_code.as_deref()) {
                (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                (Some(_), None) => false,
                (None, _) => true,
            })
    }

    pub fn active(&self) -> impl Iterator<Item = &Jurisdiction> {
        self.jurisdictions.iter().filter(|jurisdiction| jurisdiction.is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> JurisdictionRegistry {
        let mut portland_me = Jurisdiction::new("portland-me", "Portland", "ME");
        portland_me.population = Some(68_000);
        let mut retired = Jurisdiction::new("old-town", "Old Town", "TX");
        retired.is_active = false;

        JurisdictionRegistry::new(vec![
            Jurisdiction::new("portland-or", "Portland", "OR").with_population(630_000),
            portland_me,
            Jurisdiction::new("austin", "Austin", "TX"),
            retired,
        ])
    }

    #[test]
    fn resolves_case_insensitively_with_state() {
        let registry = registry();
        let resolved = registry.resolve("  PORTLAND ", Some("me")).expect("portland, me");
        assert_eq!(resolved.id, "portland-me");
        assert_eq!(
            registry.resolve("portland", Some("OR")).map(|j| j.id.as_str()),
            Some("portland-or")
        );
        assert_eq!(registry.resolve("portland", Some("WA")), None);
    }

    #[test]
    fn resolves_ids_and_skips_inactive() {
        let registry = registry();
        assert_eq!(registry.resolve("austin", None).map(|j| j.name.as_str()), Some("Austin"));
        assert_eq!(registry.resolve("Old Town", Some("TX")), None);
        assert_eq!(registry.active().count(), 3);
    }
}
