use std::collections::HashMap;

use super::{CatalogError, FeeCatalog, Jurisdiction};
use crate::fees::FeeRule;

/// Catalog held entirely in memory; also the target of the CSV loader.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeeCatalog {
    jurisdictions: Vec<Jurisdiction>,
    rules: HashMap<String, Vec<FeeRule>>,
}

impl InMemoryFeeCatalog {
    pub fn new(jurisdictions: Vec<Jurisdiction>, rules: Vec<FeeRule>) -> Self {
        let mut catalog = Self {
            jurisdictions,
            rules: HashMap::new(),
        };
        for rule in rules {
            catalog.insert_rule(rule);
        }
        catalog
    }

    pub fn insert_rule(&mut self, rule: FeeRule) {
        self.rules
            .entry(rule.jurisdiction_id.clone())
            .or_default()
            .push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }
}

impl FeeCatalog for InMemoryFeeCatalog {
    fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, CatalogError> {
        Ok(self.jurisdictions.clone())
    }

    fn fee_rules(&self, jurisdiction_id: &str) -> Result<Vec<FeeRule>, CatalogError> {
        Ok(self.rules.get(jurisdiction_id).cloned().unwrap_or_default())
    }
}
