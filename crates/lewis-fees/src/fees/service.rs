use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::applicability::EvaluationContext;
use super::breakdown::{aggregate, DataStatus, FeeBreakdown, ProjectionPolicy};
use super::domain::{FeeRule, ProjectInputs, ProjectType};
use super::engine::evaluate_all;
use super::report::format_feasibility_report;
use super::sql::{calc_project_fees, CalcProjectFeesParams, CalcProjectFeesResult};
use crate::catalog::{CatalogError, FeeCatalog, Jurisdiction, JurisdictionRegistry};

/// Evaluates the catalog rows of one jurisdiction into a breakdown.
pub fn build_breakdown(
    jurisdiction: &Jurisdiction,
    rules: &[FeeRule],
    project: ProjectInputs,
    policy: &ProjectionPolicy,
) -> FeeBreakdown {
    let evaluation = {
        let context = EvaluationContext::new(&jurisdiction.id, &project);
        evaluate_all(rules, &context)
    };
    let totals = aggregate(&evaluation.fees, policy);

    FeeBreakdown {
        jurisdiction_id: jurisdiction.id.clone(),
        jurisdiction_name: jurisdiction.name.clone(),
        project,
        fees: evaluation.fees,
        needs_rules: evaluation.needs_rules,
        skipped: evaluation.skipped,
        totals,
        data_status: DataStatus::Available,
    }
}

/// Parameters of the database-equivalent calculation, addressed by city name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlEquivalentRequest {
    pub city: String,
    #[serde(default)]
    pub state_code: Option<String>,
    pub use_type: ProjectType,
    #[serde(default)]
    pub use_subtype: Option<String>,
    #[serde(default)]
    pub dwellings: u32,
    #[serde(default)]
    pub res_sqft: f64,
    #[serde(default)]
    pub trips: u32,
    #[serde(default)]
    pub valuation: Option<f64>,
}

/// Single-jurisdiction fee calculation over a catalog.
pub struct FeeCalculatorService<C> {
    catalog: Arc<C>,
    policy: ProjectionPolicy,
}

impl<C> FeeCalculatorService<C>
where
    C: FeeCatalog + 'static,
{
    pub fn new(catalog: Arc<C>, policy: ProjectionPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    pub fn policy(&self) -> &ProjectionPolicy {
        &self.policy
    }

    /// Active jurisdictions, most populous first.
    pub fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, FeeServiceError> {
        let mut jurisdictions: Vec<Jurisdiction> = self
            .catalog
            .jurisdictions()?
            .into_iter()
            .filter(|jurisdiction| jurisdiction.is_active)
            .collect();
        jurisdictions.sort_by(|a, b| b.population.cmp(&a.population));
        Ok(jurisdictions)
    }

    fn resolve(&self, name: &str, state_code: Option<&str>) -> Result<Jurisdiction, FeeServiceError> {
        let registry = JurisdictionRegistry::from_catalog(self.catalog.as_ref())?;
        registry
            .resolve(name, state_code)
            .cloned()
            .ok_or_else(|| FeeServiceError::JurisdictionNotFound {
                name: name.to_string(),
                state_code: state_code.map(str::to_string),
            })
    }

    /// Catalog failures produce an unavailable breakdown rather than an error;
    /// only an unknown jurisdiction is reported as one.
    pub fn calculate(&self, inputs: ProjectInputs) -> Result<FeeBreakdown, FeeServiceError> {
        let jurisdiction = match self.resolve(&inputs.jurisdiction_name, inputs.state_code.as_deref()) {
            Ok(jurisdiction) => jurisdiction,
            Err(FeeServiceError::Catalog(error)) => {
                warn!(jurisdiction = %inputs.jurisdiction_name, %error, "jurisdiction lookup failed");
                let name = inputs.jurisdiction_name.clone();
                return Ok(FeeBreakdown::unavailable(
                    "",
                    name,
                    inputs,
                    &self.policy,
                    error.to_string(),
                ));
            }
            Err(other) => return Err(other),
        };

        let rules = match self.catalog.fee_rules(&jurisdiction.id) {
            Ok(rules) => rules,
            Err(error) => {
                warn!(jurisdiction = %jurisdiction.id, %error, "fee rows unavailable");
                return Ok(FeeBreakdown::unavailable(
                    jurisdiction.id,
                    jurisdiction.name,
                    inputs,
                    &self.policy,
                    error.to_string(),
                ));
            }
        };

        let breakdown = build_breakdown(&jurisdiction, &rules, inputs, &self.policy);
        info!(
            jurisdiction = %breakdown.jurisdiction_id,
            fees = breakdown.fees.len(),
            needs_rules = breakdown.needs_rules.len(),
            skipped = breakdown.skipped.len(),
            first_year_total = breakdown.totals.first_year_total,
            "calculated fee breakdown"
        );
        Ok(breakdown)
    }

    pub fn report(&self, inputs: ProjectInputs) -> Result<(String, FeeBreakdown), FeeServiceError> {
        let breakdown = self.calculate(inputs)?;
        Ok((format_feasibility_report(&breakdown), breakdown))
    }

    pub fn sql_equivalent(
        &self,
        request: SqlEquivalentRequest,
    ) -> Result<CalcProjectFeesResult, FeeServiceError> {
        let jurisdiction = self.resolve(&request.city, request.state_code.as_deref())?;
        let rules = self.catalog.fee_rules(&jurisdiction.id)?;
        let params = CalcProjectFeesParams {
            jurisdiction_id: jurisdiction.id,
            use_type: request.use_type,
            use_subtype: request.use_subtype,
            dwellings: request.dwellings,
            res_sqft: request.res_sqft,
            trips: request.trips,
            valuation: request.valuation,
        };
        Ok(calc_project_fees(&rules, &params))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeeServiceError {
    #[error("jurisdiction not found: {name}")]
    JurisdictionNotFound {
        name: String,
        state_code: Option<String>,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
