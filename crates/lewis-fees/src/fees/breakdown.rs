use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CalculatedFee, NeedsRulesFee, ProjectInputs, SkippedFee};

/// Years reported when no policy is configured.
pub const DEFAULT_PROJECTION_YEARS: [u32; 4] = [1, 2, 3, 5];
/// Years every breakdown and report carries regardless of configuration.
pub const REQUIRED_PROJECTION_YEARS: [u32; 3] = [2, 3, 5];

/// How recurring costs are carried forward into multi-year projections.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionPolicy {
    pub years: Vec<u32>,
    /// Year-over-year growth of recurring charges, `0.03` for 3%.
    pub annual_escalation: f64,
}

impl Default for ProjectionPolicy {
    fn default() -> Self {
        Self {
            years: DEFAULT_PROJECTION_YEARS.to_vec(),
            annual_escalation: 0.0,
        }
    }
}

impl ProjectionPolicy {
    /// Operating cost accumulated over the first `years` years.
    pub fn cumulative_operating_cost(&self, annual: f64, years: u32) -> f64 {
        if self.annual_escalation == 0.0 {
            return annual * f64::from(years);
        }
        (0..years)
            .map(|year| annual * (1.0 + self.annual_escalation).powi(year as i32))
            .sum()
    }

    /// Configured years merged with the required ones, ascending.
    pub fn effective_years(&self) -> Vec<u32> {
        let mut years: Vec<u32> = self
            .years
            .iter()
            .copied()
            .filter(|year| *year > 0)
            .chain(REQUIRED_PROJECTION_YEARS)
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    pub fn projections(&self, annual: f64) -> BTreeMap<String, f64> {
        self.effective_years()
            .into_iter()
            .map(|year| (projection_key(year), self.cumulative_operating_cost(annual, year)))
            .collect()
    }
}

pub fn projection_key(year: u32) -> String {
    format!("Year {year}")
}

/// Totals derived from calculated fees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTotals {
    pub one_time_fees: f64,
    pub monthly_fees: f64,
    pub annual_operating_costs: f64,
    pub first_year_total: f64,
    /// Monthly charges count once here, so the values sum to one-time plus monthly.
    pub by_agency: BTreeMap<String, f64>,
    pub by_category: BTreeMap<String, f64>,
    pub projections: BTreeMap<String, f64>,
}

impl FeeTotals {
    pub fn category_shares(&self) -> Vec<CategoryShare> {
        let total: f64 = self.by_category.values().sum();
        let mut shares: Vec<CategoryShare> = self
            .by_category
            .iter()
            .map(|(category, amount)| CategoryShare {
                category: category.clone(),
                amount: *amount,
                percentage: if total > 0.0 { amount / total * 100.0 } else { 0.0 },
            })
            .collect();
        shares.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        shares
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
}

pub fn aggregate(fees: &[CalculatedFee], policy: &ProjectionPolicy) -> FeeTotals {
    let mut totals = FeeTotals::default();

    for fee in fees {
        if fee.is_recurring {
            totals.monthly_fees += fee.amount;
        } else {
            totals.one_time_fees += fee.amount;
        }
        *totals.by_agency.entry(fee.agency_name.clone()).or_insert(0.0) += fee.amount;
        *totals.by_category.entry(fee.category.clone()).or_insert(0.0) += fee.amount;
    }

    totals.annual_operating_costs = totals.monthly_fees * 12.0;
    totals.first_year_total = totals.one_time_fees + totals.annual_operating_costs;
    totals.projections = policy.projections(totals.annual_operating_costs);
    totals
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DataStatus {
    Available,
    Unavailable { reason: String },
}

impl DataStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Everything computed for one project in one jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub jurisdiction_id: String,
    pub jurisdiction_name: String,
    pub project: ProjectInputs,
    pub fees: Vec<CalculatedFee>,
    pub needs_rules: Vec<NeedsRulesFee>,
    pub skipped: Vec<SkippedFee>,
    #[serde(flatten)]
    pub totals: FeeTotals,
    pub data_status: DataStatus,
}

impl FeeBreakdown {
    /// Empty breakdown for a jurisdiction whose fee rows could not be read.
    pub fn unavailable(
        jurisdiction_id: impl Into<String>,
        jurisdiction_name: impl Into<String>,
        project: ProjectInputs,
        policy: &ProjectionPolicy,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            jurisdiction_id: jurisdiction_id.into(),
            jurisdiction_name: jurisdiction_name.into(),
            project,
            fees: Vec::new(),
            needs_rules: Vec::new(),
            skipped: Vec::new(),
            totals: aggregate(&[], policy),
            data_status: DataStatus::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn one_time(&self) -> impl Iterator<Item = &CalculatedFee> {
        self.fees.iter().filter(|fee| !fee.is_recurring)
    }

    pub fn recurring(&self) -> impl Iterator<Item = &CalculatedFee> {
        self.fees.iter().filter(|fee| fee.is_recurring)
    }
}
