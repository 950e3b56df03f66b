//! In-process equivalent of the catalog database's `calc_project_fees` function.
//!
//! It is deliberately coarser than the main engine: no service areas, no unit
//! semantics, and every basis other than the four it knows falls back to the raw
//! rate. Results are comparable with what the database returns for the same rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::applicability::normalize_subtype;
use super::domain::{FeeBasis, FeeRule, ProjectType};
use super::rate::parse_rate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcProjectFeesParams {
    pub jurisdiction_id: String,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencySubtotal {
    pub agency: String,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub fee_id: String,
    pub agency: String,
    pub fee: String,
    pub category: FeeBasis,
    pub unit_label: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedsRulesItem {
    pub fee_id: String,
    pub agency: String,
    pub fee: String,
    pub category: FeeBasis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalcProjectFeesResult {
    pub grand_total: f64,
    pub by_agency: Vec<AgencySubtotal>,
    pub line_items: Vec<LineItem>,
    pub needs_rules: Vec<NeedsRulesItem>,
}

fn eligible(rule: &FeeRule, params: &CalcProjectFeesParams) -> bool {
    let subtype_ok = match (rule.use_subtype.as_deref(), params.use_subtype.as_deref()) {
        (None, _) => true,
        (Some(required), Some(requested)) => {
            normalize_subtype(required) == normalize_subtype(requested)
        }
        (Some(_), None) => false,
    };

    rule.active
        && rule.jurisdiction_id == params.jurisdiction_id
        && rule.applies_to.map_or(true, |use_type| use_type == params.use_type)
        && subtype_ok
}

fn amount(rule: &FeeRule, params: &CalcProjectFeesParams) -> f64 {
    let rate = parse_rate(&rule.rate).unwrap_or(0.0);
    let amount = match rule.basis {
        FeeBasis::Flat => rate,
        FeeBasis::PerSqft => rate * params.res_sqft,
        FeeBasis::PerUnit => rate * f64::from(params.dwellings),
        FeeBasis::PerTrip => rate * f64::from(params.trips),
        FeeBasis::Formula => 0.0,
        _ => rate,
    };
    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

pub fn calc_project_fees(rules: &[FeeRule], params: &CalcProjectFeesParams) -> CalcProjectFeesResult {
    let mut result = CalcProjectFeesResult::default();
    let mut subtotals: BTreeMap<&str, f64> = BTreeMap::new();

    for rule in rules.iter().filter(|rule| eligible(rule, params)) {
        let amount = amount(rule, params);
        result.grand_total += amount;
        *subtotals.entry(rule.agency_name.as_str()).or_insert(0.0) += amount;

        if amount > 0.0 {
            result.line_items.push(LineItem {
                fee_id: rule.fee_id.clone(),
                agency: rule.agency_name.clone(),
                fee: rule.fee_name.clone(),
                category: rule.basis,
                unit_label: rule.unit_label.clone(),
                amount,
            });
        }

        if rule.basis == FeeBasis::Formula {
            result.needs_rules.push(NeedsRulesItem {
                fee_id: rule.fee_id.clone(),
                agency: rule.agency_name.clone(),
                fee: rule.fee_name.clone(),
                category: rule.basis,
            });
        }
    }

    result.by_agency = subtotals
        .into_iter()
        .map(|(agency, subtotal)| AgencySubtotal {
            agency: agency.to_string(),
            subtotal,
        })
        .collect();
    result
}
