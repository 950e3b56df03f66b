//! Strict fee-to-project matching.
//!
//! A fee written for one project configuration must never leak into another's
//! total: a duplex-only transportation fee has no business in a 50-unit
//! multifamily estimate even though both are "Residential".

use std::collections::HashMap;

use super::domain::{FeeBasis, FeeRule, ProjectDetails, ProjectInputs};
use super::meter::MeterConstraint;

/// Request-scoped view of the project being evaluated against one jurisdiction.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub jurisdiction_id: &'a str,
    pub project: &'a ProjectInputs,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(jurisdiction_id: &'a str, project: &'a ProjectInputs) -> Self {
        Self {
            jurisdiction_id,
            project,
        }
    }

    pub fn details(&self) -> &'a ProjectDetails {
        &self.project.details
    }

    fn selected_area(&self, area_id: &str) -> bool {
        self.project
            .selected_service_area_ids
            .iter()
            .any(|selected| selected == area_id)
    }
}

/// Unit-count semantics implied by a use subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRequirement {
    Exactly(u32),
    AtLeast(u32),
    Between(u32, u32),
}

impl UnitRequirement {
    pub fn admits(self, units: u32) -> bool {
        match self {
            Self::Exactly(expected) => units == expected,
            Self::AtLeast(minimum) => units >= minimum,
            Self::Between(minimum, maximum) => units >= minimum && units <= maximum,
        }
    }
}

const MULTIFAMILY_MINIMUM_UNITS: u32 = 5;

pub(crate) fn normalize_subtype(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Unit requirement implied by a subtype name alone, if it has one.
pub fn implied_unit_requirement(subtype: &str) -> Option<UnitRequirement> {
    let normalized = normalize_subtype(subtype);
    let requirement = match normalized.as_str() {
        "duplex" | "twofamily" => UnitRequirement::Exactly(2),
        "triplex" | "threefamily" => UnitRequirement::Exactly(3),
        "fourplex" | "quadplex" | "fourfamily" => UnitRequirement::Exactly(4),
        "singlefamily"
        | "singlefamilydetached"
        | "sfr"
        | "garageapartment"
        | "mobilehome"
        | "manufacturedhome"
        | "adu"
        | "accessorydwellingunit" => UnitRequirement::Exactly(1),
        "multifamily" | "apartment" | "apartments" => {
            UnitRequirement::AtLeast(MULTIFAMILY_MINIMUM_UNITS)
        }
        _ => return None,
    };
    Some(requirement)
}

fn explicit_range(rule: &FeeRule) -> Option<UnitRequirement> {
    match (rule.min_units, rule.max_units) {
        (Some(min), Some(max)) => Some(UnitRequirement::Between(min, max)),
        (Some(min), None) => Some(UnitRequirement::AtLeast(min)),
        (None, Some(max)) => Some(UnitRequirement::Between(0, max)),
        (None, None) => None,
    }
}

/// Unit count for matching: the declared count, else what the project's own
/// subtype pins down exactly.
fn effective_units(details: &ProjectDetails) -> Option<u32> {
    details.num_units.filter(|units| *units > 0).or_else(|| {
        details
            .use_subtype
            .as_deref()
            .and_then(implied_unit_requirement)
            .and_then(|requirement| match requirement {
                UnitRequirement::Exactly(units) => Some(units),
                _ => None,
            })
    })
}

fn subtype_matches(rule: &FeeRule, details: &ProjectDetails) -> bool {
    let Some(rule_subtype) = rule.use_subtype.as_deref().filter(|s| !s.trim().is_empty()) else {
        return true;
    };

    let same_subtype = details
        .use_subtype
        .as_deref()
        .is_some_and(|project| normalize_subtype(project) == normalize_subtype(rule_subtype));

    match implied_unit_requirement(rule_subtype) {
        Some(implied) => {
            let requirement = explicit_range(rule).unwrap_or(implied);
            match effective_units(details) {
                Some(units) => requirement.admits(units),
                None => same_subtype,
            }
        }
        None => same_subtype,
    }
}

fn unit_bounds_match(rule: &FeeRule, details: &ProjectDetails) -> bool {
    match explicit_range(rule) {
        Some(requirement) => effective_units(details).is_some_and(|units| requirement.admits(units)),
        None => true,
    }
}

fn service_area_matches(rule: &FeeRule, context: &EvaluationContext<'_>) -> bool {
    match rule.service_area_id.as_deref() {
        None => true,
        Some(area_id) => context.selected_area(area_id),
    }
}

fn meter_matches(rule: &FeeRule, details: &ProjectDetails) -> bool {
    if !matches!(
        rule.basis,
        FeeBasis::PerUnit | FeeBasis::PerMeterSize | FeeBasis::Flat | FeeBasis::PerMonth
    ) {
        return true;
    }

    let Some(constraint) = rule.unit_label.as_deref().and_then(MeterConstraint::from_label) else {
        return true;
    };

    details
        .meter_size()
        .is_some_and(|size| constraint.admits(size))
}

pub fn is_applicable(rule: &FeeRule, context: &EvaluationContext<'_>) -> bool {
    let details = context.details();

    rule.active
        && rule.jurisdiction_id == context.jurisdiction_id
        && service_area_matches(rule, context)
        && rule
            .applies_to
            .map_or(true, |project_type| project_type == details.project_type)
        && subtype_matches(rule, details)
        && unit_bounds_match(rule, details)
        && meter_matches(rule, details)
}

/// Filters the catalog rows and collapses duplicates so an area-scoped version of
/// a fee replaces the jurisdiction-wide one. Catalog order is otherwise kept.
pub fn select_applicable<'r>(
    rules: &'r [FeeRule],
    context: &EvaluationContext<'_>,
) -> Vec<&'r FeeRule> {
    let mut selected: Vec<&'r FeeRule> = Vec::new();
    let mut positions: HashMap<(&'r str, &'r str, &'r str), usize> = HashMap::new();

    for rule in rules.iter().filter(|rule| is_applicable(rule, context)) {
        let key = (
            rule.fee_name.as_str(),
            rule.agency_name.as_str(),
            rule.unit_label.as_deref().unwrap_or(""),
        );

        match positions.get(&key) {
            Some(&index) => {
                if selected[index].service_area_id.is_none() && rule.service_area_id.is_some() {
                    selected[index] = rule;
                }
            }
            None => {
                positions.insert(key, selected.len());
                selected.push(rule);
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::domain::{FeeBasis, ProjectType};

    fn project(units: Option<u32>, subtype: Option<&str>) -> ProjectInputs {
        let mut details = ProjectDetails::new(ProjectType::Residential);
        details.num_units = units;
        details.use_subtype = subtype.map(str::to_string);
        ProjectInputs::new("Austin", details)
    }

    fn rule_with_subtype(subtype: &str) -> FeeRule {
        let mut rule = FeeRule::new(
            format!("tuf-{subtype}"),
            "austin",
            "Austin Transportation",
            format!("Transportation User Fee - {subtype}"),
            FeeBasis::PerMonth,
            20.0,
        );
        rule.applies_to = Some(ProjectType::Residential);
        rule.use_subtype = Some(subtype.to_string());
        rule
    }

    #[test]
    fn duplex_only_matches_two_units() {
        let rule = rule_with_subtype("Duplex");
        for (units, expected) in [(2, true), (3, false), (50, false)] {
            let inputs = project(Some(units), Some("Multifamily"));
            let context = EvaluationContext::new("austin", &inputs);
            assert_eq!(is_applicable(&rule, &context), expected, "units {units}");
        }
    }

    #[test]
    fn single_unit_subtypes_never_leak_into_multifamily() {
        let inputs = project(Some(10), Some("Multifamily"));
        let context = EvaluationContext::new("austin", &inputs);
        for subtype in ["Garage Apartment", "Mobile Home", "Single Family", "Triplex", "Fourplex"] {
            assert!(!is_applicable(&rule_with_subtype(subtype), &context), "{subtype}");
        }
        assert!(is_applicable(&rule_with_subtype("Multifamily"), &context));
    }

    #[test]
    fn explicit_range_overrides_multifamily_default() {
        let mut rule = rule_with_subtype("Multifamily");
        rule.min_units = Some(2);
        rule.max_units = Some(4);
        let inputs = project(Some(3), None);
        assert!(is_applicable(&rule, &EvaluationContext::new("austin", &inputs)));
        let inputs = project(Some(12), None);
        assert!(!is_applicable(&rule, &EvaluationContext::new("austin", &inputs)));
    }

    #[test]
    fn unknown_unit_count_falls_back_to_subtype_name() {
        let rule = rule_with_subtype("Single Family");
        let inputs = project(None, Some("single-family"));
        assert!(is_applicable(&rule, &EvaluationContext::new("austin", &inputs)));

        let duplex = rule_with_subtype("Duplex");
        let inputs = project(None, Some("Multifamily"));
        assert!(!is_applicable(&duplex, &EvaluationContext::new("austin", &inputs)));
    }

    #[test]
    fn descriptive_subtypes_require_equal_names() {
        let mut rule = FeeRule::new("r1", "austin", "Planning", "Restaurant review", FeeBasis::Flat, 400.0);
        rule.use_subtype = Some("Restaurant".to_string());
        let mut details = ProjectDetails::new(ProjectType::Commercial);
        details.use_subtype = Some("Office".to_string());
        let inputs = ProjectInputs::new("Austin", details);
        assert!(!is_applicable(&rule, &EvaluationContext::new("austin", &inputs)));
    }

    #[test]
    fn project_type_and_jurisdiction_must_match() {
        let mut rule = FeeRule::new("c1", "austin", "Planning", "Site plan", FeeBasis::Flat, 100.0);
        rule.applies_to = Some(ProjectType::Commercial);
        let inputs = project(Some(1), None);
        assert!(!is_applicable(&rule, &EvaluationContext::new("austin", &inputs)));

        rule.applies_to = None;
        assert!(is_applicable(&rule, &EvaluationContext::new("austin", &inputs)));
        assert!(!is_applicable(&rule, &EvaluationContext::new("denver", &inputs)));

        rule.active = false;
        assert!(!is_applicable(&rule, &EvaluationContext::new("austin", &inputs)));
    }

    #[test]
    fn area_scoped_rules_need_explicit_selection() {
        let mut rule = FeeRule::new("w1", "denver", "Denver Water", "Tap fee", FeeBasis::Flat, 100.0);
        rule.service_area_id = Some("inside-city".to_string());

        let mut inputs = project(Some(1), None);
        assert!(!is_applicable(&rule, &EvaluationContext::new("denver", &inputs)));

        inputs.selected_service_area_ids = vec!["outside-city".to_string()];
        assert!(!is_applicable(&rule, &EvaluationContext::new("denver", &inputs)));

        inputs.selected_service_area_ids.push("inside-city".to_string());
        assert!(is_applicable(&rule, &EvaluationContext::new("denver", &inputs)));

        let citywide = FeeRule::new("w2", "denver", "Denver Water", "Permit", FeeBasis::Flat, 50.0);
        assert!(is_applicable(&citywide, &EvaluationContext::new("denver", &inputs)));
    }

    #[test]
    fn meter_pinned_rows_follow_project_meter() {
        let mut rule = FeeRule::new("m1", "sd", "Water", "Capacity charge", FeeBasis::PerMeterSize, 9000.0);
        rule.unit_label = Some("2\" meter".to_string());

        let mut inputs = project(Some(1), None);
        assert!(!is_applicable(&rule, &EvaluationContext::new("sd", &inputs)));
        inputs.details.meter_size = Some("3/4\"".to_string());
        assert!(!is_applicable(&rule, &EvaluationContext::new("sd", &inputs)));
        inputs.details.meter_size = Some("2\"".to_string());
        assert!(is_applicable(&rule, &EvaluationContext::new("sd", &inputs)));
    }

    #[test]
    fn area_specific_duplicate_replaces_citywide() {
        let citywide = FeeRule::new("s1", "denver", "Wastewater", "Sewer SDC", FeeBasis::PerUnit, 100.0);
        let mut scoped = citywide.clone();
        scoped.fee_id = "s2".to_string();
        scoped.rate = 140.0.into();
        scoped.service_area_id = Some("inside-city".to_string());

        let mut inputs = project(Some(4), None);
        inputs.selected_service_area_ids = vec!["inside-city".to_string()];
        let rules = vec![citywide, scoped];
        let selected = select_applicable(&rules, &EvaluationContext::new("denver", &inputs));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].fee_id, "s2");
    }
}
