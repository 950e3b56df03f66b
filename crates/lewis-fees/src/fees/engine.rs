//! Per-row fee evaluation.
//!
//! Several bases price quantities a project description does not carry (linear
//! feet of frontage, cubic yards of excavation, electrical load). Those are
//! estimated from square footage with fixed heuristics; the multipliers are part
//! of the output contract and must not drift.

use tracing::debug;

use super::applicability::{select_applicable, EvaluationContext};
use super::domain::{
    CalculatedFee, FeeBasis, FeeRule, NeedsRulesFee, ProjectDetails, SkipReason, SkippedFee,
};
use super::format;
use super::meter::{self, MeterConstraint, BASE_MULTIPLIER};
use super::rate::parse_rate;

/// Cubic yards of excavation per square foot of building.
pub const CUBIC_YARDS_PER_SQFT: f64 = 0.5;
/// Minimum service size and square feet per amp.
pub const MIN_AMPS: f64 = 100.0;
pub const SQFT_PER_AMP: f64 = 100.0;
/// Minimum circuit count and square feet per circuit.
pub const MIN_CIRCUITS: f64 = 10.0;
pub const SQFT_PER_CIRCUIT: f64 = 200.0;
/// Inspection hours: one per thousand square feet, at least one.
pub const SQFT_PER_INSPECTION_HOUR: f64 = 1_000.0;
/// One roofing square covers a hundred square feet.
pub const SQFT_PER_ROOFING_SQUARE: f64 = 100.0;
/// HVAC load estimate.
pub const BTUS_PER_SQFT: f64 = 50.0;
/// Largest single fee accepted; anything above is a data error, not a charge.
pub const MAX_FEE_AMOUNT: f64 = 1e15;

/// What a basis produced for one row.
enum Priced {
    Amount(f64, String),
    NeedsRules,
}

/// Result of evaluating one applicable row.
#[derive(Debug, Clone, PartialEq)]
pub enum FeeOutcome {
    Calculated(CalculatedFee),
    NeedsRules(NeedsRulesFee),
    Skipped(SkippedFee),
}

/// Dollar amount a rule contributes for the project; zero when it cannot be computed.
pub fn calculate(rule: &FeeRule, project: &ProjectDetails) -> f64 {
    match evaluate(rule, project) {
        FeeOutcome::Calculated(fee) => fee.amount,
        FeeOutcome::NeedsRules(_) | FeeOutcome::Skipped(_) => 0.0,
    }
}

pub fn evaluate(rule: &FeeRule, project: &ProjectDetails) -> FeeOutcome {
    let rate = parse_rate(&rule.rate);

    let (raw_amount, mut calculation) = match apply_basis(rule, rate, project) {
        Ok(Priced::Amount(amount, calculation)) => (amount, calculation),
        Ok(Priced::NeedsRules) => {
            return FeeOutcome::NeedsRules(NeedsRulesFee {
                fee_id: rule.fee_id.clone(),
                fee_name: rule.fee_name.clone(),
                agency_name: rule.agency_name.clone(),
                category: rule.category_label().to_string(),
                basis: rule.basis,
                fallback_estimate: rate.map(|rate| rate.max(0.0)),
                formula_display: rule.formula_display.clone(),
            })
        }
        Err(reason) => return skipped(rule, reason),
    };

    if !raw_amount.is_finite() {
        return skipped(rule, SkipReason::AmountOutOfRange);
    }

    let mut amount = raw_amount.max(0.0);
    if let Some(min_fee) = rule.min_fee.filter(|min| *min > 0.0) {
        if amount < min_fee {
            calculation.push_str(&format!(" (minimum: {})", format::money(min_fee)));
            amount = min_fee;
        }
    }
    if let Some(max_fee) = rule.max_fee.filter(|max| *max > 0.0) {
        if amount > max_fee {
            calculation.push_str(&format!(" (maximum: {})", format::money(max_fee)));
            amount = max_fee;
        }
    }
    if amount > MAX_FEE_AMOUNT {
        return skipped(rule, SkipReason::AmountOutOfRange);
    }

    FeeOutcome::Calculated(CalculatedFee {
        fee_id: rule.fee_id.clone(),
        fee_name: rule.fee_name.clone(),
        agency_name: rule.agency_name.clone(),
        category: rule.category_label().to_string(),
        basis: rule.basis,
        service_area: rule.service_area_label().to_string(),
        amount,
        is_recurring: rule.is_recurring(),
        calculation,
        unit_label: rule.unit_label.clone(),
        provenance: rule.provenance.clone(),
    })
}

/// Evaluated rows for one jurisdiction, partitioned by outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub fees: Vec<CalculatedFee>,
    pub needs_rules: Vec<NeedsRulesFee>,
    pub skipped: Vec<SkippedFee>,
}

impl Evaluation {
    pub fn matched(&self) -> usize {
        self.fees.len() + self.needs_rules.len() + self.skipped.len()
    }
}

/// Filters the catalog rows for the context and evaluates each survivor.
pub fn evaluate_all(rules: &[FeeRule], context: &EvaluationContext<'_>) -> Evaluation {
    let mut evaluation = Evaluation::default();

    for rule in select_applicable(rules, context) {
        match evaluate(rule, context.details()) {
            FeeOutcome::Calculated(fee) => evaluation.fees.push(fee),
            FeeOutcome::NeedsRules(fee) => evaluation.needs_rules.push(fee),
            FeeOutcome::Skipped(fee) => {
                debug!(
                    jurisdiction = context.jurisdiction_id,
                    fee_id = %fee.fee_id,
                    reason = %fee.reason.describe(),
                    "fee not calculated"
                );
                evaluation.skipped.push(fee);
            }
        }
    }

    evaluation
}

fn skipped(rule: &FeeRule, reason: SkipReason) -> FeeOutcome {
    FeeOutcome::Skipped(SkippedFee {
        fee_id: rule.fee_id.clone(),
        fee_name: rule.fee_name.clone(),
        agency_name: rule.agency_name.clone(),
        reason,
    })
}

fn require(value: Option<f64>, quantity: &str) -> Result<f64, SkipReason> {
    value.ok_or_else(|| SkipReason::MissingQuantity(quantity.to_string()))
}

fn product(rate: f64, count: f64, unit: &str) -> (f64, String) {
    let amount = rate * count;
    (
        amount,
        format!(
            "{} × {} {unit} = {}",
            format::rate(rate),
            format::quantity(count),
            format::money(amount)
        ),
    )
}

fn per_thousand_sqft(label: Option<&str>) -> bool {
    label.is_some_and(|label| label.contains("1000") || label.contains("1,000"))
}

fn apply_basis(
    rule: &FeeRule,
    rate: Option<f64>,
    project: &ProjectDetails,
) -> Result<Priced, SkipReason> {
    if rule.basis.needs_rules() {
        return Ok(Priced::NeedsRules);
    }
    let rate = rate.ok_or(SkipReason::UnparseableRate)?;
    let recurring = rule.is_recurring();

    let (amount, calculation) = match rule.basis {
        FeeBasis::Flat => {
            let calculation = if recurring {
                format!("{} per month", format::money(rate))
            } else {
                format!("Flat fee: {}", format::money(rate))
            };
            (rate, calculation)
        }
        FeeBasis::PerUnit => product(rate, require(project.units(), "numUnits")?, "units"),
        FeeBasis::PerSection => product(rate, require(project.units(), "numUnits")?, "sections"),
        FeeBasis::PerAlteration => product(rate, project.units().unwrap_or(1.0), "alterations"),
        FeeBasis::PerSqft => {
            let sqft = require(project.square_feet(), "squareFeet")?;
            if per_thousand_sqft(rule.unit_label.as_deref()) {
                product(rate, sqft / 1_000.0, "(1,000 sq ft units)")
            } else {
                product(rate, sqft, "sq ft")
            }
        }
        FeeBasis::PerTrip => product(rate, require(project.trips(), "tripCount")?, "trips"),
        FeeBasis::PerAcre => product(rate, require(project.acreage(), "projectAcreage")?, "acres"),
        FeeBasis::Percentage | FeeBasis::PerCost => {
            let value = require(project.project_value(), "projectValue")?;
            let amount = rate / 100.0 * value;
            (
                amount,
                format!(
                    "{}% of {} = {}",
                    format::quantity(rate),
                    format::money(value),
                    format::money(amount)
                ),
            )
        }
        FeeBasis::PerLinearFoot => {
            let sqft = require(project.square_feet(), "squareFeet")?;
            product(rate, sqft.sqrt(), "linear ft (est. √ sq ft)")
        }
        FeeBasis::PerCubicYard => {
            let sqft = require(project.square_feet(), "squareFeet")?;
            product(rate, sqft * CUBIC_YARDS_PER_SQFT, "cu yd (est. 0.5 × sq ft)")
        }
        FeeBasis::PerAmp => {
            let sqft = require(project.square_feet(), "squareFeet")?;
            product(rate, MIN_AMPS.max(sqft / SQFT_PER_AMP), "amps (est. from sq ft)")
        }
        FeeBasis::PerCircuit => {
            let sqft = require(project.square_feet(), "squareFeet")?;
            product(
                rate,
                MIN_CIRCUITS.max(sqft / SQFT_PER_CIRCUIT),
                "circuits (est. from sq ft)",
            )
        }
        FeeBasis::PerHour => {
            let hours = project
                .square_feet()
                .map_or(1.0, |sqft| (sqft / SQFT_PER_INSPECTION_HOUR).max(1.0));
            product(rate, hours, "hours (est. from sq ft)")
        }
        FeeBasis::PerSquare => {
            let sqft = require(project.square_feet(), "squareFeet")?;
            product(rate, sqft / SQFT_PER_ROOFING_SQUARE, "roofing squares")
        }
        FeeBasis::PerMillionBtus => {
            let sqft = require(project.square_feet(), "squareFeet")?;
            product(
                rate,
                sqft * BTUS_PER_SQFT / 1_000_000.0,
                "MMBtu (est. 50 BTU per sq ft)",
            )
        }
        FeeBasis::PerMeterSize => meter_amount(rule, rate, project),
        FeeBasis::PerMonth => (rate, format!("{} per month", format::money(rate))),
        FeeBasis::Tiered | FeeBasis::Formula => return Ok(Priced::NeedsRules),
    };

    Ok(Priced::Amount(amount, calculation))
}

fn meter_amount(rule: &FeeRule, rate: f64, project: &ProjectDetails) -> (f64, String) {
    let pinned = rule
        .unit_label
        .as_deref()
        .and_then(MeterConstraint::from_label)
        .is_some();

    match project.meter_size() {
        // The row already prices one specific size; applicability checked the match.
        Some(size) if pinned => (rate, format!("{size} meter: {}", format::money(rate))),
        Some(size) => {
            let multiplier = meter::meter_multiplier(size);
            let label = meter::canonical_meter_size(size).unwrap_or(size);
            (
                rate * multiplier,
                format!(
                    "{} × {} ({label} meter multiplier) = {}",
                    format::rate(rate),
                    format::quantity(multiplier),
                    format::money(rate * multiplier)
                ),
            )
        }
        None => (
            rate * BASE_MULTIPLIER,
            format!(
                "{} × {} (base meter multiplier) = {}",
                format::rate(rate),
                format::quantity(BASE_MULTIPLIER),
                format::money(rate * BASE_MULTIPLIER)
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::domain::ProjectType;

    fn details() -> ProjectDetails {
        ProjectDetails::new(ProjectType::Residential)
    }

    fn rule(basis: FeeBasis, rate: f64) -> FeeRule {
        FeeRule::new("f", "austin", "Agency", "Fee", basis, rate)
    }

    fn calculated(outcome: FeeOutcome) -> CalculatedFee {
        match outcome {
            FeeOutcome::Calculated(fee) => fee,
            other => panic!("expected calculated fee, got {other:?}"),
        }
    }

    #[test]
    fn per_sqft_multiplies_square_feet() {
        let mut project = details();
        project.square_feet = Some(45_000.0);
        let fee = calculated(evaluate(&rule(FeeBasis::PerSqft, 2.5), &project));
        assert_eq!(fee.amount, 112_500.0);
        assert_eq!(fee.calculation, "$2.50 × 45,000 sq ft = $112,500.00");
    }

    #[test]
    fn per_thousand_sqft_labels_scale_down() {
        let mut project = details();
        project.square_feet = Some(45_000.0);
        let mut per_k = rule(FeeBasis::PerSqft, 100.0);
        per_k.unit_label = Some("per 1,000 sq ft".to_string());
        assert_eq!(calculate(&per_k, &project), 4_500.0);
    }

    #[test]
    fn per_unit_is_one_time() {
        let mut project = details();
        project.num_units = Some(50);
        let fee = calculated(evaluate(&rule(FeeBasis::PerUnit, 150.0), &project));
        assert_eq!(fee.amount, 7_500.0);
        assert!(!fee.is_recurring);
    }

    #[test]
    fn per_meter_size_uses_multiplier_table() {
        let mut project = details();
        project.meter_size = Some("2\"".to_string());
        assert_eq!(calculate(&rule(FeeBasis::PerMeterSize, 1_000.0), &project), 3_000.0);

        project.meter_size = None;
        assert_eq!(calculate(&rule(FeeBasis::PerMeterSize, 1_000.0), &project), 1_000.0);
    }

    #[test]
    fn pinned_meter_rows_charge_their_rate() {
        let mut project = details();
        project.meter_size = Some("2\"".to_string());
        let mut pinned = rule(FeeBasis::PerMeterSize, 9_000.0);
        pinned.unit_label = Some("2\" meter".to_string());
        assert_eq!(calculate(&pinned, &project), 9_000.0);
    }

    #[test]
    fn percentage_and_per_cost_share_formula() {
        let mut project = details();
        project.project_value = Some(400_000.0);
        assert_eq!(calculate(&rule(FeeBasis::Percentage, 1.0), &project), 4_000.0);
        assert_eq!(calculate(&rule(FeeBasis::PerCost, 1.0), &project), 4_000.0);
    }

    #[test]
    fn estimation_heuristics_keep_their_multipliers() {
        let mut project = details();
        project.square_feet = Some(40_000.0);
        assert_eq!(calculate(&rule(FeeBasis::PerLinearFoot, 2.0), &project), 400.0);
        assert_eq!(calculate(&rule(FeeBasis::PerCubicYard, 1.0), &project), 20_000.0);
        assert_eq!(calculate(&rule(FeeBasis::PerAmp, 1.0), &project), 400.0);
        assert_eq!(calculate(&rule(FeeBasis::PerCircuit, 1.0), &project), 200.0);
        assert_eq!(calculate(&rule(FeeBasis::PerHour, 10.0), &project), 400.0);
        assert_eq!(calculate(&rule(FeeBasis::PerSquare, 1.0), &project), 400.0);
        assert_eq!(calculate(&rule(FeeBasis::PerMillionBtus, 100.0), &project), 200.0);

        project.square_feet = Some(1_000.0);
        assert_eq!(calculate(&rule(FeeBasis::PerAmp, 1.0), &project), 100.0);
        assert_eq!(calculate(&rule(FeeBasis::PerCircuit, 1.0), &project), 10.0);
        project.square_feet = None;
        assert_eq!(calculate(&rule(FeeBasis::PerHour, 10.0), &project), 10.0);
    }

    #[test]
    fn per_month_is_recurring_monthly_amount() {
        let fee = calculated(evaluate(&rule(FeeBasis::PerMonth, 45.0), &details()));
        assert!(fee.is_recurring);
        assert_eq!(fee.amount, 45.0);
        assert_eq!(fee.annualized_amount(), 540.0);
    }

    #[test]
    fn missing_quantities_skip_the_fee() {
        let project = details();
        for basis in [
            FeeBasis::PerUnit,
            FeeBasis::PerSqft,
            FeeBasis::PerTrip,
            FeeBasis::PerAcre,
            FeeBasis::Percentage,
            FeeBasis::PerLinearFoot,
        ] {
            match evaluate(&rule(basis, 10.0), &project) {
                FeeOutcome::Skipped(skipped) => {
                    assert!(matches!(skipped.reason, SkipReason::MissingQuantity(_)))
                }
                other => panic!("{basis} should skip, got {other:?}"),
            }
            assert_eq!(calculate(&rule(basis, 10.0), &project), 0.0);
        }
    }

    #[test]
    fn unparseable_rates_contribute_nothing() {
        let na = FeeRule::new("f", "austin", "Agency", "Fee", FeeBasis::Flat, "N/A");
        assert!(matches!(
            evaluate(&na, &details()),
            FeeOutcome::Skipped(SkippedFee {
                reason: SkipReason::UnparseableRate,
                ..
            })
        ));

        let currency = FeeRule::new("f", "austin", "Agency", "Fee", FeeBasis::Flat, "$1,234.50");
        assert_eq!(calculate(&currency, &details()), 1_234.50);
    }

    #[test]
    fn formula_rows_are_surfaced_not_computed() {
        let mut formula = rule(FeeBasis::Formula, 2_500.0);
        formula.formula_display = Some("base + 0.3 × trips".to_string());
        match evaluate(&formula, &details()) {
            FeeOutcome::NeedsRules(needs) => {
                assert_eq!(needs.fallback_estimate, Some(2_500.0));
                assert_eq!(needs.formula_display.as_deref(), Some("base + 0.3 × trips"));
            }
            other => panic!("expected needs-rules, got {other:?}"),
        }
        assert_eq!(calculate(&rule(FeeBasis::Tiered, 10.0), &details()), 0.0);
    }

    #[test]
    fn formula_rows_without_a_rate_still_need_rules() {
        let formula = FeeRule::new("f", "austin", "Agency", "Fee", FeeBasis::Formula, "N/A");
        match evaluate(&formula, &details()) {
            FeeOutcome::NeedsRules(needs) => assert_eq!(needs.fallback_estimate, None),
            other => panic!("expected needs-rules, got {other:?}"),
        }
    }

    #[test]
    fn overflowing_amounts_are_skipped() {
        let mut project = details();
        project.square_feet = Some(45_000.0);
        let huge = FeeRule::new("f", "austin", "Agency", "Fee", FeeBasis::PerSqft, "1e305");
        match evaluate(&huge, &project) {
            FeeOutcome::Skipped(skipped) => {
                assert_eq!(skipped.reason, SkipReason::AmountOutOfRange)
            }
            other => panic!("expected skipped fee, got {other:?}"),
        }
        assert_eq!(calculate(&huge, &project), 0.0);

        let absurd = rule(FeeBasis::Flat, 2e15);
        assert!(matches!(evaluate(&absurd, &details()), FeeOutcome::Skipped(_)));
    }

    #[test]
    fn negative_results_clamp_and_min_max_apply() {
        assert_eq!(calculate(&rule(FeeBasis::Flat, -50.0), &details()), 0.0);

        let mut project = details();
        project.num_units = Some(2);
        let mut bounded = rule(FeeBasis::PerUnit, 10.0);
        bounded.min_fee = Some(100.0);
        let fee = calculated(evaluate(&bounded, &project));
        assert_eq!(fee.amount, 100.0);
        assert!(fee.calculation.contains("minimum"));

        project.num_units = Some(500);
        bounded.max_fee = Some(1_000.0);
        assert_eq!(calculate(&bounded, &project), 1_000.0);
    }
}
