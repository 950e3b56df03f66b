//! Plain-text feasibility report.
//!
//! Section headings are a fixed contract with downstream readers. The exclusion
//! list is derived from the breakdown itself, so the report never claims a
//! category is missing when fees for it were computed.

use std::fmt::Write as _;

use super::breakdown::{DataStatus, FeeBreakdown, REQUIRED_PROJECTION_YEARS};
use super::domain::{CalculatedFee, FeeBasis};
use super::format;

const RULE_WIDTH: usize = 70;

/// Standard fee families a development budget is expected to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageCategory {
    BuildingPermit,
    PlanReview,
    Inspection,
    TradePermits,
    ImpactFees,
    WaterSewer,
    Transportation,
    Parks,
}

impl CoverageCategory {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::BuildingPermit,
            Self::PlanReview,
            Self::Inspection,
            Self::TradePermits,
            Self::ImpactFees,
            Self::WaterSewer,
            Self::Transportation,
            Self::Parks,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BuildingPermit => "Building permit fees",
            Self::PlanReview => "Plan review fees",
            Self::Inspection => "Inspection fees",
            Self::TradePermits => "Trade permit fees (electrical, plumbing, mechanical)",
            Self::ImpactFees => "Impact fees",
            Self::WaterSewer => "Water and sewer connection and capacity charges",
            Self::Transportation => "Transportation fees",
            Self::Parks => "Parks and open space fees",
        }
    }

    /// Phrases matched against a fee's category.
    const fn category_phrases(self) -> &'static [&'static str] {
        match self {
            Self::BuildingPermit => &["building permit", "building", "building and safety"],
            Self::PlanReview => &["plan review", "plan check"],
            Self::Inspection => &["inspection"],
            Self::TradePermits => &["electrical", "plumbing", "mechanical", "trade permit"],
            Self::ImpactFees => &["impact fee", "impact", "system development", "sdc"],
            Self::WaterSewer => &["water", "sewer", "wastewater"],
            Self::Transportation => &["transportation", "traffic", "mobility"],
            Self::Parks => &["park", "parkland", "open space"],
        }
    }

    /// Stricter phrases matched against the fee name when the category is silent.
    const fn name_phrases(self) -> &'static [&'static str] {
        match self {
            Self::BuildingPermit => &["building permit"],
            Self::PlanReview => &["plan review", "plan check"],
            Self::Inspection => &["inspection"],
            Self::TradePermits => &[
                "electrical permit",
                "plumbing permit",
                "mechanical permit",
                "trade permit",
            ],
            Self::ImpactFees => &["impact fee", "system development charge", "sdc"],
            Self::WaterSewer => &[
                "water capital recovery",
                "water connection",
                "water tap",
                "water meter",
                "water capacity",
                "sewer",
                "wastewater",
            ],
            Self::Transportation => &["transportation", "traffic impact", "street impact", "mobility"],
            Self::Parks => &["park", "parkland", "open space"],
        }
    }

    pub fn covers(self, fee: &CalculatedFee) -> bool {
        let category = words(&fee.category);
        let name = words(&fee.fee_name);
        self.category_phrases()
            .iter()
            .any(|phrase| contains_phrase(&category, phrase))
            || self
                .name_phrases()
                .iter()
                .any(|phrase| contains_phrase(&name, phrase))
    }
}

/// Lowercased words with a plural `s` dropped, so "Permits" matches "permit".
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let word = word.to_ascii_lowercase();
            match word.strip_suffix('s') {
                Some(stem) if stem.len() >= 3 && !stem.ends_with('s') => stem.to_string(),
                _ => word,
            }
        })
        .collect()
}

fn contains_phrase(haystack: &[String], phrase: &str) -> bool {
    let needle = words(phrase);
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}

/// Costs no fee schedule row can represent.
const ALWAYS_EXCLUDED: [&str; 2] = [
    "Utility connection labor and construction costs",
    "Private development agreements or special assessments",
];

pub fn format_feasibility_report(breakdown: &FeeBreakdown) -> String {
    let mut report = String::new();
    let project = &breakdown.project;
    let details = &project.details;

    heavy_rule(&mut report);
    report.push_str("  CONSTRUCTION FEASIBILITY REPORT\n");
    heavy_rule(&mut report);
    report.push('\n');

    if let DataStatus::Unavailable { reason } = &breakdown.data_status {
        let _ = writeln!(
            report,
            "DATA UNAVAILABLE: fee data for {} could not be loaded ({reason}).",
            breakdown.jurisdiction_name
        );
        report.push_str("All figures below are zero and must not be used for budgeting.\n\n");
    }

    section(&mut report, "PROJECT SPECIFICATIONS");
    let location = match project.state_code.as_deref() {
        Some(state) => format!("{}, {state}", breakdown.jurisdiction_name),
        None => breakdown.jurisdiction_name.clone(),
    };
    field(&mut report, "Jurisdiction:", location);
    field(&mut report, "Project Type:", details.project_type.label().to_string());
    field(
        &mut report,
        "Use Subtype:",
        or_unspecified(details.use_subtype.clone()),
    );
    field(
        &mut report,
        "Number of Units:",
        or_unspecified(details.num_units.map(|units| units.to_string())),
    );
    field(
        &mut report,
        "Square Footage:",
        or_unspecified(details.square_feet.map(|sqft| format!("{} sq ft", format::quantity(sqft)))),
    );
    field(
        &mut report,
        "Project Value:",
        or_unspecified(details.project_value.map(format::money)),
    );
    field(
        &mut report,
        "Acreage:",
        or_unspecified(details.project_acreage.map(|acres| format!("{} acres", format::quantity(acres)))),
    );
    field(
        &mut report,
        "Meter Size:",
        or_unspecified(details.meter_size.clone()),
    );
    field(
        &mut report,
        "Daily Trips:",
        or_unspecified(details.trip_count.map(format::quantity)),
    );
    let areas = if project.selected_service_area_ids.is_empty() {
        "Citywide only".to_string()
    } else {
        project.selected_service_area_ids.join(", ")
    };
    field(&mut report, "Service Areas:", areas);
    report.push('\n');

    let totals = &breakdown.totals;
    section(&mut report, "FINANCIAL SUMMARY");
    field(&mut report, "One-Time Development Fees:", format::money(totals.one_time_fees));
    field(&mut report, "Monthly Operating Costs:", format::money(totals.monthly_fees));
    field(
        &mut report,
        "Annual Operating Costs (Year 1):",
        format::money(totals.annual_operating_costs),
    );
    light_rule(&mut report);
    field(&mut report, "TOTAL FIRST YEAR COST:", format::money(totals.first_year_total));
    report.push('\n');

    if let Some(units) = details.units() {
        section(&mut report, "PER-UNIT BREAKDOWN");
        field(
            &mut report,
            "Development Cost per Unit:",
            format::money(totals.one_time_fees / units),
        );
        field(
            &mut report,
            "Monthly Cost per Unit:",
            format::money(totals.monthly_fees / units),
        );
        field(
            &mut report,
            "First Year Total per Unit:",
            format::money(totals.first_year_total / units),
        );
        report.push('\n');
    }

    let one_time: Vec<&CalculatedFee> = breakdown.one_time().collect();
    if !one_time.is_empty() {
        section(&mut report, "ONE-TIME DEVELOPMENT FEES");
        for fee in &one_time {
            let _ = writeln!(report, "{}", fee.fee_name);
            let _ = writeln!(report, "  Agency: {}", fee.agency_name);
            let _ = writeln!(report, "  Service Area: {}", fee.service_area);
            let _ = writeln!(report, "  Calculation: {}", fee.calculation);
            let _ = writeln!(report, "  Amount: {}\n", format::money(fee.amount));
        }
    }

    let recurring: Vec<&CalculatedFee> = breakdown.recurring().collect();
    if !recurring.is_empty() {
        section(&mut report, "MONTHLY OPERATING COSTS");
        for fee in &recurring {
            let _ = writeln!(report, "{}", fee.fee_name);
            let _ = writeln!(report, "  Agency: {}", fee.agency_name);
            let _ = writeln!(report, "  Calculation: {}", fee.calculation);
            let _ = writeln!(report, "  Monthly: {}", format::money(fee.amount));
            let _ = writeln!(report, "  Annual: {}\n", format::money(fee.amount * 12.0));
        }
    }

    report.push_str("Fee Timeline:\n");
    for line in timeline(breakdown) {
        let _ = writeln!(report, "  • {line}");
    }
    report.push('\n');

    report.push_str("Usage Assumptions:\n");
    for line in usage_assumptions(breakdown) {
        let _ = writeln!(report, "  • {line}");
    }
    report.push('\n');

    section(&mut report, "Multi-Year Projections");
    let mut years: Vec<(u32, f64)> = totals
        .projections
        .iter()
        .filter_map(|(key, cost)| {
            key.strip_prefix("Year ")
                .and_then(|year| year.parse::<u32>().ok())
                .map(|year| (year, *cost))
        })
        .collect();
    for required in REQUIRED_PROJECTION_YEARS {
        if !years.iter().any(|(year, _)| *year == required) {
            years.push((required, totals.annual_operating_costs * f64::from(required)));
        }
    }
    years.sort_by_key(|(year, _)| *year);
    for (year, cost) in years {
        field(&mut report, &format!("Year {year} Operating Costs:"), format::money(cost));
        field(
            &mut report,
            &format!("  Total through Year {year}:"),
            format::money(totals.one_time_fees + cost),
        );
    }
    report.push('\n');

    if !breakdown.needs_rules.is_empty() {
        section(&mut report, "FEES REQUIRING MANUAL REVIEW");
        for fee in &breakdown.needs_rules {
            let _ = write!(report, "  • {} ({}, {})", fee.fee_name, fee.agency_name, fee.basis);
            if let Some(estimate) = fee.fallback_estimate {
                let _ = write!(report, ": listed rate {}", format::money(estimate));
            }
            report.push('\n');
            if let Some(formula) = &fee.formula_display {
                let _ = writeln!(report, "      Formula: {formula}");
            }
        }
        report.push_str("  These amounts are not included in any total above.\n\n");
    }

    if !breakdown.skipped.is_empty() {
        report.push_str("Fees Not Calculated:\n");
        for fee in &breakdown.skipped {
            let _ = writeln!(
                report,
                "  • {} ({}): {}",
                fee.fee_name,
                fee.agency_name,
                fee.reason.describe()
            );
        }
        report.push('\n');
    }

    let (included, excluded): (Vec<CoverageCategory>, Vec<CoverageCategory>) =
        CoverageCategory::ordered()
            .into_iter()
            .partition(|category| breakdown.fees.iter().any(|fee| category.covers(fee)));

    report.push_str("What This Report Includes:\n");
    if breakdown.fees.is_empty() {
        report.push_str("  • No applicable fees were found for this project\n");
    }
    for category in &included {
        let _ = writeln!(report, "  • {}", category.label());
    }
    for share in totals.category_shares() {
        let _ = writeln!(
            report,
            "  • {}: {} ({:.1}%)",
            share.category,
            format::money(share.amount),
            share.percentage
        );
    }
    report.push('\n');

    report.push_str("What This Report Does NOT Include:\n");
    for category in &excluded {
        let _ = writeln!(report, "  • {}", category.label());
    }
    for item in ALWAYS_EXCLUDED {
        let _ = writeln!(report, "  • {item}");
    }
    report.push('\n');

    heavy_rule(&mut report);
    report.push_str("END OF REPORT\n");
    heavy_rule(&mut report);
    report
}

fn timeline(breakdown: &FeeBreakdown) -> Vec<String> {
    let totals = &breakdown.totals;
    let mut lines = Vec::new();

    let impact: f64 = breakdown
        .one_time()
        .filter(|fee| CoverageCategory::ImpactFees.covers(fee))
        .map(|fee| fee.amount)
        .sum();
    if impact > 0.0 {
        lines.push(format!(
            "At building permit issuance: impact fees of {}",
            format::money(impact)
        ));
    }
    if totals.one_time_fees > 0.0 {
        lines.push(format!(
            "Before certificate of occupancy: one-time fees totaling {}",
            format::money(totals.one_time_fees)
        ));
    }
    if totals.monthly_fees > 0.0 {
        lines.push(format!(
            "From occupancy: {} per month ({} per year)",
            format::money(totals.monthly_fees),
            format::money(totals.annual_operating_costs)
        ));
    }
    if lines.is_empty() {
        lines.push("No fees are due on the current inputs".to_string());
    }
    lines
}

fn usage_assumptions(breakdown: &FeeBreakdown) -> Vec<String> {
    let mut lines = Vec::new();
    let uses = |basis: FeeBasis| breakdown.fees.iter().any(|fee| fee.basis == basis);

    if uses(FeeBasis::PerLinearFoot) {
        lines.push("Frontage estimated as the square root of building square footage".to_string());
    }
    if uses(FeeBasis::PerCubicYard) {
        lines.push("Excavation estimated at 0.5 cubic yards per square foot".to_string());
    }
    if uses(FeeBasis::PerAmp) {
        lines.push("Electrical service estimated at 1 amp per 100 sq ft, minimum 100 amps".to_string());
    }
    if uses(FeeBasis::PerCircuit) {
        lines.push("Circuits estimated at 1 per 200 sq ft, minimum 10".to_string());
    }
    if uses(FeeBasis::PerHour) {
        lines.push("Inspection time estimated at 1 hour per 1,000 sq ft, minimum 1 hour".to_string());
    }
    if uses(FeeBasis::PerMillionBtus) {
        lines.push("HVAC load estimated at 50 BTU per square foot".to_string());
    }
    if uses(FeeBasis::PerSquare) {
        lines.push("Roofing area taken as building square footage".to_string());
    }
    if uses(FeeBasis::PerMeterSize) {
        let meter = breakdown
            .project
            .details
            .meter_size()
            .map(|size| format!("{size} water meter"))
            .unwrap_or_else(|| "base-size water meter (no size supplied)".to_string());
        lines.push(format!("Meter-based charges assume a {meter}"));
    }
    if breakdown.totals.monthly_fees > 0.0 {
        lines.push("Monthly charges are fixed; consumption-based charges are not modelled".to_string());
    }
    lines.push("Operating costs are projected at current rates unless escalation is configured".to_string());
    lines
}

fn heavy_rule(report: &mut String) {
    report.push_str(&"═".repeat(RULE_WIDTH));
    report.push('\n');
}

fn light_rule(report: &mut String) {
    report.push_str(&"─".repeat(RULE_WIDTH));
    report.push('\n');
}

fn section(report: &mut String, title: &str) {
    light_rule(report);
    report.push_str(title);
    report.push('\n');
    light_rule(report);
}

fn field(report: &mut String, label: &str, value: String) {
    let _ = writeln!(report, "{label:<35}{value}");
}

fn or_unspecified(value: Option<String>) -> String {
    value.unwrap_or_else(|| "[Not specified]".to_string())
}
