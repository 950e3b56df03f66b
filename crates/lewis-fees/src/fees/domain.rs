use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label used for fees that are not scoped to a service area.
pub const CITYWIDE: &str = "Citywide";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    Residential,
    Commercial,
    #[serde(rename = "Mixed-Use", alias = "Mixed-use", alias = "MixedUse", alias = "mixed_use")]
    MixedUse,
    Industrial,
    #[serde(alias = "Public")]
    Other,
}

impl ProjectType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Residential => "Residential",
            Self::Commercial => "Commercial",
            Self::MixedUse => "Mixed-Use",
            Self::Industrial => "Industrial",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProjectType {
    type Err = DomainParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "residential" => Ok(Self::Residential),
            "commercial" => Ok(Self::Commercial),
            "mixeduse" | "mixed" => Ok(Self::MixedUse),
            "industrial" => Ok(Self::Industrial),
            "other" | "public" => Ok(Self::Other),
            _ => Err(DomainParseError::ProjectType(value.to_string())),
        }
    }
}

/// Calculation method declared on a fee row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBasis {
    Flat,
    PerUnit,
    #[serde(alias = "per_sq_ft")]
    PerSqft,
    PerTrip,
    PerAcre,
    PerMeterSize,
    PerMonth,
    PerHour,
    PerCircuit,
    PerAmp,
    PerCubicYard,
    PerLinearFoot,
    PerSection,
    PerSquare,
    PerMillionBtus,
    PerAlteration,
    Percentage,
    PerCost,
    Tiered,
    Formula,
}

impl FeeBasis {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::PerUnit => "per_unit",
            Self::PerSqft => "per_sqft",
            Self::PerTrip => "per_trip",
            Self::PerAcre => "per_acre",
            Self::PerMeterSize => "per_meter_size",
            Self::PerMonth => "per_month",
            Self::PerHour => "per_hour",
            Self::PerCircuit => "per_circuit",
            Self::PerAmp => "per_amp",
            Self::PerCubicYard => "per_cubic_yard",
            Self::PerLinearFoot => "per_linear_foot",
            Self::PerSection => "per_section",
            Self::PerSquare => "per_square",
            Self::PerMillionBtus => "per_million_btus",
            Self::PerAlteration => "per_alteration",
            Self::Percentage => "percentage",
            Self::PerCost => "per_cost",
            Self::Tiered => "tiered",
            Self::Formula => "formula",
        }
    }

    /// Formula and tiered schedules are never approximated by the engine.
    pub const fn needs_rules(self) -> bool {
        matches!(self, Self::Formula | Self::Tiered)
    }
}

impl fmt::Display for FeeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FeeBasis {
    type Err = DomainParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tag = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let basis = match tag.as_str() {
            "flat" => Self::Flat,
            "per_unit" => Self::PerUnit,
            "per_sqft" | "per_sq_ft" => Self::PerSqft,
            "per_trip" => Self::PerTrip,
            "per_acre" => Self::PerAcre,
            "per_meter_size" => Self::PerMeterSize,
            "per_month" => Self::PerMonth,
            "per_hour" => Self::PerHour,
            "per_circuit" => Self::PerCircuit,
            "per_amp" => Self::PerAmp,
            "per_cubic_yard" => Self::PerCubicYard,
            "per_linear_foot" => Self::PerLinearFoot,
            "per_section" => Self::PerSection,
            "per_square" => Self::PerSquare,
            "per_million_btus" => Self::PerMillionBtus,
            "per_alteration" => Self::PerAlteration,
            "percentage" => Self::Percentage,
            "per_cost" => Self::PerCost,
            "tiered" => Self::Tiered,
            "formula" => Self::Formula,
            _ => return Err(DomainParseError::FeeBasis(value.to_string())),
        };
        Ok(basis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainParseError {
    #[error("unknown project type '{0}'")]
    ProjectType(String),
    #[error("unknown fee basis '{0}'")]
    FeeBasis(String),
}

/// Rate exactly as it appears in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRate {
    Number(f64),
    Text(String),
}

impl From<f64> for RawRate {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawRate {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Where a fee row came from. Never used in arithmetic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
}

/// Raw fee row supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRule {
    pub fee_id: String,
    pub jurisdiction_id: String,
    pub agency_name: String,
    pub fee_name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub basis: FeeBasis,
    pub rate: RawRate,
    #[serde(default)]
    pub unit_label: Option<String>,
    #[serde(default)]
    pub applies_to: Option<ProjectType>,
    #[serde(default)]
    pub use_subtype: Option<String>,
    #[serde(default)]
    pub min_units: Option<u32>,
    #[serde(default)]
    pub max_units: Option<u32>,
    #[serde(default)]
    pub service_area_id: Option<String>,
    #[serde(default)]
    pub service_area_name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub min_fee: Option<f64>,
    #[serde(default)]
    pub max_fee: Option<f64>,
    #[serde(default)]
    pub formula_display: Option<String>,
    #[serde(default)]
    pub provenance: Provenance,
}

fn default_active() -> bool {
    true
}

impl FeeRule {
    /// Minimal active, jurisdiction-wide rule; catalogs and fixtures fill in the rest.
    pub fn new(
        fee_id: impl Into<String>,
        jurisdiction_id: impl Into<String>,
        agency_name: impl Into<String>,
        fee_name: impl Into<String>,
        basis: FeeBasis,
        rate: impl Into<RawRate>,
    ) -> Self {
        Self {
            fee_id: fee_id.into(),
            jurisdiction_id: jurisdiction_id.into(),
            agency_name: agency_name.into(),
            fee_name: fee_name.into(),
            category: None,
            basis,
            rate: rate.into(),
            unit_label: None,
            applies_to: None,
            use_subtype: None,
            min_units: None,
            max_units: None,
            service_area_id: None,
            service_area_name: None,
            active: true,
            min_fee: None,
            max_fee: None,
            formula_display: None,
            provenance: Provenance::default(),
        }
    }

    pub fn category_label(&self) -> &str {
        self.category
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or("Other")
    }

    pub fn service_area_label(&self) -> &str {
        match (&self.service_area_name, &self.service_area_id) {
            (Some(name), _) => name,
            (None, Some(id)) => id,
            (None, None) => CITYWIDE,
        }
    }

    /// Monthly charges are either declared `per_month` or labelled as such.
    pub fn is_recurring(&self) -> bool {
        if self.basis == FeeBasis::PerMonth {
            return true;
        }

        self.unit_label.as_deref().is_some_and(|label| {
            let label = label.to_ascii_lowercase();
            label.contains("per month") || label.contains("monthly") || label.contains("/month")
        })
    }
}

/// Jurisdiction-independent description of a proposed project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    pub project_type: ProjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_units: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_acreage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meter_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_count: Option<f64>,
}

impl ProjectDetails {
    pub fn new(project_type: ProjectType) -> Self {
        Self {
            project_type,
            use_subtype: None,
            num_units: None,
            square_feet: None,
            project_value: None,
            project_acreage: None,
            meter_size: None,
            trip_count: None,
        }
    }

    pub fn units(&self) -> Option<f64> {
        self.num_units.filter(|units| *units > 0).map(f64::from)
    }

    pub fn square_feet(&self) -> Option<f64> {
        positive(self.square_feet)
    }

    pub fn project_value(&self) -> Option<f64> {
        positive(self.project_value)
    }

    pub fn acreage(&self) -> Option<f64> {
        positive(self.project_acreage)
    }

    pub fn trips(&self) -> Option<f64> {
        positive(self.trip_count)
    }

    pub fn meter_size(&self) -> Option<&str> {
        self.meter_size
            .as_deref()
            .map(str::trim)
            .filter(|size| !size.is_empty())
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Full query for a single jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInputs {
    pub jurisdiction_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(default)]
    pub selected_service_area_ids: Vec<String>,
    #[serde(flatten)]
    pub details: ProjectDetails,
}

impl ProjectInputs {
    pub fn new(jurisdiction_name: impl Into<String>, details: ProjectDetails) -> Self {
        Self {
            jurisdiction_name: jurisdiction_name.into(),
            state_code: None,
            selected_service_area_ids: Vec::new(),
            details,
        }
    }
}

/// One evaluated fee row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedFee {
    pub fee_id: String,
    pub fee_name: String,
    pub agency_name: String,
    pub category: String,
    pub basis: FeeBasis,
    pub service_area: String,
    pub amount: f64,
    pub is_recurring: bool,
    pub calculation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_label: Option<String>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl CalculatedFee {
    /// Amount over a year: monthly charges count twelve times.
    pub fn annualized_amount(&self) -> f64 {
        if self.is_recurring {
            self.amount * 12.0
        } else {
            self.amount
        }
    }
}

/// Formula or tiered fee that matched but needs a manual schedule lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsRulesFee {
    pub fee_id: String,
    pub fee_name: String,
    pub agency_name: String,
    pub category: String,
    pub basis: FeeBasis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_estimate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "quantity", rename_all = "snake_case")]
pub enum SkipReason {
    UnparseableRate,
    MissingQuantity(String),
    AmountOutOfRange,
}

impl SkipReason {
    pub fn describe(&self) -> String {
        match self {
            Self::UnparseableRate => "rate could not be parsed".to_string(),
            Self::MissingQuantity(quantity) => format!("requires {quantity}"),
            Self::AmountOutOfRange => "computed amount is not a usable number".to_string(),
        }
    }
}

/// Matched row that contributed nothing because it could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFee {
    pub fee_id: String,
    pub fee_name: String,
    pub agency_name: String,
    pub reason: SkipReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_type_parses_loose_spellings() {
        assert_eq!("mixed-use".parse::<ProjectType>(), Ok(ProjectType::MixedUse));
        assert_eq!(" Residential ".parse::<ProjectType>(), Ok(ProjectType::Residential));
        assert_eq!("Public".parse::<ProjectType>(), Ok(ProjectType::Other));
        assert!("spaceport".parse::<ProjectType>().is_err());
    }

    #[test]
    fn fee_basis_round_trips_tags() {
        assert_eq!("per-sq-ft".parse::<FeeBasis>(), Ok(FeeBasis::PerSqft));
        assert_eq!("Per Million BTUs".parse::<FeeBasis>(), Ok(FeeBasis::PerMillionBtus));
        assert_eq!(FeeBasis::PerMeterSize.tag(), "per_meter_size");
        assert!("per_moon".parse::<FeeBasis>().is_err());
    }

    #[test]
    fn recurring_follows_basis_or_label() {
        let mut rule = FeeRule::new("f1", "austin", "Austin Water", "Base charge", FeeBasis::Flat, 30.0);
        assert!(!rule.is_recurring());
        rule.unit_label = Some("per month".to_string());
        assert!(rule.is_recurring());

        let monthly = FeeRule::new("f2", "austin", "Austin Water", "Drainage", FeeBasis::PerMonth, 12.0);
        assert!(monthly.is_recurring());
    }

    #[test]
    fn project_inputs_use_camel_case_contract() {
        let raw = r#"{
            "jurisdictionName": "Austin",
            "stateCode": "TX",
            "selectedServiceAreaIds": [],
            "projectType": "Mixed-Use",
            "numUnits": 50,
            "squareFeet": 45000,
            "meterSize": "2\""
        }"#;
        let inputs: ProjectInputs = serde_json::from_str(raw).expect("inputs parse");
        assert_eq!(inputs.details.project_type, ProjectType::MixedUse);
        assert_eq!(inputs.details.num_units, Some(50));
        assert_eq!(inputs.details.meter_size(), Some("2\""));
        assert!(inputs.selected_service_area_ids.is_empty());
    }

    #[test]
    fn non_positive_quantities_read_as_missing() {
        let mut details = ProjectDetails::new(ProjectType::Commercial);
        details.square_feet = Some(0.0);
        details.project_value = Some(f64::NAN);
        details.num_units = Some(0);
        assert_eq!(details.square_feet(), None);
        assert_eq!(details.project_value(), None);
        assert_eq!(details.units(), None);
    }
}
