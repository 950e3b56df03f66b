//! Read-only loader for normalized fee and jurisdiction tables exported as CSV.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use super::{CatalogError, InMemoryFeeCatalog, Jurisdiction};
use crate::fees::{FeeBasis, FeeRule, ProjectType, Provenance, RawRate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvCatalogPaths {
    pub fees: PathBuf,
    /// Without a jurisdiction table, jurisdictions are derived from fee rows.
    pub jurisdictions: Option<PathBuf>,
}

impl CsvCatalogPaths {
    pub fn load(&self) -> Result<InMemoryFeeCatalog, CatalogError> {
        let rules = load_fee_rules(File::open(&self.fees)?)?;
        let jurisdictions = match &self.jurisdictions {
            Some(path) => load_jurisdictions(File::open(path)?)?,
            None => derive_jurisdictions(&rules),
        };

        info!(
            fees = %self.fees.display(),
            rules = rules.len(),
            jurisdictions = jurisdictions.len(),
            "loaded fee catalog from CSV"
        );
        Ok(InMemoryFeeCatalog::new(jurisdictions, rules))
    }
}

fn derive_jurisdictions(rules: &[FeeRule]) -> Vec<Jurisdiction> {
    let ids: BTreeMap<&str, ()> = rules
        .iter()
        .map(|rule| (rule.jurisdiction_id.as_str(), ()))
        .collect();
    ids.into_keys()
        .map(|id| Jurisdiction {
            id: id.to_string(),
            name: id.to_string(),
            state_code: None,
            kind: None,
            population: None,
            is_active: true,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct FeeRow {
    fee_id: String,
    jurisdiction_id: String,
    agency_name: String,
    fee_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    category: Option<String>,
    calc_type: String,
    #[serde(default)]
    rate: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    unit_label: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    applies_to: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    use_subtype: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    min_units: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    max_units: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    service_area_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    service_area_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_active: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    min_fee: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    max_fee: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    formula_display: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    source_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    legal_citation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    effective_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JurisdictionRow {
    id: String,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    state_code: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    jurisdiction_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    population: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_active: Option<String>,
}

/// Parses the fee table. Rows with a calculation basis or project type this
/// build does not know are skipped with a warning; malformed values fail the load.
pub fn load_fee_rules<R: Read>(reader: R) -> Result<Vec<FeeRule>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut rules = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let row: FeeRow = record.deserialize(Some(&headers))?;

        let basis = match row.calc_type.parse::<FeeBasis>() {
            Ok(basis) => basis,
            Err(error) => {
                warn!(line, fee_id = %row.fee_id, %error, "skipping fee row");
                continue;
            }
        };
        let applies_to = match row.applies_to.as_deref().map(str::parse::<ProjectType>) {
            None => None,
            Some(Ok(project_type)) => Some(project_type),
            Some(Err(error)) => {
                warn!(line, fee_id = %row.fee_id, %error, "skipping fee row");
                continue;
            }
        };

        rules.push(FeeRule {
            fee_id: row.fee_id,
            jurisdiction_id: row.jurisdiction_id,
            agency_name: row.agency_name,
            fee_name: row.fee_name,
            category: row.category,
            basis,
            rate: RawRate::Text(row.rate),
            unit_label: row.unit_label,
            applies_to,
            use_subtype: row.use_subtype,
            min_units: parse_field(line, "min_units", row.min_units.as_deref())?,
            max_units: parse_field(line, "max_units", row.max_units.as_deref())?,
            service_area_id: row.service_area_id,
            service_area_name: row.service_area_name,
            active: parse_flag(line, row.is_active.as_deref())?,
            min_fee: parse_field(line, "min_fee", row.min_fee.as_deref())?,
            max_fee: parse_field(line, "max_fee", row.max_fee.as_deref())?,
            formula_display: row.formula_display,
            provenance: Provenance {
                source_url: row.source_url,
                legal_citation: row.legal_citation,
                effective_date: parse_date(line, row.effective_date.as_deref())?,
            },
        });
    }

    Ok(rules)
}

pub fn load_jurisdictions<R: Read>(reader: R) -> Result<Vec<Jurisdiction>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut jurisdictions = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let row: JurisdictionRow = record.deserialize(Some(&headers))?;

        jurisdictions.push(Jurisdiction {
            id: row.id,
            name: row.name,
            state_code: row.state_code,
            kind: row.jurisdiction_type,
            population: parse_population(line, row.population.as_deref())?,
            is_active: parse_flag(line, row.is_active.as_deref())?,
        });
    }

    Ok(jurisdictions)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_field<T>(line: u64, column: &str, value: Option<&str>) -> Result<Option<T>, CatalogError>
where
    T: std::str::FromStr,
{
    value
        .map(|raw| {
            raw.replace(',', "")
                .parse::<T>()
                .map_err(|_| CatalogError::InvalidRow {
                    line,
                    message: format!("{column} '{raw}' is not a number"),
                })
        })
        .transpose()
}

/// Whole people: `974447`, `"1,000,000"` and spreadsheet exports like `1000000.00`.
fn parse_population(line: u64, value: Option<&str>) -> Result<Option<u64>, CatalogError> {
    let Some(count) = parse_field::<f64>(line, "population", value)? else {
        return Ok(None);
    };
    if !count.is_finite() || count < 0.0 || count.fract() != 0.0 || count > u64::MAX as f64 {
        return Err(CatalogError::InvalidRow {
            line,
            message: format!("population '{}' is not a whole count", value.unwrap_or_default()),
        });
    }
    Ok(Some(count as u64))
}

fn parse_flag(line: u64, value: Option<&str>) -> Result<bool, CatalogError> {
    let Some(raw) = value else {
        return Ok(true);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(CatalogError::InvalidRow {
            line,
            message: format!("is_active '{raw}' is not a boolean"),
        }),
    }
}

fn parse_date(line: u64, value: Option<&str>) -> Result<Option<NaiveDate>, CatalogError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
                .map_err(|_| CatalogError::InvalidRow {
                    line,
                    message: format!("effective_date '{raw}' is not a date"),
                })
        })
        .transpose()
}
