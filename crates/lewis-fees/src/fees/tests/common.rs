use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::catalog::{CatalogError, FeeCatalog, InMemoryFeeCatalog, Jurisdiction};
use crate::fees::{
    fee_router, FeeBasis, FeeCalculatorService, FeeRule, ProjectDetails, ProjectInputs,
    ProjectType, ProjectionPolicy,
};

pub(super) const AUSTIN: &str = "austin";

pub(super) fn jurisdictions() -> Vec<Jurisdiction> {
    vec![
        Jurisdiction::new(AUSTIN, "Austin", "TX").with_population(974_447),
        Jurisdiction::new("denver", "Denver", "CO").with_population(715_522),
    ]
}

fn rule(id: &str, agency: &str, name: &str, category: &str, basis: FeeBasis, rate: f64) -> FeeRule {
    let mut rule = FeeRule::new(id, AUSTIN, agency, name, basis, rate);
    rule.category = Some(category.to_string());
    rule
}

/// Austin schedule exercising every applicability path.
pub(super) fn austin_rules() -> Vec<FeeRule> {
    let building = rule(
        "bp-1",
        "Development Services Department",
        "Building Permit",
        "Building Permits",
        FeeBasis::PerSqft,
        0.25,
    );

    let mut street = rule(
        "tia-1",
        "Austin Transportation",
        "Street Impact Fee",
        "Impact Fees",
        FeeBasis::PerUnit,
        1_512.0,
    );
    street.applies_to = Some(ProjectType::Residential);
    street.use_subtype = Some("Multifamily".to_string());

    let water = rule(
        "wcr-1",
        "Austin Water",
        "Water Capital Recovery Fee",
        "Water Utility",
        FeeBasis::PerMeterSize,
        5_000.0,
    );

    let wastewater = rule(
        "ww-1",
        "Austin Water",
        "Wastewater Monthly Base Charge",
        "Wastewater Utility",
        FeeBasis::PerMonth,
        45.0,
    );

    let mut duplex = rule(
        "tuf-2",
        "Austin Transportation",
        "Transportation User Fee - Duplex",
        "Transportation",
        FeeBasis::PerMonth,
        20.0,
    );
    duplex.use_subtype = Some("Duplex".to_string());

    let mut parkland = rule(
        "pk-1",
        "Parks and Recreation",
        "Parkland Dedication Fee",
        "Parks",
        FeeBasis::Formula,
        1_200.0,
    );
    parkland.formula_display = Some("units × land value × dedication rate".to_string());

    let mut drainage = FeeRule::new(
        "dr-1",
        AUSTIN,
        "Watershed Protection",
        "Drainage Charge",
        FeeBasis::Flat,
        "N/A",
    );
    drainage.category = Some("Drainage".to_string());

    let mut south = rule(
        "tia-s",
        "Austin Transportation",
        "Street Impact Fee - South Service Area",
        "Impact Fees",
        FeeBasis::PerUnit,
        500.0,
    );
    south.service_area_id = Some("south".to_string());
    south.service_area_name = Some("South Service Area".to_string());

    vec![building, street, water, wastewater, duplex, parkland, drainage, south]
}

pub(super) fn catalog() -> InMemoryFeeCatalog {
    InMemoryFeeCatalog::new(jurisdictions(), austin_rules())
}

/// 50-unit multifamily, 45,000 sq ft, $15M, 2" meter.
pub(super) fn multifamily_details() -> ProjectDetails {
    let mut details = ProjectDetails::new(ProjectType::Residential);
    details.use_subtype = Some("Multifamily".to_string());
    details.num_units = Some(50);
    details.square_feet = Some(45_000.0);
    details.project_value = Some(15_000_000.0);
    details.meter_size = Some("2\"".to_string());
    details
}

pub(super) fn austin_inputs() -> ProjectInputs {
    let mut inputs = ProjectInputs::new("Austin", multifamily_details());
    inputs.state_code = Some("TX".to_string());
    inputs
}

pub(super) fn service() -> Arc<FeeCalculatorService<InMemoryFeeCatalog>> {
    Arc::new(FeeCalculatorService::new(
        Arc::new(catalog()),
        ProjectionPolicy::default(),
    ))
}

/// Lists jurisdictions but cannot serve fee rows.
pub(super) struct RowsUnavailable;

impl FeeCatalog for RowsUnavailable {
    fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, CatalogError> {
        Ok(jurisdictions())
    }

    fn fee_rules(&self, _jurisdiction_id: &str) -> Result<Vec<FeeRule>, CatalogError> {
        Err(CatalogError::Unavailable("fee table offline".to_string()))
    }
}

/// Cannot list jurisdictions at all.
pub(super) struct CatalogOffline;

impl FeeCatalog for CatalogOffline {
    fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, CatalogError> {
        Err(CatalogError::Unavailable("connection refused".to_string()))
    }

    fn fee_rules(&self, _jurisdiction_id: &str) -> Result<Vec<FeeRule>, CatalogError> {
        Err(CatalogError::Unavailable("connection refused".to_string()))
    }
}

pub(super) fn router_with<C: FeeCatalog + 'static>(catalog: C) -> axum::Router {
    fee_router(Arc::new(FeeCalculatorService::new(
        Arc::new(catalog),
        ProjectionPolicy::default(),
    )))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
