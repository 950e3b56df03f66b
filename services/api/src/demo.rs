use crate::cli::{CatalogArgs, FeesCommand};
use crate::infra::{load_catalog, merge_catalog_paths};
use clap::Args;
use lewis_fees::catalog::{InMemoryFeeCatalog, Jurisdiction};
use lewis_fees::config::{AppConfig, EngineConfig};
use lewis_fees::error::AppError;
use lewis_fees::fees::format::money;
use lewis_fees::fees::{
    DataStatus, FeeBasis, FeeBreakdown, FeeCalculatorService, FeeRule, ProjectDetails,
    ProjectInputs, ProjectType,
};
use lewis_fees::ranking::{ExclusionReason, RankingOutcome, RankingService};
use serde_json::json;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ProjectArgs {
    /// Residential, Commercial, Mixed-Use, Industrial, or Other
    #[arg(long, value_parser = crate::infra::parse_project_type, default_value = "Residential")]
    pub(crate) project_type: ProjectType,
    /// Use subtype such as Multifamily, Duplex, or Single Family
    #[arg(long)]
    pub(crate) use_subtype: Option<String>,
    /// Number of dwelling units
    #[arg(long)]
    pub(crate) units: Option<u32>,
    /// Gross building square footage
    #[arg(long)]
    pub(crate) square_feet: Option<f64>,
    /// Construction valuation in dollars
    #[arg(long)]
    pub(crate) project_value: Option<f64>,
    /// Site acreage
    #[arg(long)]
    pub(crate) acreage: Option<f64>,
    /// Water meter size, e.g. 2" or 5/8" x 3/4"
    #[arg(long)]
    pub(crate) meter_size: Option<String>,
    /// Average daily vehicle trips
    #[arg(long)]
    pub(crate) trips: Option<f64>,
}

impl ProjectArgs {
    pub(crate) fn details(&self) -> ProjectDetails {
        ProjectDetails {
            project_type: self.project_type,
            use_subtype: self.use_subtype.clone(),
            num_units: self.units,
            square_feet: self.square_feet,
            project_value: self.project_value,
            project_acreage: self.acreage,
            meter_size: self.meter_size.clone(),
            trip_count: self.trips,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct FeeArgs {
    /// Jurisdiction name or id
    #[arg(long)]
    pub(crate) jurisdiction: String,
    /// Two-letter state code used to disambiguate the jurisdiction
    #[arg(long)]
    pub(crate) state: Option<String>,
    /// Service area id to include (repeatable)
    #[arg(long)]
    pub(crate) service_area: Vec<String>,
    #[command(flatten)]
    pub(crate) project: ProjectArgs,
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
    /// Print JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    #[command(flatten)]
    pub(crate) project: ProjectArgs,
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
    /// Only print the best N jurisdictions
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Print JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Jurisdiction used for the calculation and report portion of the demo
    #[arg(long, default_value = "Austin")]
    pub(crate) jurisdiction: String,
    /// How many ranked jurisdictions to show
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
}

fn load_context(catalog: CatalogArgs) -> Result<(Arc<InMemoryFeeCatalog>, EngineConfig), AppError> {
    let config = AppConfig::load()?;
    let catalog_config =
        merge_catalog_paths(config.catalog, catalog.fees_csv, catalog.jurisdictions_csv);
    Ok((Arc::new(load_catalog(&catalog_config)?), config.engine))
}

fn fee_service(catalog: CatalogArgs) -> Result<FeeCalculatorService<InMemoryFeeCatalog>, AppError> {
    let (catalog, engine) = load_context(catalog)?;
    Ok(FeeCalculatorService::new(catalog, engine.projection))
}

fn project_inputs(args: &FeeArgs) -> ProjectInputs {
    let mut inputs = ProjectInputs::new(args.jurisdiction.clone(), args.project.details());
    inputs.state_code = args.state.clone();
    inputs.selected_service_area_ids = args.service_area.clone();
    inputs
}

pub(crate) fn run_fee_command(command: FeesCommand) -> Result<(), AppError> {
    match command {
        FeesCommand::Calculate(args) => {
            let inputs = project_inputs(&args);
            let breakdown = fee_service(args.catalog)?.calculate(inputs)?;
            if args.json {
                print_json(&json!(breakdown));
            } else {
                render_breakdown(&breakdown);
            }
        }
        FeesCommand::Report(args) => {
            let inputs = project_inputs(&args);
            let (report, breakdown) = fee_service(args.catalog)?.report(inputs)?;
            if args.json {
                print_json(&json!({ "report": report, "breakdown": breakdown }));
            } else {
                print!("{report}");
            }
        }
    }
    Ok(())
}

pub(crate) async fn run_ranking(args: RankArgs) -> Result<(), AppError> {
    let (catalog, engine) = load_context(args.catalog)?;
    let service = RankingService::new(catalog, &engine);
    let details = args.project.details();

    let outcome = match args.limit {
        Some(limit) => service.top_jurisdictions(&details, limit).await?,
        None => service.rank_jurisdictions(&details).await?,
    };

    if args.json {
        print_json(&json!(outcome));
    } else {
        render_ranking(&outcome);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        jurisdiction,
        top,
        catalog,
    } = args;
    let (catalog, engine) = load_context(catalog)?;

    println!("LEWIS fee estimation demo");
    let details = demo_project();
    println!(
        "Project: {} {} ({} units, {} sq ft, {} valuation)",
        details.use_subtype.as_deref().unwrap_or("Unspecified"),
        details.project_type,
        details.num_units.unwrap_or_default(),
        details.square_feet.unwrap_or_default(),
        money(details.project_value.unwrap_or_default())
    );

    let fees = FeeCalculatorService::new(Arc::clone(&catalog), engine.projection.clone());
    let breakdown = fees.calculate(ProjectInputs::new(jurisdiction, details.clone()))?;
    println!();
    render_breakdown(&breakdown);

    let (report, _) = fees.report(breakdown.project.clone())?;
    println!();
    print!("{report}");

    let ranking = RankingService::new(catalog, &engine);
    let outcome = ranking.top_jurisdictions(&details, top).await?;
    println!();
    render_ranking(&outcome);
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("JSON output unavailable: {err}"),
    }
}

fn demo_project() -> ProjectDetails {
    ProjectDetails {
        project_type: ProjectType::Residential,
        use_subtype: Some("Multifamily".to_string()),
        num_units: Some(50),
        square_feet: Some(45_000.0),
        project_value: Some(15_000_000.0),
        project_acreage: Some(1.5),
        meter_size: Some("2\"".to_string()),
        trip_count: Some(330.0),
    }
}

pub(crate) fn render_breakdown(breakdown: &FeeBreakdown) {
    println!("Fee breakdown: {}", breakdown.jurisdiction_name);
    if let DataStatus::Unavailable { reason } = &breakdown.data_status {
        println!("  Fee data unavailable: {reason}");
        return;
    }

    if breakdown.fees.is_empty() {
        println!("  No applicable fees");
    }
    for fee in &breakdown.fees {
        let cadence = if fee.is_recurring { "/mo" } else { "" };
        println!(
            "  {:<48} {:>16}{cadence}  {}",
            fee.fee_name,
            money(fee.amount),
            fee.calculation
        );
    }

    let totals = &breakdown.totals;
    println!("One-time fees:          {}", money(totals.one_time_fees));
    println!("Monthly fees:           {}", money(totals.monthly_fees));
    println!("Annual operating costs: {}", money(totals.annual_operating_costs));
    println!("First-year total:       {}", money(totals.first_year_total));

    if !breakdown.needs_rules.is_empty() {
        println!("Requires manual review (not in totals):");
        for fee in &breakdown.needs_rules {
            println!("- {} ({})", fee.fee_name, fee.agency_name);
        }
    }
    if !breakdown.skipped.is_empty() {
        println!("Not calculated:");
        for fee in &breakdown.skipped {
            println!("- {}: {}", fee.fee_name, fee.reason.describe());
        }
    }
}

pub(crate) fn render_ranking(outcome: &RankingOutcome) {
    println!("Jurisdiction ranking");
    if outcome.rankings.is_empty() {
        println!("  No jurisdictions could be ranked");
    }
    for ranking in &outcome.rankings {
        println!(
            "{:>3}. {:<24} {:<3} {:>16}  dev {:>3}  econ {:>3}  overall {:.1}",
            ranking.rank,
            ranking.jurisdiction_name,
            ranking.state_code.as_deref().unwrap_or("--"),
            money(ranking.total_fees),
            ranking.development_friendly,
            ranking.economic_viability,
            ranking.overall_score
        );
        for strength in &ranking.strengths {
            println!("       + {strength}");
        }
        for consideration in &ranking.considerations {
            println!("       - {consideration}");
        }
    }

    if !outcome.excluded.is_empty() {
        println!("Excluded");
        for excluded in &outcome.excluded {
            let reason = match &excluded.reason {
                ExclusionReason::NoApplicableFees => "no applicable fees".to_string(),
                ExclusionReason::DataUnavailable { reason } => format!("data unavailable: {reason}"),
            };
            println!("- {}: {reason}", excluded.jurisdiction_name);
        }
    }
}

fn rule(
    id: &str,
    jurisdiction: &str,
    agency: &str,
    name: &str,
    category: &str,
    basis: FeeBasis,
    rate: f64,
) -> FeeRule {
    let mut rule = FeeRule::new(id, jurisdiction, agency, name, basis, rate);
    rule.category = Some(category.to_string());
    rule
}

fn residential(mut rule: FeeRule, subtype: Option<&str>) -> FeeRule {
    rule.applies_to = Some(ProjectType::Residential);
    rule.use_subtype = subtype.map(str::to_string);
    rule
}

fn monthly(mut rule: FeeRule) -> FeeRule {
    rule.unit_label = Some("per month".to_string());
    rule
}

/// Small built-in catalog so the service and CLI run without a fee database.
pub(crate) fn sample_catalog() -> InMemoryFeeCatalog {
    let jurisdictions = vec![
        Jurisdiction::new("phoenix", "Phoenix", "AZ").with_population(1_608_139),
        Jurisdiction::new("austin", "Austin", "TX").with_population(974_447),
        Jurisdiction::new("denver", "Denver", "CO").with_population(715_522),
        Jurisdiction::new("boise", "Boise", "ID").with_population(235_684),
        Jurisdiction::new("georgetown", "Georgetown", "TX").with_population(96_312),
    ];

    let mut parkland = residential(
        rule(
            "aus-pk",
            "austin",
            "Parks and Recreation",
            "Parkland Dedication Fee",
            "Parks",
            FeeBasis::Formula,
            1_200.0,
        ),
        None,
    );
    parkland.formula_display = Some("units × land value × dedication rate".to_string());

    let mut austin_south = residential(
        rule(
            "aus-tia-s",
            "austin",
            "Austin Transportation",
            "Street Impact Fee",
            "Impact Fees",
            FeeBasis::PerUnit,
            1_800.0,
        ),
        Some("Multifamily"),
    );
    austin_south.service_area_id = Some("south".to_string());
    austin_south.service_area_name = Some("South Service Area".to_string());

    let mut phoenix_permit = rule(
        "phx-bp",
        "phoenix",
        "Planning and Development",
        "Building Permit",
        "Building Permits",
        FeeBasis::Percentage,
        0.45,
    );
    phoenix_permit.min_fee = Some(250.0);

    let rules = vec![
        rule(
            "aus-bp",
            "austin",
            "Development Services Department",
            "Building Permit",
            "Building Permits",
            FeeBasis::PerSqft,
            0.25,
        ),
        residential(
            rule(
                "aus-tia",
                "austin",
                "Austin Transportation",
                "Street Impact Fee",
                "Impact Fees",
                FeeBasis::PerUnit,
                1_512.0,
            ),
            Some("Multifamily"),
        ),
        austin_south,
        rule(
            "aus-wcr",
            "austin",
            "Austin Water",
            "Water Capital Recovery Fee",
            "Water Utility",
            FeeBasis::PerMeterSize,
            5_000.0,
        ),
        rule(
            "aus-ww",
            "austin",
            "Austin Water",
            "Wastewater Monthly Base Charge",
            "Wastewater Utility",
            FeeBasis::PerMonth,
            45.0,
        ),
        monthly(residential(
            rule(
                "aus-tuf",
                "austin",
                "Austin Transportation",
                "Transportation User Fee - Duplex",
                "Transportation",
                FeeBasis::Flat,
                20.0,
            ),
            Some("Duplex"),
        )),
        parkland,
        phoenix_permit,
        rule(
            "phx-pr",
            "phoenix",
            "Planning and Development",
            "Plan Review Fee",
            "Plan Review",
            FeeBasis::PerHour,
            125.0,
        ),
        residential(
            rule(
                "phx-if",
                "phoenix",
                "Phoenix Water Services",
                "Water Impact Fee",
                "Impact Fees",
                FeeBasis::PerUnit,
                2_240.0,
            ),
            None,
        ),
        rule(
            "den-bp",
            "denver",
            "Community Planning and Development",
            "Building Permit",
            "Building Permits",
            FeeBasis::PerSqft,
            0.50,
        ),
        residential(
            rule(
                "den-lk",
                "denver",
                "Community Planning and Development",
                "Affordable Housing Linkage Fee",
                "Impact Fees",
                FeeBasis::PerSqft,
                2.08,
            ),
            None,
        ),
        rule(
            "den-tr",
            "denver",
            "Denver Transportation",
            "Transportation Impact Fee",
            "Transportation",
            FeeBasis::PerTrip,
            42.0,
        ),
        rule(
            "boi-adm",
            "boise",
            "Boise Planning",
            "Application Filing Fee",
            "Administrative",
            FeeBasis::Flat,
            1_850.0,
        ),
        residential(
            rule(
                "boi-if",
                "boise",
                "Boise Planning",
                "Development Impact Fee",
                "Impact Fees",
                FeeBasis::PerUnit,
                3_900.0,
            ),
            None,
        ),
        monthly(rule(
            "boi-sw",
            "boise",
            "Boise Public Works",
            "Sewer Base Charge",
            "Wastewater Utility",
            FeeBasis::Flat,
            38.5,
        )),
        rule(
            "geo-bp",
            "georgetown",
            "Georgetown Building Inspection",
            "Building Permit",
            "Building Permits",
            FeeBasis::PerSqft,
            0.35,
        ),
        rule(
            "geo-wt",
            "georgetown",
            "Georgetown Utility Systems",
            "Water Tap Fee",
            "Water Utility",
            FeeBasis::PerMeterSize,
            2_750.0,
        ),
    ];

    InMemoryFeeCatalog::new(jurisdictions, rules)
}
