use lewis_fees::catalog::{CatalogError, CsvCatalogPaths, InMemoryFeeCatalog};
use lewis_fees::config::CatalogConfig;
use lewis_fees::fees::ProjectType;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the configured CSV catalog, or the bundled sample catalog when no fee
/// table is configured.
pub(crate) fn load_catalog(config: &CatalogConfig) -> Result<InMemoryFeeCatalog, CatalogError> {
    match &config.fees_csv {
        Some(fees) => CsvCatalogPaths {
            fees: fees.clone(),
            jurisdictions: config.jurisdictions_csv.clone(),
        }
        .load(),
        None => {
            let catalog = crate::demo::sample_catalog();
            info!(
                rules = catalog.rule_count(),
                "no fee table configured; using bundled sample catalog"
            );
            Ok(catalog)
        }
    }
}

/// Command-line paths take precedence over the environment.
pub(crate) fn merge_catalog_paths(
    mut config: CatalogConfig,
    fees_csv: Option<PathBuf>,
    jurisdictions_csv: Option<PathBuf>,
) -> CatalogConfig {
    if fees_csv.is_some() {
        config.fees_csv = fees_csv;
    }
    if jurisdictions_csv.is_some() {
        config.jurisdictions_csv = jurisdictions_csv;
    }
    config
}

pub(crate) fn parse_project_type(raw: &str) -> Result<ProjectType, String> {
    raw.parse::<ProjectType>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_sample_catalog() {
        let catalog = load_catalog(&CatalogConfig::default()).expect("sample catalog");
        assert!(catalog.rule_count() > 0);
    }

    #[test]
    fn missing_csv_is_reported() {
        let config = CatalogConfig {
            fees_csv: Some(PathBuf::from("/nonexistent/fees.csv")),
            jurisdictions_csv: None,
        };
        assert!(matches!(load_catalog(&config), Err(CatalogError::Io(_))));
    }

    #[test]
    fn cli_paths_override_environment() {
        let base = CatalogConfig {
            fees_csv: Some(PathBuf::from("env-fees.csv")),
            jurisdictions_csv: Some(PathBuf::from("env-jurisdictions.csv")),
        };
        let merged = merge_catalog_paths(base, Some(PathBuf::from("cli-fees.csv")), None);
        assert_eq!(merged.fees_csv, Some(PathBuf::from("cli-fees.csv")));
        assert_eq!(
            merged.jurisdictions_csv,
            Some(PathBuf::from("env-jurisdictions.csv"))
        );
    }

    #[test]
    fn project_type_errors_are_readable() {
        assert_eq!(parse_project_type("mixed use"), Ok(ProjectType::MixedUse));
        assert!(parse_project_type("spaceport")
            .unwrap_err()
            .contains("spaceport"));
    }
}
