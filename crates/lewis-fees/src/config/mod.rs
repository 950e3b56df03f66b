use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::fees::breakdown::REQUIRED_PROJECTION_YEARS;
use crate::fees::ProjectionPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub catalog: CatalogConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let catalog = CatalogConfig {
            fees_csv: env::var("LEWIS_FEES_CSV").ok().map(PathBuf::from),
            jurisdictions_csv: env::var("LEWIS_JURISDICTIONS_CSV").ok().map(PathBuf::from),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            catalog,
            engine: EngineConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the normalized fee and jurisdiction tables. When both are absent the
/// binaries fall back to the bundled sample catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub fees_csv: Option<PathBuf>,
    pub jurisdictions_csv: Option<PathBuf>,
}

/// Ranking fan-out and projection knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ranking_concurrency: usize,
    pub fetch_timeout: Duration,
    pub projection: ProjectionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ranking_concurrency: 8,
            fetch_timeout: Duration::from_millis(5_000),
            projection: ProjectionPolicy::default(),
        }
    }
}

impl EngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let ranking_concurrency = match env::var("LEWIS_RANKING_CONCURRENCY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidConcurrency(raw)),
            },
            Err(_) => defaults.ranking_concurrency,
        };

        let fetch_timeout = match env::var("LEWIS_FETCH_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            Err(_) => defaults.fetch_timeout,
        };

        let annual_escalation = match env::var("LEWIS_ANNUAL_ESCALATION") {
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value > -1.0 => value,
                _ => return Err(ConfigError::InvalidEscalation(raw)),
            },
            Err(_) => defaults.projection.annual_escalation,
        };

        let years = match env::var("LEWIS_PROJECTION_YEARS") {
            Ok(raw) => parse_projection_years(&raw)?,
            Err(_) => defaults.projection.years,
        };

        Ok(Self {
            ranking_concurrency,
            fetch_timeout,
            projection: ProjectionPolicy {
                years,
                annual_escalation,
            },
        })
    }
}

fn parse_projection_years(raw: &str) -> Result<Vec<u32>, ConfigError> {
    let mut years = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        match token.parse::<u32>() {
            Ok(year) if year > 0 => years.push(year),
            _ => return Err(ConfigError::InvalidProjectionYears(raw.to_string())),
        }
    }

    if years.is_empty() {
        return Err(ConfigError::InvalidProjectionYears(raw.to_string()));
    }

    years.extend(REQUIRED_PROJECTION_YEARS);
    years.sort_unstable();
    years.dedup();
    Ok(years)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidConcurrency(String),
    InvalidTimeout(String),
    InvalidEscalation(String),
    InvalidProjectionYears(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidConcurrency(raw) => write!(
                f,
                "LEWIS_RANKING_CONCURRENCY must be a positive integer (got '{raw}')"
            ),
            ConfigError::InvalidTimeout(raw) => write!(
                f,
                "LEWIS_FETCH_TIMEOUT_MS must be a whole number of milliseconds (got '{raw}')"
            ),
            ConfigError::InvalidEscalation(raw) => write!(
                f,
                "LEWIS_ANNUAL_ESCALATION must be a decimal rate above -1.0 (got '{raw}')"
            ),
            ConfigError::InvalidProjectionYears(raw) => write!(
                f,
                "LEWIS_PROJECTION_YEARS must be a comma-separated list of positive years (got '{raw}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "LEWIS_FEES_CSV",
            "LEWIS_JURISDICTIONS_CSV",
            "LEWIS_RANKING_CONCURRENCY",
            "LEWIS_FETCH_TIMEOUT_MS",
            "LEWIS_ANNUAL_ESCALATION",
            "LEWIS_PROJECTION_YEARS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.catalog.fees_csv.is_none());
        assert_eq!(config.engine.ranking_concurrency, 8);
        assert_eq!(config.engine.fetch_timeout, Duration::from_millis(5_000));
        assert_eq!(config.engine.projection.years, vec![1, 2, 3, 5]);
        assert_eq!(config.engine.projection.annual_escalation, 0.0);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn engine_overrides_are_parsed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LEWIS_RANKING_CONCURRENCY", "3");
        env::set_var("LEWIS_FETCH_TIMEOUT_MS", "250");
        env::set_var("LEWIS_ANNUAL_ESCALATION", "0.03");
        env::set_var("LEWIS_PROJECTION_YEARS", "5, 1,10,5");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.ranking_concurrency, 3);
        assert_eq!(config.engine.fetch_timeout, Duration::from_millis(250));
        assert_eq!(config.engine.projection.annual_escalation, 0.03);
        assert_eq!(config.engine.projection.years, vec![1, 2, 3, 5, 10]);
        reset_env();
    }

    #[test]
    fn rejects_zero_concurrency() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LEWIS_RANKING_CONCURRENCY", "0");
        match AppConfig::load() {
            Err(ConfigError::InvalidConcurrency(raw)) => assert_eq!(raw, "0"),
            other => panic!("expected concurrency error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_empty_projection_years() {
        assert!(matches!(
            parse_projection_years(" , "),
            Err(ConfigError::InvalidProjectionYears(_))
        ));
    }
}
