use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::allocation::SpreadWeights;

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
    pub guardrails: GuardrailConfig,
    pub sweep: SweepSettings,
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

        let defaults = GuardrailConfig::default();
        let guardrails = GuardrailConfig {
            min_margin_pct: env_number("GUARDRAIL_MIN_MARGIN_PCT", defaults.min_margin_pct)?,
            max_price_change_pct: env_number(
                "GUARDRAIL_MAX_PRICE_CHANGE_PCT",
                defaults.max_price_change_pct,
            )?,
            min_roi: env_number("GUARDRAIL_MIN_ROI", defaults.min_roi)?,
            min_donor_dsr: env_number("GUARDRAIL_MIN_DONOR_DSR", defaults.min_donor_dsr)?,
            max_receiver_dsr: env_number("GUARDRAIL_MAX_RECEIVER_DSR", defaults.max_receiver_dsr)?,
        };

        let sweep_defaults = SweepSettings::default();
        let sweep = SweepSettings {
            max_runs: env_number("SWEEP_MAX_RUNS", sweep_defaults.max_runs)?,
            weights: SpreadWeights {
                outlet: env_number("SPREAD_OUTLET_WEIGHT", sweep_defaults.weights.outlet)?,
                product: env_number("SPREAD_PRODUCT_WEIGHT", sweep_defaults.weights.product)?,
                units: env_number("SPREAD_UNITS_WEIGHT", sweep_defaults.weights.units)?,
            },
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            guardrails,
            sweep,
        })
    }
}

fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        _ => Ok(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Colourised output; off outside development so log shippers get plain text.
    pub ansi: bool,
}

/// Default thresholds for the built-in rails. A decision context may
/// override any of them per evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardrailConfig {
    pub min_margin_pct: f64,
    pub max_price_change_pct: f64,
    pub min_roi: f64,
    pub min_donor_dsr: f64,
    pub max_receiver_dsr: f64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            min_margin_pct: 12.0,
            max_price_change_pct: 15.0,
            min_roi: 0.05,
            min_donor_dsr: 7.0,
            max_receiver_dsr: 60.0,
        }
    }
}

/// Defaults applied to sweeps when a request leaves them out.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSettings {
    /// Run cap and ceiling for request overrides; `0` evaluates whole grids.
    pub max_runs: usize,
    pub weights: SpreadWeights,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            max_runs: 48,
            weights: SpreadWeights {
                outlet: 0.5,
                product: 0.3,
                units: 0.2,
            },
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be numeric"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
