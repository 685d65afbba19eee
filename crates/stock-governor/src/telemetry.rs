use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::{Directive, LevelFilter, ParseError};
use tracing_subscriber::EnvFilter;

/// Targets whose `info` events form the decision audit trail.
const AUDIT_TARGETS: [&str; 2] = ["stock_governor::guardrails", "stock_governor::allocation"];

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log filter '{}'", value)
            }
            TelemetryError::Subscriber(err) => write!(f, "subscriber already installed: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level
/// and is taken as-is.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => audit_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .compact()
        .with_ansi(config.ansi)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// Filter for `level` that keeps guardrail verdicts and sweep summaries at
/// `info` even when the global level is quieter.
fn audit_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    let invalid = |source: ParseError| TelemetryError::EnvFilter {
        value: level.to_string(),
        source,
    };
    let mut filter = EnvFilter::try_new(level).map_err(invalid)?;

    let quieter_than_info = filter
        .max_level_hint()
        .is_some_and(|hint| hint < LevelFilter::INFO);
    if quieter_than_info {
        for target in AUDIT_TARGETS {
            if level.contains(target) {
                continue;
            }
            let directive: Directive = format!("{target}=info").parse().map_err(invalid)?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}
