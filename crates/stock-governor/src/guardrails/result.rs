use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::severity::{RailStatus, Severity};

/// Construction-time violations for [`RailResult`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RailResultError {
    #[error("rail code must not be empty")]
    EmptyCode,
    #[error("unknown rail status '{0}'")]
    UnknownStatus(String),
    #[error("unknown severity '{0}'")]
    UnknownSeverity(String),
    #[error("rail duration must be a finite, non-negative number of milliseconds (got {0})")]
    InvalidDuration(f64),
    #[error("meta entry '{key}' is not JSON serializable: {detail}")]
    Meta { key: String, detail: String },
}

/// Raw outcome a rail hands back to the chain. Severity and reason are
/// optional and derived when the result is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailOutcome {
    pub status: RailStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl RailOutcome {
    pub fn new(status: RailStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            severity: None,
            reason: None,
            message: message.into(),
            meta: Map::new(),
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(RailStatus::Pass, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(RailStatus::Warn, message)
    }

    pub fn block(message: impl Into<String>) -> Self {
        Self::new(RailStatus::Block, message)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Serializes `value` eagerly so a rail cannot smuggle something that
    /// fails later when the verdict is logged or returned.
    pub fn with_meta<T: Serialize>(
        mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<Self, RailResultError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|err| RailResultError::Meta {
            key: key.clone(),
            detail: err.to_string(),
        })?;
        self.meta.insert(key, value);
        Ok(self)
    }
}

/// Immutable, validated outcome of one rail evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RailResult {
    code: String,
    status: RailStatus,
    severity: Severity,
    reason: String,
    message: String,
    meta: Map<String, Value>,
    #[serde(rename = "duration")]
    duration_ms: f64,
}

impl RailResult {
    pub fn new(
        code: impl Into<String>,
        outcome: RailOutcome,
        duration_ms: f64,
    ) -> Result<Self, RailResultError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(RailResultError::EmptyCode);
        }
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(RailResultError::InvalidDuration(duration_ms));
        }

        let RailOutcome {
            status,
            severity,
            reason,
            message,
            meta,
        } = outcome;

        let severity = severity.unwrap_or_else(|| status.default_severity());
        let reason = match reason {
            Some(reason) if !reason.trim().is_empty() => reason,
            _ => derive_reason(&message, status),
        };

        Ok(Self {
            code,
            status,
            severity,
            reason,
            message,
            meta,
            duration_ms,
        })
    }

    /// Builds a result from string labels, as received from an external
    /// rail runner.
    pub fn from_labels(
        code: impl Into<String>,
        status: &str,
        severity: Option<&str>,
        message: impl Into<String>,
        duration_ms: f64,
    ) -> Result<Self, RailResultError> {
        let status = status.parse::<RailStatus>()?;
        let mut outcome = RailOutcome::new(status, message);
        if let Some(severity) = severity {
            outcome = outcome.with_severity(severity.parse()?);
        }
        Self::new(code, outcome, duration_ms)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn status(&self) -> RailStatus {
        self.status
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn is_blocking(&self) -> bool {
        self.status == RailStatus::Block
    }
}

/// Machine-stable token from a human message: lower-cased, runs of
/// separators collapsed to one underscore.
pub(crate) fn derive_reason(message: &str, status: RailStatus) -> String {
    let mut slug = String::with_capacity(message.len());
    let mut pending_separator = false;

    for ch in message.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        status.label().to_ascii_lowercase()
    } else {
        slug
    }
}
