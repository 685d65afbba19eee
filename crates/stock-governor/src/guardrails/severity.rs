use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::result::RailResultError;

/// Outcome of a single rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RailStatus {
    Pass,
    Warn,
    Block,
}

impl RailStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RailStatus::Pass => "PASS",
            RailStatus::Warn => "WARN",
            RailStatus::Block => "BLOCK",
        }
    }

    /// Severity implied by a status when the rail does not name one.
    pub fn default_severity(&self) -> Severity {
        match self {
            RailStatus::Pass => Severity::Info,
            RailStatus::Warn => Severity::Warn,
            RailStatus::Block => Severity::Block,
        }
    }

    /// Worst of two statuses; `BLOCK` dominates `WARN` dominates `PASS`.
    pub fn worst(self, other: RailStatus) -> RailStatus {
        self.max(other)
    }
}

impl fmt::Display for RailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for RailStatus {
    type Err = RailResultError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(RailStatus::Pass),
            "WARN" => Ok(RailStatus::Warn),
            "BLOCK" => Ok(RailStatus::Block),
            _ => Err(RailResultError::UnknownStatus(raw.to_string())),
        }
    }
}

/// Static classification of a rail outcome, weighted for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Block,
}

impl Severity {
    pub fn weight(&self) -> u8 {
        match self {
            Severity::Info => 10,
            Severity::Warn => 50,
            Severity::Block => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Block => "BLOCK",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Severity {
    type Err = RailResultError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "WARN" => Ok(Severity::Warn),
            "BLOCK" => Ok(Severity::Block),
            _ => Err(RailResultError::UnknownSeverity(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_follow_severity_order() {
        assert_eq!(Severity::Info.weight(), 10);
        assert_eq!(Severity::Warn.weight(), 50);
        assert_eq!(Severity::Block.weight(), 100);
    }

    #[test]
    fn status_maps_to_default_severity() {
        assert_eq!(RailStatus::Pass.default_severity(), Severity::Info);
        assert_eq!(RailStatus::Warn.default_severity(), Severity::Warn);
        assert_eq!(RailStatus::Block.default_severity(), Severity::Block);
    }

    #[test]
    fn block_dominates_warn_dominates_pass() {
        assert_eq!(RailStatus::Pass.worst(RailStatus::Warn), RailStatus::Warn);
        assert_eq!(RailStatus::Block.worst(RailStatus::Warn), RailStatus::Block);
        assert_eq!(RailStatus::Pass.worst(RailStatus::Pass), RailStatus::Pass);
    }

    #[test]
    fn parses_labels_and_rejects_unknown_values() {
        assert_eq!("warn".parse::<RailStatus>().expect("parses"), RailStatus::Warn);
        assert_eq!(" BLOCK ".parse::<Severity>().expect("parses"), Severity::Block);
        assert!(matches!(
            "CRITICAL".parse::<Severity>(),
            Err(RailResultError::UnknownSeverity(value)) if value == "CRITICAL"
        ));
        assert!(matches!(
            "FAIL".parse::<RailStatus>(),
            Err(RailResultError::UnknownStatus(_))
        ));
    }
}
