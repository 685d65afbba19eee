//! Built-in retail rails for transfers and price changes.
//!
//! Each rail reads a handful of named signals from the decision context and
//! passes as `not_applicable` when its inputs are absent, so one chain can
//! screen both transfer and pricing actions.

use super::chain::{ChainError, GuardrailChain};
use super::context::DecisionContext;
use super::result::RailOutcome;
use super::rule::{Guardrail, RailError};
use crate::config::GuardrailConfig;

pub const DONOR_DSR: &str = "GR_DONOR_DSR";
pub const MARGIN_FLOOR: &str = "GR_MARGIN_FLOOR";
pub const PRICE_STEP: &str = "GR_PRICE_STEP";
pub const RECEIVER_DSR: &str = "GR_RECEIVER_DSR";
pub const ROI_FLOOR: &str = "GR_ROI_FLOOR";

const MARGIN_WARN_BAND_PCT: f64 = 2.0;
const DONOR_WARN_FACTOR: f64 = 1.5;
const RECEIVER_BLOCK_FACTOR: f64 = 2.0;

/// Registers every built-in rail with thresholds from `config`.
pub fn standard_chain(config: &GuardrailConfig) -> Result<GuardrailChain, ChainError> {
    GuardrailChain::new()
        .with(MarginFloorRail::new(config.min_margin_pct))?
        .with(PriceStepRail::new(config.max_price_change_pct))?
        .with(RoiFloorRail::new(config.min_roi))?
        .with(DonorDsrRail::new(config.min_donor_dsr))?
        .with(ReceiverDsrRail::new(config.max_receiver_dsr))
}

fn not_applicable(missing: &str) -> RailOutcome {
    RailOutcome::pass(format!("{missing} not provided")).with_reason("not_applicable")
}

fn threshold(context: &DecisionContext, key: &str, default: f64) -> Result<f64, RailError> {
    Ok(context.number(key)?.unwrap_or(default))
}

/// Blocks price candidates whose gross margin falls under the floor.
#[derive(Debug, Clone)]
pub struct MarginFloorRail {
    min_margin_pct: f64,
}

impl MarginFloorRail {
    pub fn new(min_margin_pct: f64) -> Self {
        Self { min_margin_pct }
    }
}

impl Guardrail for MarginFloorRail {
    fn code(&self) -> &str {
        MARGIN_FLOOR
    }

    fn evaluate(&self, context: &DecisionContext) -> Result<RailOutcome, RailError> {
        let (Some(cost), Some(price)) = (
            context.number("cost")?,
            context.number("candidate_price")?,
        ) else {
            return Ok(not_applicable("cost or candidate_price"));
        };
        let floor = threshold(context, "min_margin_pct", self.min_margin_pct)?;

        if price <= 0.0 {
            return RailOutcome::block(format!("candidate price {price:.2} is not positive"))
                .with_reason("non_positive_price")
                .with_meta("candidate_price", price)
                .map_err(RailError::from);
        }

        let margin_pct = (price - cost) / price * 100.0;
        let outcome = if margin_pct < floor {
            RailOutcome::block(format!(
                "margin {margin_pct:.2}% below floor {floor:.2}%"
            ))
            .with_reason("margin_below_floor")
        } else if margin_pct < floor + MARGIN_WARN_BAND_PCT {
            RailOutcome::warn(format!(
                "margin {margin_pct:.2}% within {MARGIN_WARN_BAND_PCT:.0} points of floor {floor:.2}%"
            ))
            .with_reason("margin_near_floor")
        } else {
            RailOutcome::pass(format!("margin {margin_pct:.2}% clears floor {floor:.2}%"))
        };

        outcome
            .with_meta("margin_pct", margin_pct)?
            .with_meta("min_margin_pct", floor)
            .map_err(RailError::from)
    }
}

/// Caps the relative size of a single price move.
#[derive(Debug, Clone)]
pub struct PriceStepRail {
    max_change_pct: f64,
}

impl PriceStepRail {
    pub fn new(max_change_pct: f64) -> Self {
        Self { max_change_pct }
    }
}

impl Guardrail for PriceStepRail {
    fn code(&self) -> &str {
        PRICE_STEP
    }

    fn evaluate(&self, context: &DecisionContext) -> Result<RailOutcome, RailError> {
        let (Some(current), Some(candidate)) = (
            context.number("current_price")?,
            context.number("candidate_price")?,
        ) else {
            return Ok(not_applicable("current_price or candidate_price"));
        };
        if current <= 0.0 {
            return Ok(not_applicable("positive current_price"));
        }
        let cap = threshold(context, "max_price_change_pct", self.max_change_pct)?;

        let change_pct = (candidate - current) / current * 100.0;
        let magnitude = change_pct.abs();
        let outcome = if magnitude > cap {
            RailOutcome::block(format!(
                "price change {change_pct:+.2}% exceeds cap {cap:.2}%"
            ))
            .with_reason("price_step_exceeds_cap")
        } else if magnitude > cap / 2.0 {
            RailOutcome::warn(format!(
                "price change {change_pct:+.2}% above half of cap {cap:.2}%"
            ))
            .with_reason("price_step_large")
        } else {
            RailOutcome::pass(format!("price change {change_pct:+.2}% within cap"))
        };

        outcome
            .with_meta("change_pct", change_pct)?
            .with_meta("max_price_change_pct", cap)
            .map_err(RailError::from)
    }
}

#[derive(Debug, Clone)]
pub struct RoiFloorRail {
    min_roi: f64,
}

impl RoiFloorRail {
    pub fn new(min_roi: f64) -> Self {
        Self { min_roi }
    }
}

impl Guardrail for RoiFloorRail {
    fn code(&self) -> &str {
        ROI_FLOOR
    }

    fn evaluate(&self, context: &DecisionContext) -> Result<RailOutcome, RailError> {
        let Some(roi) = context.number("projected_roi")? else {
            return Ok(not_applicable("projected_roi"));
        };
        let floor = threshold(context, "min_roi", self.min_roi)?;

        let outcome = if roi < 0.0 {
            RailOutcome::block(format!("projected ROI {roi:.3} is negative"))
                .with_reason("negative_roi")
        } else if roi < floor {
            RailOutcome::warn(format!("projected ROI {roi:.3} below target {floor:.3}"))
                .with_reason("roi_below_target")
        } else {
            RailOutcome::pass(format!("projected ROI {roi:.3} meets target {floor:.3}"))
        };

        outcome.with_meta("projected_roi", roi).map_err(RailError::from)
    }
}

/// Keeps the donor location from being drained below its cover floor.
#[derive(Debug, Clone)]
pub struct DonorDsrRail {
    min_dsr: f64,
}

impl DonorDsrRail {
    pub fn new(min_dsr: f64) -> Self {
        Self { min_dsr }
    }
}

impl Guardrail for DonorDsrRail {
    fn code(&self) -> &str {
        DONOR_DSR
    }

    fn evaluate(&self, context: &DecisionContext) -> Result<RailOutcome, RailError> {
        let Some(dsr) = context.number("donor_dsr_post")? else {
            return Ok(not_applicable("donor_dsr_post"));
        };
        let floor = threshold(context, "min_donor_dsr", self.min_dsr)?;

        let outcome = if dsr < floor {
            RailOutcome::block(format!(
                "donor left with {dsr:.1} days of stock, floor is {floor:.1}"
            ))
            .with_reason("donor_below_floor")
        } else if dsr < floor * DONOR_WARN_FACTOR {
            RailOutcome::warn(format!(
                "donor left with {dsr:.1} days of stock, close to floor {floor:.1}"
            ))
            .with_reason("donor_near_floor")
        } else {
            RailOutcome::pass(format!("donor keeps {dsr:.1} days of stock"))
        };

        outcome.with_meta("donor_dsr_post", dsr).map_err(RailError::from)
    }
}

/// Flags transfers that would overstock the receiving outlet.
#[derive(Debug, Clone)]
pub struct ReceiverDsrRail {
    max_dsr: f64,
}

impl ReceiverDsrRail {
    pub fn new(max_dsr: f64) -> Self {
        Self { max_dsr }
    }
}

impl Guardrail for ReceiverDsrRail {
    fn code(&self) -> &str {
        RECEIVER_DSR
    }

    fn evaluate(&self, context: &DecisionContext) -> Result<RailOutcome, RailError> {
        let Some(dsr) = context.number("receiver_dsr_post")? else {
            return Ok(not_applicable("receiver_dsr_post"));
        };
        let ceiling = threshold(context, "max_receiver_dsr", self.max_dsr)?;

        let outcome = if dsr > ceiling * RECEIVER_BLOCK_FACTOR {
            RailOutcome::block(format!(
                "receiver would hold {dsr:.1} days of stock, more than twice the ceiling {ceiling:.1}"
            ))
            .with_reason("receiver_overstocked")
        } else if dsr > ceiling {
            RailOutcome::warn(format!(
                "receiver would hold {dsr:.1} days of stock, above ceiling {ceiling:.1}"
            ))
            .with_reason("receiver_above_ceiling")
        } else {
            RailOutcome::pass(format!("receiver would hold {dsr:.1} days of stock"))
        };

        outcome
            .with_meta("receiver_dsr_post", dsr)
            .map_err(RailError::from)
    }
}
