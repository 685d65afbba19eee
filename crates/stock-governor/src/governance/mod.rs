//! Service facade and HTTP surface tying guardrails and sweeps together.

pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use router::governance_router;
pub use service::{
    AutoTuneRequest, BestSpreadRequest, BestSpreadResponse, GovernanceService, ServiceError,
    SweepRequest,
};
