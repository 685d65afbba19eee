//! Decision governance for multi-outlet retail: a guardrail chain gating
//! transfers and price changes, and a fairness-optimising search over
//! allocator configurations.

pub mod allocation;
pub mod config;
pub mod error;
pub mod governance;
pub mod guardrails;
pub mod telemetry;

pub use error::AppError;
