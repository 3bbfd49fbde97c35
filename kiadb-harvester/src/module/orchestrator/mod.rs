//! Per-area pipeline
//!
//! spatial discovery -> initial fetch -> reconciliation against the status
//! listing -> exploration rounds until converged or exhausted -> result.

mod orchestrator;
mod types;

pub use orchestrator::DiscoveryOrchestrator;
pub use types::{AreaResult, Coverage, SummaryRow};
