//! Single-code fetch: primary details, eligibility filter, secondary merge

use kiadb_common::{MergedRecord, ALLOTTED_STATUS};
use std::sync::Arc;

use super::state::InvalidCodeCache;
use super::transport::{CallOutcome, DetailService, Endpoint};

/// Why a code produced no record.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Already known to be invalid earlier in the run.
    CachedInvalid,
    /// The detail service confirmed the code has no record.
    NotFound,
    /// The record exists but is not allotted.
    NotAllotted(Option<String>),
    /// Network or parse failure on the primary source.
    Transient(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::CachedInvalid => f.write_str("cached invalid"),
            SkipReason::NotFound => f.write_str("not found"),
            SkipReason::NotAllotted(status) => {
                write!(f, "status {}", status.as_deref().unwrap_or("missing"))
            }
            SkipReason::Transient(reason) => write!(f, "transient failure: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Record(MergedRecord),
    Skip(SkipReason),
}

impl FetchOutcome {
    pub fn into_record(self) -> Option<MergedRecord> {
        match self {
            FetchOutcome::Record(record) => Some(record),
            FetchOutcome::Skip(_) => None,
        }
    }
}

pub struct RecordFetcher {
    details: Arc<dyn DetailService>,
    invalid: Arc<InvalidCodeCache>,
}

impl RecordFetcher {
    pub fn new(details: Arc<dyn DetailService>, invalid: Arc<InvalidCodeCache>) -> Self {
        Self { details, invalid }
    }

    pub fn invalid_cache(&self) -> Arc<InvalidCodeCache> {
        self.invalid.clone()
    }

    /// Fetch and merge one code. Never fails; every miss is a logged [`SkipReason`].
    pub async fn fetch(&self, code: &str) -> FetchOutcome {
        let outcome = self.fetch_inner(code).await;
        if let FetchOutcome::Skip(reason) = &outcome {
            match reason {
                SkipReason::Transient(_) => tracing::warn!("Skipping {}: {}", code, reason),
                _ => tracing::debug!("Skipping {}: {}", code, reason),
            }
        }
        outcome
    }

    async fn fetch_inner(&self, code: &str) -> FetchOutcome {
        if self.invalid.seen(code) {
            return FetchOutcome::Skip(SkipReason::CachedInvalid);
        }

        let primary = match self.details.call(Endpoint::PlotDetails, code).await {
            CallOutcome::Found(raw) => raw,
            CallOutcome::NotFound => {
                self.invalid.mark_invalid(code);
                return FetchOutcome::Skip(SkipReason::NotFound);
            }
            CallOutcome::TransientFailure(reason) => {
                return FetchOutcome::Skip(SkipReason::Transient(reason));
            }
        };

        if !primary.is_allotted() {
            return FetchOutcome::Skip(SkipReason::NotAllotted(primary.status()));
        }

        let mut record = MergedRecord::new(code);
        let from_primary = record.apply_primary(&primary);

        let from_secondary = match self.details.call(Endpoint::PlotIis, code).await {
            CallOutcome::Found(raw) => record.apply_secondary(&raw),
            CallOutcome::NotFound => 0,
            CallOutcome::TransientFailure(reason) => {
                tracing::warn!("Secondary details unavailable for {}: {}", code, reason);
                0
            }
        };

        tracing::info!(
            "Merged {} ({} {}): {} primary fields, {} secondary fields",
            code,
            ALLOTTED_STATUS,
            record.plot_number().unwrap_or("no plot number"),
            from_primary,
            from_secondary
        );

        FetchOutcome::Record(record)
    }
}
