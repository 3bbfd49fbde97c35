//! Rate-limited access to the KIADB portal and the KGIS spatial service
//!
//! ## Protocols
//! - Primary: ASMX JSON (`POST sulb.asmx/<method>`), single short timeout
//! - Fallback: SOAP 1.1 on the same URL, retried with exponential backoff
//! - Spatial: ArcGIS REST envelope query
//!
//! Every request, whatever the protocol, passes through one shared [`RateGate`].

pub mod client;
pub mod payload;
pub mod rate_limit;
pub mod retry;
pub mod soap;
pub mod types;

pub use client::{RateLimitedTransport, TransportSettings};
pub use rate_limit::RateGate;
pub use retry::{with_retry, RetryPolicy};
pub use types::{
    CallOutcome, Endpoint, Payload, PrimaryAttempt, PrimaryFailure, SpatialFeature, StatusRow,
    TransportError,
};

use async_trait::async_trait;
use kiadb_common::Envelope;

/// Detail lookups addressed by plot code.
#[async_trait]
pub trait DetailService: Send + Sync {
    /// One logical call; never fails, all failure is folded into the outcome.
    async fn call(&self, endpoint: Endpoint, code: &str) -> CallOutcome;
}

/// Spatial-intersection queries.
#[async_trait]
pub trait SpatialService: Send + Sync {
    async fn query_envelope(&self, envelope: &Envelope)
        -> Result<Vec<SpatialFeature>, TransportError>;
}

/// Listing of plots by allotment status for one area.
#[async_trait]
pub trait StatusListing: Send + Sync {
    /// `Ok(None)` means the service rejected this `(district, area)` spelling.
    async fn plots_by_status(
        &self,
        district: &str,
        area: &str,
    ) -> Result<Option<Vec<StatusRow>>, TransportError>;
}

/// Combine a failed primary attempt with the fallback protocol's answer.
pub fn resolve_fallback(
    primary: &PrimaryFailure,
    fallback: Result<Payload, TransportError>,
) -> CallOutcome {
    match fallback {
        Ok(payload) => match payload.into_first_row() {
            Some(row) => CallOutcome::Found(row),
            None => CallOutcome::NotFound,
        },
        Err(_) if primary.is_confirmed_absent() => CallOutcome::NotFound,
        Err(e) => CallOutcome::TransientFailure(format!("primary: {}; fallback: {}", primary, e)),
    }
}
