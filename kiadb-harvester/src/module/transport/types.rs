//! Transport data types and error taxonomy

use kiadb_common::{RawSourceRecord, PLOT_NUMBER_KEY, STATUS_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Logical detail endpoints addressed by a plot code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// Primary plot details (`getdeatilsforidentifier`).
    PlotDetails,
    /// Secondary industrial-information-system details (`getplotiisdetails`).
    PlotIis,
}

impl Endpoint {
    /// ASMX method name; also the SOAP operation name.
    pub fn method(&self) -> &'static str {
        match self {
            // The portal really spells it "deatils".
            Endpoint::PlotDetails => "getdeatilsforidentifier",
            Endpoint::PlotIis => "getplotiisdetails",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::PlotDetails => "plot_details",
            Endpoint::PlotIis => "plot_iis",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("unparseable payload: {0}")]
    Parse(String),

    #[error("SOAP response missing <{0}>")]
    MissingSoapResult(String),
}

impl TransportError {
    /// Network failures and server-side errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Status(code) => *code >= 500,
            TransportError::Parse(_) | TransportError::MissingSoapResult(_) => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransportError::Status(status.as_u16()),
            None => TransportError::Network(err.to_string()),
        }
    }
}

/// Decoded body of a detail or status-listing answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Rows(Vec<RawSourceRecord>),
    /// The service's explicit "Wrong Input" answer.
    WrongInput,
    /// Successful answer with nothing in it.
    Empty,
}

impl Payload {
    pub fn into_first_row(self) -> Option<RawSourceRecord> {
        match self {
            Payload::Rows(rows) => rows.into_iter().next(),
            Payload::WrongInput | Payload::Empty => None,
        }
    }
}

/// Why the structured-data attempt did not produce a record.
#[derive(Debug)]
pub enum PrimaryFailure {
    WrongInput,
    Empty,
    Network(TransportError),
    Unparseable(TransportError),
}

impl PrimaryFailure {
    /// The service itself answered that the code has no data.
    pub fn is_confirmed_absent(&self) -> bool {
        matches!(self, PrimaryFailure::WrongInput | PrimaryFailure::Empty)
    }
}

impl std::fmt::Display for PrimaryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryFailure::WrongInput => f.write_str("wrong input"),
            PrimaryFailure::Empty => f.write_str("empty payload"),
            PrimaryFailure::Network(e) | PrimaryFailure::Unparseable(e) => write!(f, "{}", e),
        }
    }
}

/// Result of the primary protocol; `PrimaryFailed` triggers the SOAP fallback.
#[derive(Debug)]
pub enum PrimaryAttempt {
    Success(RawSourceRecord),
    PrimaryFailed(PrimaryFailure),
}

/// Outcome of one logical transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Found(RawSourceRecord),
    /// The code is confirmed to have no record.
    NotFound,
    /// Network or parse failure; treated as "no data" for this call.
    TransientFailure(String),
}

impl CallOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CallOutcome::Found(_) => "success",
            CallOutcome::NotFound => "not_found",
            CallOutcome::TransientFailure(_) => "failure",
        }
    }
}

/// One feature returned by the spatial query service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialFeature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl SpatialFeature {
    pub const CODE_ATTRIBUTE: &'static str = "plotcode";

    /// Trimmed, non-empty plot code attribute.
    pub fn plot_code(&self) -> Option<&str> {
        self.attributes
            .get(Self::CODE_ATTRIBUTE)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// One row of the status listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRow {
    #[serde(default)]
    pub plno: Option<String>,
    #[serde(default)]
    pub plst: Option<String>,
}

impl StatusRow {
    pub fn from_raw(raw: &RawSourceRecord) -> Self {
        Self {
            plno: raw.value(PLOT_NUMBER_KEY),
            plst: raw.value(STATUS_KEY),
        }
    }
}
