//! Shared data model for the KIADB plot harvester: code grammar, map geometry,
//! area identity, and the merged plot record.

pub mod area;
pub mod code;
pub mod geometry;
pub mod record;

pub use area::{Area, AreaError};
pub use code::{CodeBase, CodeError, PlotCode, BASE_LEN, CODE_LEN, SUFFIX_LIMIT, SUFFIX_WIDTH};
pub use geometry::{Coordinate, Envelope, EnvelopeKey};
pub use record::{
    MergedRecord, RawSourceRecord, RecordField, ALLOTTED_STATUS, PLOT_NUMBER_KEY, STATUS_KEY, UNKNOWN,
};
