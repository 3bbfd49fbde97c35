//! Spatial discovery of candidate plot codes
//!
//! Coordinates are chunked, each chunk becomes a padded envelope, and every
//! envelope is intersected against the KGIS plot layer. Answers are memoised
//! in a bounded LRU cache shared by all area runs.

mod discovery;
mod query_cache;

pub use discovery::{CandidateBatch, SpatialDiscovery};
pub use query_cache::QueryCache;
