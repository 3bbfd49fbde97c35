//! Bounded cache of spatial query answers, keyed by exact envelope bounds

use kiadb_common::EnvelopeKey;
use moka::future::Cache;

use crate::module::transport::SpatialFeature;

pub struct QueryCache {
    /// `None` when caching is disabled.
    entries: Option<Cache<EnvelopeKey, Vec<SpatialFeature>>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let entries = (capacity > 0).then(|| Cache::builder().max_capacity(capacity as u64).build());
        Self { entries }
    }

    pub async fn get(&self, key: &EnvelopeKey) -> Option<Vec<SpatialFeature>> {
        self.entries.as_ref()?.get(key).await
    }

    pub async fn insert(&self, key: EnvelopeKey, features: Vec<SpatialFeature>) {
        if let Some(entries) = &self.entries {
            entries.insert(key, features).await;
        }
    }

    /// Entry count after pending evictions have been applied.
    pub async fn len(&self) -> u64 {
        match &self.entries {
            Some(entries) => {
                entries.run_pending_tasks().await;
                entries.entry_count()
            }
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
