use async_stream::stream;
use futures::Stream;
use kiadb_common::{Coordinate, Envelope, PlotCode};
use std::sync::Arc;

use super::query_cache::QueryCache;
use crate::module::state::AreaRunState;
use crate::module::transport::{SpatialFeature, SpatialService};

/// New candidate codes found by one envelope query.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateBatch {
    /// Position of the coordinate chunk this batch came from.
    pub index: usize,
    pub envelope: Envelope,
    /// Codes not seen earlier in the run, in feature order.
    pub codes: Vec<String>,
    /// How many of `codes` failed the code grammar.
    pub malformed: usize,
}

/// Turns an area's outline coordinates into candidate plot codes.
pub struct SpatialDiscovery {
    service: Arc<dyn SpatialService>,
    cache: QueryCache,
    batch_size: usize,
    margin: f64,
}

impl SpatialDiscovery {
    pub fn new(
        service: Arc<dyn SpatialService>,
        batch_size: usize,
        margin: f64,
        cache_capacity: usize,
    ) -> Self {
        Self {
            service,
            cache: QueryCache::new(cache_capacity),
            batch_size: batch_size.max(1),
            margin,
        }
    }

    /// Number of batches `discover` will yield for `coordinate_count` points.
    pub fn batch_count(&self, coordinate_count: usize) -> usize {
        coordinate_count.div_ceil(self.batch_size)
    }

    /// Lazily query one envelope per coordinate chunk.
    ///
    /// Every chunk yields exactly one batch, possibly empty. Codes already in
    /// `run.candidates` are dropped; well-formed codes are recorded in `run.bases`.
    pub fn discover<'a>(
        &'a self,
        coordinates: &'a [Coordinate],
        run: &'a AreaRunState,
    ) -> impl Stream<Item = CandidateBatch> + 'a {
        stream! {
            for (index, chunk) in coordinates.chunks(self.batch_size).enumerate() {
                let Some(envelope) = Envelope::around(chunk, self.margin) else {
                    continue;
                };
                let features = self.query(&envelope).await;
                yield Self::collect_batch(index, envelope, &features, run);
            }
        }
    }

    async fn query(&self, envelope: &Envelope) -> Vec<SpatialFeature> {
        let key = envelope.key();
        if let Some(features) = self.cache.get(&key).await {
            tracing::debug!("Spatial cache hit for {:?}", envelope);
            return features;
        }

        match self.service.query_envelope(envelope).await {
            Ok(features) => {
                self.cache.insert(key, features.clone()).await;
                features
            }
            Err(e) => {
                tracing::warn!("Spatial query failed for {:?}: {}", envelope, e);
                Vec::new()
            }
        }
    }

    fn collect_batch(
        index: usize,
        envelope: Envelope,
        features: &[SpatialFeature],
        run: &AreaRunState,
    ) -> CandidateBatch {
        let mut batch = CandidateBatch {
            index,
            envelope,
            codes: Vec::new(),
            malformed: 0,
        };

        if features.is_empty() {
            tracing::warn!("No features found for batch {} ({:?})", index, envelope);
            return batch;
        }

        for feature in features {
            let Some(code) = feature.plot_code() else {
                continue;
            };
            if !run.candidates.insert(code) {
                continue;
            }

            match PlotCode::parse(code) {
                Ok(plot_code) => {
                    run.bases.record(&plot_code);
                    tracing::debug!(
                        "Added base {} with suffix {:02} from {}",
                        plot_code.base(),
                        plot_code.suffix(),
                        code
                    );
                }
                Err(e) => {
                    batch.malformed += 1;
                    tracing::warn!("Malformed plot code kept out of the base index: {}", e);
                }
            }
            batch.codes.push(code.to_string());
        }

        batch
    }
}
