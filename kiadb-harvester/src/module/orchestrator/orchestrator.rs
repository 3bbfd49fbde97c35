use chrono::Utc;
use futures::stream::{self, StreamExt};
use kiadb_common::{Area, Coordinate, MergedRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::types::{AreaResult, Coverage, RecordCollection};
use crate::module::discovery::SpatialDiscovery;
use crate::module::explorer::CodeSpaceExplorer;
use crate::module::fetcher::RecordFetcher;
use crate::module::state::AreaRunState;
use crate::module::transport::StatusListing;

/// Drives one area through discovery, reconciliation and exploration.
pub struct DiscoveryOrchestrator {
    discovery: SpatialDiscovery,
    fetcher: RecordFetcher,
    explorer: CodeSpaceExplorer,
    status: Arc<dyn StatusListing>,
    workers: usize,
}

impl DiscoveryOrchestrator {
    pub fn new(
        discovery: SpatialDiscovery,
        fetcher: RecordFetcher,
        explorer: CodeSpaceExplorer,
        status: Arc<dyn StatusListing>,
        workers: usize,
    ) -> Self {
        Self {
            discovery,
            fetcher,
            explorer,
            status,
            workers: workers.max(1),
        }
    }

    pub fn fetcher(&self) -> &RecordFetcher {
        &self.fetcher
    }

    /// Harvest one area. Always terminates; unrecovered plots are reported, not raised.
    pub async fn run_area(&self, area: &Area, coordinates: &[Coordinate]) -> AreaResult {
        let run_id = Uuid::now_v7();
        let span = tracing::info_span!(
            "area",
            district = %area.district(),
            area = %area.industrial_area(),
            %run_id
        );
        self.run(area, coordinates, run_id).instrument(span).await
    }

    async fn run(&self, area: &Area, coordinates: &[Coordinate], run_id: Uuid) -> AreaResult {
        let started_at = Utc::now();
        let run = AreaRunState::new();
        let mut collected = RecordCollection::default();
        let mut coverage = Coverage::default();

        tracing::info!(
            "Discovering plots from {} coordinates ({} spatial batches)",
            coordinates.len(),
            self.discovery.batch_count(coordinates.len())
        );

        let batches = self.discovery.discover(coordinates, &run);
        futures::pin_mut!(batches);
        while let Some(batch) = batches.next().await {
            coverage.batches += 1;
            if batch.codes.is_empty() {
                continue;
            }
            tracing::info!("Batch {}: fetching {} new codes", batch.index, batch.codes.len());
            for record in self.fetch_all(batch.codes).await {
                if collected.push(record) {
                    coverage.discovered += 1;
                }
            }
        }

        let expected = self.expected_plot_numbers(area).await;
        coverage.expected = expected.len();
        let mut missing: HashSet<String> = expected
            .difference(collected.plot_numbers())
            .cloned()
            .collect();

        if missing.is_empty() {
            tracing::info!("Spatial discovery covered all {} expected plots", expected.len());
        } else {
            tracing::info!(
                "Found {} missing plots: {:?}",
                missing.len(),
                sorted(&missing)
            );
            self.explore(&run, &mut collected, &mut missing, &mut coverage)
                .await;
        }

        coverage.missing = missing.len();
        let records = collected.into_records();
        coverage.contactable = records.iter().filter(|r| r.is_contactable()).count();
        let unrecovered = sorted(&missing);

        tracing::info!(
            "Area finished: {} records, expected {}, discovered {}, recovered {}, missing {}, contactable {}, probed {}",
            records.len(),
            coverage.expected,
            coverage.discovered,
            coverage.recovered,
            coverage.missing,
            coverage.contactable,
            coverage.probed
        );
        if !unrecovered.is_empty() {
            tracing::warn!("Unrecovered plots: {:?}", unrecovered);
        }

        AreaResult {
            area: area.clone(),
            run_id,
            started_at,
            finished_at: Utc::now(),
            records,
            coverage,
            unrecovered,
        }
    }

    /// Fetch `codes` with bounded fan-out, draining results in completion order.
    async fn fetch_all(&self, codes: Vec<String>) -> Vec<MergedRecord> {
        stream::iter(codes)
            .map(|code| async move { self.fetcher.fetch(&code).await })
            .buffer_unordered(self.workers)
            .filter_map(|outcome| async move { outcome.into_record() })
            .collect()
            .await
    }

    /// Query the status listing once, trying both key spellings in order.
    async fn expected_plot_numbers(&self, area: &Area) -> HashSet<String> {
        for (district, industrial_area) in area.key_spellings() {
            match self
                .status
                .plots_by_status(&district, &industrial_area)
                .await
            {
                Ok(Some(rows)) => {
                    let expected: HashSet<String> = rows
                        .into_iter()
                        .filter_map(|row| row.plno)
                        .filter(|plno| !plno.trim().is_empty())
                        .collect();
                    tracing::info!(
                        "Status listing found {} plots for {}, {}",
                        expected.len(),
                        district,
                        industrial_area
                    );
                    return expected;
                }
                Ok(None) => tracing::warn!(
                    "Status listing rejected {}, {}",
                    district,
                    industrial_area
                ),
                Err(e) => tracing::warn!(
                    "Status listing failed for {}, {}: {}",
                    district,
                    industrial_area,
                    e
                ),
            }
        }

        tracing::warn!("No status listing available; nothing to reconcile against");
        HashSet::new()
    }

    /// Probe the code space until every missing plot is found or no unprobed code remains.
    async fn explore(
        &self,
        run: &AreaRunState,
        collected: &mut RecordCollection,
        missing: &mut HashSet<String>,
        coverage: &mut Coverage,
    ) {
        let mut round = 0;

        while !missing.is_empty() {
            let plan = self
                .explorer
                .plan(&run.bases.snapshot(), &run.candidates.snapshot());
            if plan.is_empty() {
                tracing::info!("Code space exhausted after {} round(s)", round);
                break;
            }
            round += 1;

            for probe in &plan {
                run.candidates.insert(probe.code.as_str());
            }
            tracing::info!("Exploration round {}: {} probes", round, plan.len());

            let mut results = stream::iter(plan)
                .map(|probe| async move { self.fetcher.fetch(probe.code.as_str()).await })
                .buffer_unordered(self.workers);

            while let Some(outcome) = results.next().await {
                coverage.probed += 1;

                let Some(record) = outcome.into_record() else {
                    continue;
                };
                let Some(plot_number) = record.plot_number().map(str::to_string) else {
                    continue;
                };
                if !missing.remove(&plot_number) {
                    continue;
                }

                tracing::info!(
                    "Found missing plot {} with code {}",
                    plot_number,
                    record.plotcode()
                );
                if collected.push(record) {
                    coverage.recovered += 1;
                }
                if missing.is_empty() {
                    tracing::info!("All missing plots found, stopping exploration");
                    break;
                }
            }
        }
    }
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = set.iter().cloned().collect();
    items.sort();
    items
}
