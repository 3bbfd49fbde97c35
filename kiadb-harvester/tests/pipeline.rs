use async_trait::async_trait;
use kiadb_common::{Area, CodeBase, Coordinate, Envelope, RawSourceRecord};
use kiadb_harvester::module::discovery::SpatialDiscovery;
use kiadb_harvester::module::explorer::CodeSpaceExplorer;
use kiadb_harvester::module::fetcher::RecordFetcher;
use kiadb_harvester::module::orchestrator::DiscoveryOrchestrator;
use kiadb_harvester::module::state::InvalidCodeCache;
use kiadb_harvester::module::transport::{
    CallOutcome, DetailService, Endpoint, SpatialFeature, SpatialService, StatusListing, StatusRow,
    TransportError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct FakeSpatial {
    codes: Vec<&'static str>,
}

#[async_trait]
impl SpatialService for FakeSpatial {
    async fn query_envelope(
        &self,
        _envelope: &Envelope,
    ) -> Result<Vec<SpatialFeature>, TransportError> {
        Ok(self
            .codes
            .iter()
            .map(|code| serde_json::from_value(json!({"attributes": {"plotcode": code}})).unwrap())
            .collect())
    }
}

#[derive(Default)]
struct FakeDetails {
    primary: HashMap<String, Value>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeDetails {
    fn allotted(mut self, code: &str, plno: &str) -> Self {
        self.primary.insert(
            code.to_string(),
            json!({"plst": "Allotted", "plno": plno}),
        );
        self
    }

    fn calls_for(&self, code: &str) -> usize {
        self.calls.lock().unwrap().get(code).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl DetailService for FakeDetails {
    async fn call(&self, endpoint: Endpoint, code: &str) -> CallOutcome {
        if endpoint == Endpoint::PlotIis {
            return match self.primary.contains_key(code) {
                true => CallOutcome::Found(
                    RawSourceRecord::from_value(json!({"ownemail": "owner@example.com"})).unwrap(),
                ),
                false => CallOutcome::NotFound,
            };
        }
        *self.calls.lock().unwrap().entry(code.to_string()).or_default() += 1;
        match self.primary.get(code) {
            Some(value) => CallOutcome::Found(RawSourceRecord::from_value(value.clone()).unwrap()),
            None => CallOutcome::NotFound,
        }
    }
}

/// Lists plots only for the exact `(district, area)` spellings it was given.
#[derive(Default)]
struct FakeStatus {
    listings: HashMap<(String, String), Vec<&'static str>>,
}

impl FakeStatus {
    fn listing(mut self, district: &str, area: &str, plots: Vec<&'static str>) -> Self {
        self.listings
            .insert((district.to_string(), area.to_string()), plots);
        self
    }
}

#[async_trait]
impl StatusListing for FakeStatus {
    async fn plots_by_status(
        &self,
        district: &str,
        area: &str,
    ) -> Result<Option<Vec<StatusRow>>, TransportError> {
        Ok(self
            .listings
            .get(&(district.to_string(), area.to_string()))
            .map(|plots| {
                plots
                    .iter()
                    .map(|plno| StatusRow {
                        plno: Some(plno.to_string()),
                        plst: Some("Allotted".to_string()),
                    })
                    .collect()
            }))
    }
}

fn orchestrator(
    spatial: FakeSpatial,
    details: Arc<FakeDetails>,
    status: FakeStatus,
) -> DiscoveryOrchestrator {
    DiscoveryOrchestrator::new(
        SpatialDiscovery::new(Arc::new(spatial), 5, 100.0, 100),
        RecordFetcher::new(details, Arc::new(InvalidCodeCache::new())),
        CodeSpaceExplorer::new(5, CodeBase::parse("Z06572016300").unwrap()),
        Arc::new(status),
        3,
    )
}

fn coordinates() -> Vec<Coordinate> {
    vec![
        Coordinate::new(8621000.0, 1459000.0),
        Coordinate::new(8621050.0, 1459050.0),
        Coordinate::new(8621100.0, 1459100.0),
    ]
}

fn area() -> Area {
    Area::from_stem("Kolar-Vemagal").unwrap()
}

#[tokio::test]
async fn malformed_spatial_code_is_still_harvested() {
    let details = Arc::new(FakeDetails::default().allotted("A00000000001123", "P1"));
    let orchestrator = orchestrator(
        FakeSpatial {
            codes: vec!["A00000000001123"],
        },
        details.clone(),
        FakeStatus::default().listing("Kolar", "Vemagal", vec!["P1"]),
    );

    let result = orchestrator.run_area(&area(), &coordinates()).await;

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].plotcode(), "A00000000001123");
    assert_eq!(result.coverage.expected, 1);
    assert_eq!(result.coverage.discovered, 1);
    assert_eq!(result.coverage.missing, 0);
    assert_eq!(result.coverage.probed, 0);
    assert!(result.is_converged());
    assert_eq!(details.total_calls(), 1);
}

#[tokio::test]
async fn empty_discovery_sweeps_the_default_base() {
    let details = Arc::new(FakeDetails::default());
    let orchestrator = orchestrator(
        FakeSpatial { codes: Vec::new() },
        details.clone(),
        FakeStatus::default().listing("Kolar", "Vemagal", vec!["P1"]),
    );

    let result = orchestrator.run_area(&area(), &coordinates()).await;

    assert!(result.records.is_empty());
    assert_eq!(result.coverage.batches, 1);
    assert_eq!(result.coverage.probed, 100);
    assert_eq!(result.unrecovered, vec!["P1".to_string()]);
    for suffix in 0..100 {
        assert_eq!(details.calls_for(&format!("Z06572016300{:02}", suffix)), 1);
    }
    assert_eq!(orchestrator.fetcher().invalid_cache().len(), 100);
}

#[tokio::test]
async fn exploration_stops_once_everything_is_recovered() {
    let details = Arc::new(
        FakeDetails::default()
            .allotted("B0000000000710", "P10")
            .allotted("B0000000000712", "P12"),
    );
    let orchestrator = orchestrator(
        FakeSpatial {
            codes: vec!["B0000000000710"],
        },
        details.clone(),
        FakeStatus::default().listing("Kolar", "Vemagal", vec!["P10", "P12"]),
    );

    let result = orchestrator.run_area(&area(), &coordinates()).await;

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.coverage.discovered, 1);
    assert_eq!(result.coverage.recovered, 1);
    assert_eq!(result.coverage.contactable, 2);
    assert!(result.is_converged());
    assert!(result.coverage.probed < 99);
    // Neighbourhood of suffix 10 is probed before the far end of the sweep.
    assert_eq!(details.calls_for("B0000000000799"), 0);
}

#[tokio::test]
async fn unrecoverable_plots_are_reported_after_exhausting_the_base() {
    let details = Arc::new(
        FakeDetails::default()
            .allotted("B0000000000710", "P10")
            .allotted("B0000000000712", "P12"),
    );
    let orchestrator = orchestrator(
        FakeSpatial {
            codes: vec!["B0000000000710"],
        },
        details.clone(),
        FakeStatus::default().listing("Kolar", "Vemagal", vec!["P10", "P12", "P99"]),
    );

    let result = orchestrator.run_area(&area(), &coordinates()).await;

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.coverage.recovered, 1);
    assert_eq!(result.coverage.missing, 1);
    assert_eq!(result.unrecovered, vec!["P99".to_string()]);
    assert_eq!(result.coverage.probed, 99);
    for suffix in 0..100 {
        assert_eq!(details.calls_for(&format!("B00000000007{:02}", suffix)), 1);
    }
}

#[tokio::test]
async fn status_listing_falls_back_to_raw_spelling() {
    let details = Arc::new(FakeDetails::default().allotted("B0000000000710", "P10"));
    let orchestrator = orchestrator(
        FakeSpatial {
            codes: vec!["B0000000000710"],
        },
        details,
        FakeStatus::default().listing("Bengaluru_Rural", "Dobbaspet", vec!["P10"]),
    );

    let area = Area::from_stem("Bengaluru_Rural-Dobbaspet").unwrap();
    let result = orchestrator.run_area(&area, &coordinates()).await;

    assert_eq!(result.coverage.expected, 1);
    assert!(result.is_converged());
    assert_eq!(result.summary_row().district, "Bengaluru Rural");
}

#[tokio::test]
async fn invalid_codes_stay_invalid_across_areas() {
    let details = Arc::new(FakeDetails::default());
    let orchestrator = orchestrator(
        FakeSpatial { codes: Vec::new() },
        details.clone(),
        FakeStatus::default()
            .listing("Kolar", "Vemagal", vec!["P1"])
            .listing("Kolar", "Malur", vec!["P2"]),
    );

    orchestrator.run_area(&area(), &coordinates()).await;
    assert_eq!(details.total_calls(), 100);

    let second = Area::from_stem("Kolar-Malur").unwrap();
    let result = orchestrator.run_area(&second, &coordinates()).await;

    assert_eq!(details.total_calls(), 100);
    assert_eq!(result.coverage.probed, 100);
    assert_eq!(result.unrecovered, vec!["P2".to_string()]);
}

#[tokio::test]
async fn no_status_listing_means_no_exploration() {
    let details = Arc::new(FakeDetails::default().allotted("B0000000000710", "P10"));
    let orchestrator = orchestrator(
        FakeSpatial {
            codes: vec!["B0000000000710"],
        },
        details.clone(),
        FakeStatus::default(),
    );

    let result = orchestrator.run_area(&area(), &coordinates()).await;

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.coverage.expected, 0);
    assert_eq!(result.coverage.probed, 0);
    assert_eq!(details.total_calls(), 1);
}
