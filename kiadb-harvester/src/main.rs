use kiadb_harvester::config;
use kiadb_harvester::module::discovery::SpatialDiscovery;
use kiadb_harvester::module::explorer::CodeSpaceExplorer;
use kiadb_harvester::module::fetcher::RecordFetcher;
use kiadb_harvester::module::orchestrator::DiscoveryOrchestrator;
use kiadb_harvester::module::output::{list_coordinate_files, load_area, CsvSink};
use kiadb_harvester::module::state::InvalidCodeCache;
use kiadb_harvester::module::transport::RateLimitedTransport;

use anyhow::Result;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::read_config()?;

    // Initialize logging
    let _logging_guard = kiadb_harvester::logging::init_logging(
        &config.log_dir,
        "kiadb-harvester",
        &config.log_level,
    )?;

    tracing::info!("KIADB harvester starting...");
    tracing::info!(
        "Rate limit: {} calls per {} ms, {} workers",
        config.rate_limit.calls,
        config.rate_limit.period_ms,
        config.pipeline.workers
    );

    // One transport, one gate, for every endpoint
    let transport = Arc::new(RateLimitedTransport::new(
        config.transport_settings(),
        config.rate_gate(),
        config.retry_policy(),
    )?);
    transport.warm_up().await;

    let orchestrator = DiscoveryOrchestrator::new(
        SpatialDiscovery::new(
            transport.clone(),
            config.spatial.batch_size,
            config.spatial.margin,
            config.spatial.cache_capacity,
        ),
        RecordFetcher::new(transport.clone(), Arc::new(InvalidCodeCache::new())),
        CodeSpaceExplorer::new(config.explorer.radius, config.default_base()?),
        transport.clone(),
        config.pipeline.workers,
    );

    let files = match &config.coord_file {
        Some(file) => vec![file.clone()],
        None => list_coordinate_files(&config.coordinates_dir).await?,
    };
    if files.is_empty() {
        tracing::warn!("No coordinate files found in {:?}", config.coordinates_dir);
        return Ok(());
    }
    tracing::info!("Processing {} area(s)", files.len());

    let sink = CsvSink::new(&config.output_dir);
    let mut summary = Vec::new();

    for path in &files {
        let input = match load_area(path).await {
            Ok(input) => input,
            Err(e) => {
                tracing::error!("Skipping {:?}: {:#}", path, e);
                continue;
            }
        };
        if input.coordinates.is_empty() {
            tracing::warn!("No coordinates in {:?}, probing from the code space only", path);
        }

        let result = orchestrator.run_area(&input.area, &input.coordinates).await;
        if let Err(e) = sink.write_area(&result) {
            tracing::error!("Failed to write output for {}: {:#}", input.area, e);
        }
        summary.push(result.summary_row());
    }

    sink.write_summary(&summary)?;
    tracing::info!(
        "Harvest finished: {} area(s), {} codes cached as invalid",
        summary.len(),
        orchestrator.fetcher().invalid_cache().len()
    );

    Ok(())
}
