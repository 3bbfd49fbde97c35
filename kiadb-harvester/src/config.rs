use anyhow::{bail, Context};
use kiadb_common::CodeBase;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::module::transport::{RateGate, RetryPolicy, TransportSettings};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_ENV: &str = "KIADB_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_soap_namespace")]
    pub soap_namespace: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialConfig {
    #[serde(default = "default_query_url")]
    pub query_url: String,

    #[serde(default = "default_spatial_reference")]
    pub spatial_reference: u32,

    /// Coordinates per envelope query.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Padding around each batch bounding box, in map units.
    #[serde(default = "default_margin")]
    pub margin: f64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_calls")]
    pub calls: usize,

    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Suffixes probed on each side of an observed one before the full sweep.
    #[serde(default = "default_radius")]
    pub radius: u8,

    /// Base probed when spatial discovery observed no well-formed code.
    #[serde(default = "default_code_base")]
    pub default_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvesterConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_coordinates_dir")]
    pub coordinates_dir: PathBuf,

    /// Harvest only this file instead of every file in `coordinates_dir`.
    #[serde(default)]
    pub coord_file: Option<PathBuf>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub spatial: SpatialConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub explorer: ExplorerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_coordinates_dir() -> PathBuf {
    PathBuf::from("coordinates")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("kiadb_data")
}

fn default_base_url() -> String {
    "http://kiadb.karnataka.gov.in/kiadbgisportal".to_string()
}

fn default_soap_namespace() -> String {
    "http://kiadb.karnataka.gov.in/kiadbgisportal/sulb".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_query_url() -> String {
    "https://kgis.ksrsac.in/kgismaps2/rest/services/KIADB/KIADB/MapServer/1/query".to_string()
}

fn default_spatial_reference() -> u32 {
    102100
}

fn default_batch_size() -> usize {
    5
}

fn default_margin() -> f64 {
    100.0
}

fn default_cache_capacity() -> usize {
    100
}

fn default_calls() -> usize {
    3
}

fn default_period_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_radius() -> u8 {
    5
}

fn default_code_base() -> String {
    "Z06572016300".to_string()
}

fn default_workers() -> usize {
    3
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            soap_namespace: default_soap_namespace(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            query_url: default_query_url(),
            spatial_reference: default_spatial_reference(),
            batch_size: default_batch_size(),
            margin: default_margin(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls: default_calls(),
            period_ms: default_period_ms(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            default_base: default_code_base(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            coordinates_dir: default_coordinates_dir(),
            coord_file: None,
            output_dir: default_output_dir(),
            portal: PortalConfig::default(),
            spatial: SpatialConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            explorer: ExplorerConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl HarvesterConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file {:?}", path))?;
        let config: HarvesterConfig = toml::from_str(&content)
            .context(format!("Failed to parse config file {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.spatial.batch_size == 0 {
            bail!("spatial.batch_size must be at least 1");
        }
        if !self.spatial.margin.is_finite() || self.spatial.margin < 0.0 {
            bail!("spatial.margin must be a non-negative number");
        }
        if self.rate_limit.calls == 0 {
            bail!("rate_limit.calls must be at least 1");
        }
        if self.rate_limit.period_ms == 0 {
            bail!("rate_limit.period_ms must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.pipeline.workers == 0 {
            bail!("pipeline.workers must be at least 1");
        }
        self.default_base()?;
        Ok(())
    }

    pub fn default_base(&self) -> anyhow::Result<CodeBase> {
        CodeBase::parse(&self.explorer.default_base).context("explorer.default_base is malformed")
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            base_url: self.portal.base_url.clone(),
            soap_namespace: self.portal.soap_namespace.clone(),
            user_agent: self.portal.user_agent.clone(),
            request_timeout: Duration::from_secs(self.portal.request_timeout_secs),
            spatial_url: self.spatial.query_url.clone(),
            spatial_reference: self.spatial.spatial_reference,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn rate_gate(&self) -> Arc<RateGate> {
        Arc::new(RateGate::new(
            self.rate_limit.calls,
            Duration::from_millis(self.rate_limit.period_ms),
        ))
    }
}

pub static CONFIG: OnceLock<HarvesterConfig> = OnceLock::new();

/// Load the configuration once. A missing file yields the defaults.
pub fn read_config() -> anyhow::Result<&'static HarvesterConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&path).exists() {
        HarvesterConfig::from_file(&path)?
    } else {
        HarvesterConfig::default()
    };

    Ok(CONFIG.get_or_init(|| config))
}
