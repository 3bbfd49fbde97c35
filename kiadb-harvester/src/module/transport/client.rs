//! reqwest-backed transport for the portal and the spatial service

use anyhow::{Context, Result};
use async_trait::async_trait;
use kiadb_common::{Envelope, ALLOTTED_STATUS};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::payload::{classify_primary, decode_asmx_body, decode_payload_text};
use super::rate_limit::RateGate;
use super::retry::{with_retry, RetryPolicy};
use super::soap::{build_envelope, extract_result, soap_action, SOAP_CONTENT_TYPE};
use super::types::{
    CallOutcome, Endpoint, Payload, PrimaryAttempt, SpatialFeature, StatusRow, TransportError,
};
use super::{resolve_fallback, DetailService, SpatialService, StatusListing};

const STATUS_METHOD: &str = "Getplotdetailsbystatus";

/// Endpoints and request shaping for [`RateLimitedTransport`].
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Portal root, e.g. `http://kiadb.karnataka.gov.in/kiadbgisportal`.
    pub base_url: String,
    pub soap_namespace: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub spatial_url: String,
    pub spatial_reference: u32,
}

#[derive(Debug, Deserialize)]
struct FeatureSet {
    #[serde(default)]
    features: Vec<SpatialFeature>,
    #[serde(default)]
    error: Option<Value>,
}

/// Shared transport: one HTTP client, one rate gate, one retry policy.
pub struct RateLimitedTransport {
    client: Client,
    gate: Arc<RateGate>,
    retry: RetryPolicy,
    settings: TransportSettings,
}

impl RateLimitedTransport {
    pub fn new(settings: TransportSettings, gate: Arc<RateGate>, retry: RetryPolicy) -> Result<Self> {
        let origin = Url::parse(&settings.base_url)
            .context(format!("Invalid portal base URL: {}", settings.base_url))?
            .origin()
            .ascii_serialization();

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&origin).context("Portal origin is not a valid header")?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&format!("{}/", settings.base_url.trim_end_matches('/')))
                .context("Portal URL is not a valid header")?,
        );

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            gate,
            retry,
            settings,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/sulb.asmx/{}",
            self.settings.base_url.trim_end_matches('/'),
            method
        )
    }

    /// Load the portal landing page once so the session carries its cookies.
    pub async fn warm_up(&self) {
        let url = format!("{}/", self.settings.base_url.trim_end_matches('/'));
        self.gate.acquire().await;
        match self.client.get(&url).send().await {
            Ok(resp) => tracing::info!("Portal session warmed up ({})", resp.status()),
            Err(e) => tracing::warn!("Portal warm-up failed, continuing without cookies: {}", e),
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<String, TransportError> {
        self.gate.acquire().await;
        let text = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    async fn soap_attempt(&self, endpoint: Endpoint, code: &str) -> Result<Payload, TransportError> {
        let method = endpoint.method();
        let envelope = build_envelope(&self.settings.soap_namespace, method, code);

        self.gate.acquire().await;
        let xml = self
            .client
            .post(self.method_url(method))
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", soap_action(&self.settings.soap_namespace, method))
            .body(envelope)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let text = extract_result(&xml, method)?;
        decode_payload_text(&text)
    }

    async fn soap_fallback(&self, endpoint: Endpoint, code: &str) -> Result<Payload, TransportError> {
        let label = format!("SOAP {} {}", endpoint.method(), code);
        with_retry(&self.retry, &label, |_| self.soap_attempt(endpoint, code)).await
    }
}

#[async_trait]
impl DetailService for RateLimitedTransport {
    async fn call(&self, endpoint: Endpoint, code: &str) -> CallOutcome {
        let url = self.method_url(endpoint.method());
        let primary = classify_primary(self.post_json(&url, &json!({ "plcd": code })).await);

        let failure = match primary {
            PrimaryAttempt::Success(row) => {
                tracing::info!("{} {}: success", endpoint, code);
                return CallOutcome::Found(row);
            }
            PrimaryAttempt::PrimaryFailed(failure) => failure,
        };

        tracing::debug!("{} {}: primary failed ({}), trying SOAP", endpoint, code, failure);
        let fallback = self.soap_fallback(endpoint, code).await;
        let outcome = resolve_fallback(&failure, fallback);

        match &outcome {
            CallOutcome::Found(_) => tracing::info!("{} {}: fallback", endpoint, code),
            CallOutcome::NotFound => tracing::info!("{} {}: not_found", endpoint, code),
            CallOutcome::TransientFailure(reason) => {
                tracing::warn!("{} {}: failure ({})", endpoint, code, reason)
            }
        }
        outcome
    }
}

#[async_trait]
impl SpatialService for RateLimitedTransport {
    async fn query_envelope(
        &self,
        envelope: &Envelope,
    ) -> Result<Vec<SpatialFeature>, TransportError> {
        let wkid = self.settings.spatial_reference.to_string();
        let geometry = envelope.to_arcgis_json(self.settings.spatial_reference);
        let url = Url::parse_with_params(
            &self.settings.spatial_url,
            &[
                ("f", "json"),
                ("returnGeometry", "true"),
                ("spatialRel", "esriSpatialRelIntersects"),
                ("geometry", geometry.as_str()),
                ("geometryType", "esriGeometryEnvelope"),
                ("inSR", wkid.as_str()),
                ("outFields", "*"),
                ("outSR", wkid.as_str()),
            ],
        )
        .map_err(|e| TransportError::Parse(format!("invalid spatial URL: {}", e)))?;

        self.gate.acquire().await;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let features = decode_features(&body)?;
        tracing::info!("Spatial query returned {} features", features.len());
        Ok(features)
    }
}

#[async_trait]
impl StatusListing for RateLimitedTransport {
    async fn plots_by_status(
        &self,
        district: &str,
        area: &str,
    ) -> Result<Option<Vec<StatusRow>>, TransportError> {
        let url = self.method_url(STATUS_METHOD);
        let body = self
            .post_json(
                &url,
                &json!({ "dstr": district, "nmindar": area, "indx": ALLOTTED_STATUS }),
            )
            .await?;

        match decode_asmx_body(&body)? {
            Payload::Rows(rows) => Ok(Some(rows.iter().map(StatusRow::from_raw).collect())),
            Payload::Empty => Ok(Some(Vec::new())),
            Payload::WrongInput => Ok(None),
        }
    }
}

/// Parse an ArcGIS feature-set answer.
pub fn decode_features(body: &str) -> Result<Vec<SpatialFeature>, TransportError> {
    let set: FeatureSet =
        serde_json::from_str(body).map_err(|e| TransportError::Parse(e.to_string()))?;
    if let Some(error) = set.error {
        return Err(TransportError::Parse(format!("spatial service error: {}", error)));
    }
    Ok(set.features)
}
