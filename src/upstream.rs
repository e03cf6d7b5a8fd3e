//! Client for the ranch backend: boundary and herd-config sources, and the
//! herd ingestion sink.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{HerdConfigPatch, UpstreamConfig};
use crate::engine::HerdPayload;
use crate::geo::{FencePolygon, GeoPoint};
use crate::herd::Pasture;

/// Errors talking to the ranch backend
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Destination for per-tick herd pushes
pub trait HerdSink: Send + Sync {
    fn push(&self, payload: &HerdPayload) -> impl Future<Output = Result<(), UpstreamError>> + Send;
}

#[derive(Debug, Deserialize)]
struct FenceBody {
    coordinates: Vec<[f64; 2]>,
}

/// `GET /api/config` response, reduced to what the simulator reads
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RanchConfigResponse {
    #[serde(default, alias = "center")]
    ranch_center: Option<GeoPoint>,
    #[serde(default)]
    fence: Option<FenceBody>,
}

#[derive(Debug, Deserialize)]
struct HerdConfigResponse {
    config: HerdConfigPatch,
}

/// HTTP client for the ranch backend
#[derive(Debug, Clone)]
pub struct RanchClient {
    base_url: String,
    http: reqwest::Client,
}

impl RanchClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch ranch centre and fence
    pub async fn fetch_pasture(&self) -> Result<Pasture, UpstreamError> {
        let body: RanchConfigResponse = self.get_json("/api/config").await?;
        let fence = body
            .fence
            .and_then(|f| FencePolygon::from_coordinates(f.coordinates));
        Ok(Pasture::resolve(body.ranch_center, fence))
    }

    /// Fetch the herd tunables stored on the backend
    pub async fn fetch_herd_config(&self) -> Result<HerdConfigPatch, UpstreamError> {
        let body: HerdConfigResponse = self.get_json("/api/simulator/herd/config").await?;
        Ok(body.config)
    }

    /// Fetch the pasture, falling back to defaults when the backend is unreachable
    pub async fn load_pasture_or_default(&self) -> Pasture {
        match self.fetch_pasture().await {
            Ok(pasture) => {
                match pasture.fence.as_ref().map(FencePolygon::bounds) {
                    Some(b) => log::info!(
                        "Pasture boundary loaded: centre ({:.6}, {:.6}), bounds [{:.6}, {:.6}] to [{:.6}, {:.6}]",
                        pasture.center.lat,
                        pasture.center.lon,
                        b.min_lat,
                        b.min_lon,
                        b.max_lat,
                        b.max_lon
                    ),
                    None => log::warn!(
                        "No pasture boundary from backend - herd will roam unfenced around ({:.6}, {:.6})",
                        pasture.center.lat,
                        pasture.center.lon
                    ),
                }
                pasture
            }
            Err(e) => {
                log::warn!("Failed to load pasture data, using default location: {}", e);
                Pasture::default()
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;
        let response = check_status(&url, response).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| UpstreamError::Decode { url, source })
    }
}

impl HerdSink for RanchClient {
    fn push(&self, payload: &HerdPayload) -> impl Future<Output = Result<(), UpstreamError>> + Send {
        let url = self.url("/api/herd");
        let request = self.http.post(url.clone()).json(payload);
        async move {
            let response = request
                .send()
                .await
                .map_err(|source| UpstreamError::Transport {
                    url: url.clone(),
                    source,
                })?;
            check_status(&url, response).await?;
            Ok(())
        }
    }
}

async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unavailable>".to_string());
        Err(UpstreamError::Status {
            url: url.to_string(),
            status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranch_config_decoding() {
        let body = r#"{
            "mapboxToken": "x",
            "ranchCenter": {"lat": 35.1, "lon": -106.2},
            "fence": {"coordinates": [[-106.3, 35.0], [-106.1, 35.0], [-106.1, 35.2], [-106.3, 35.2]]},
            "gates": []
        }"#;
        let parsed: RanchConfigResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.ranch_center, Some(GeoPoint::new(35.1, -106.2)));
        assert_eq!(parsed.fence.unwrap().coordinates.len(), 4);

        let alias: RanchConfigResponse =
            serde_json::from_str(r#"{"center": {"lat": 1.0, "lon": 2.0}, "fence": null}"#).unwrap();
        assert_eq!(alias.ranch_center, Some(GeoPoint::new(1.0, 2.0)));
        assert!(alias.fence.is_none());
    }

    #[test]
    fn test_base_url_normalized() {
        let client = RanchClient::new(&UpstreamConfig {
            base_url: "http://ranch.local:8082/".to_string(),
            timeout_ms: 1000,
        });
        assert_eq!(client.url("/api/herd"), "http://ranch.local:8082/api/herd");
    }
}
