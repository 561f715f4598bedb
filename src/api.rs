//! Client for the read-only recommendations API used by deep scans.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::ApiConfig;
use crate::utils::error::{AppError, Result};

/// One sibling returned by variant discovery.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Variation {
    pub asin: String,
    #[serde(default)]
    pub dimensions: Option<serde_json::Value>,
}

/// Pricing and catalog details for a single variant.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VariantDetail {
    pub by_line_contributors: Option<Vec<serde_json::Value>>,
    pub limited_quantity: Option<bool>,
    pub catalog_size: Option<f64>,
    pub tax_value: Option<f64>,
    pub tax_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error: Option<serde_json::Value>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct VariationsResult {
    #[serde(default)]
    variations: Vec<Variation>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationApi: Send + Sync {
    /// Lists the variant family of the item addressed by `recommendation_id`.
    async fn variations(&self, recommendation_id: &str) -> Result<Vec<Variation>>;

    async fn variant_detail(&self, recommendation_id: &str, variant_id: &str) -> Result<VariantDetail>;
}

/// Error flags are loosely typed on the wire; anything truthy counts.
fn is_error_flag(error: &Option<serde_json::Value>) -> bool {
    match error {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(flag)) => *flag,
        Some(serde_json::Value::Number(n)) => n.as_f64().map_or(true, |n| n != 0.0),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

pub struct VineApiClient {
    client: Client,
    base_url: Url,
    image_size: u32,
}

impl VineApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::Validation(format!("Invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "API base URL cannot be a base: {}",
                config.base_url
            )));
        }

        let client = Client::builder().user_agent(&config.user_agent).build()?;

        Ok(Self {
            client,
            base_url,
            image_size: config.image_size,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["vine", "api", "recommendations"])
                .extend(segments);
        }
        url
    }

    pub fn variations_url(&self, recommendation_id: &str) -> Url {
        self.endpoint(&[recommendation_id])
    }

    pub fn variant_detail_url(&self, recommendation_id: &str, variant_id: &str) -> Url {
        let mut url = self.endpoint(&[recommendation_id, "item", variant_id]);
        url.query_pairs_mut()
            .append_pair("imageSize", &self.image_size.to_string());
        url
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let endpoint = url.path().to_string();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::RemoteStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<T> = response.json().await?;
        if is_error_flag(&envelope.error) {
            return Err(AppError::RemoteRejected { endpoint });
        }
        envelope.result.ok_or(AppError::RemoteRejected { endpoint })
    }
}

#[async_trait]
impl RecommendationApi for VineApiClient {
    async fn variations(&self, recommendation_id: &str) -> Result<Vec<Variation>> {
        let result: VariationsResult = self.fetch(self.variations_url(recommendation_id)).await?;
        Ok(result.variations)
    }

    async fn variant_detail(&self, recommendation_id: &str, variant_id: &str) -> Result<VariantDetail> {
        self.fetch(self.variant_detail_url(recommendation_id, variant_id))
            .await
    }
}
