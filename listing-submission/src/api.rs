//! Remote PlantSwap API
//!
//! The submission pipeline talks to the backend through [`ListingApi`];
//! [`HttpListingApi`] is the `reqwest` implementation used by the app.

use crate::models::{CapturedImage, ImageId, Listing, ListingId, ListingType};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Configuration for the backend connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base address of the REST API, e.g. `http://localhost:3000/api/v1/`
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/v1/".to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 10,
            user_agent: "PlantSwap/0.1.0".to_string(),
        }
    }
}

/// Errors returned by the remote API
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Network(String),
    Status { status: u16, body: String },
    Decode(String),
    InvalidRequest(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Status { status, body } => {
                write!(f, "Server returned status {}: {}", status, body)
            }
            ApiError::Decode(msg) => write!(f, "Invalid response: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Body of `POST listing`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub listing_type: ListingType,
    pub pictures: Vec<ImageId>,
    pub thumbnail: ImageId,
    pub tradeable: bool,
}

#[derive(Debug, Deserialize)]
struct PictureUploadResponse {
    id: ImageId,
}

/// Backend calls the app needs
pub trait ListingApi: Send + Sync {
    /// Uploads one image and returns the id the backend assigned to it
    fn upload_image(
        &self,
        image: &CapturedImage,
    ) -> impl Future<Output = Result<ImageId, ApiError>> + Send;

    fn create_listing(
        &self,
        request: &CreateListingRequest,
    ) -> impl Future<Output = Result<Listing, ApiError>> + Send;

    fn list_listings(&self) -> impl Future<Output = Result<Vec<Listing>, ApiError>> + Send;

    /// `Ok(None)` if the backend does not know the listing
    fn get_listing(
        &self,
        id: ListingId,
    ) -> impl Future<Output = Result<Option<Listing>, ApiError>> + Send;
}

/// HTTP client for the PlantSwap REST API
#[derive(Debug, Clone)]
pub struct HttpListingApi {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpListingApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = reqwest::Url::parse(&base)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid base URL {}: {}", base, e)))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ApiError::Network(format!("Client build failed: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid path {}: {}", path, e)))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl ListingApi for HttpListingApi {
    async fn upload_image(&self, image: &CapturedImage) -> Result<ImageId, ApiError> {
        let content_type = image.content_type().ok_or_else(|| {
            ApiError::InvalidRequest(format!("Image {} is not a JPEG or PNG", image.local_id))
        })?;

        let part = reqwest::multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("picture", part);

        log::debug!(
            "Uploading image {} ({} bytes, {})",
            image.local_id,
            image.size(),
            content_type
        );

        let response = self
            .client
            .post(self.endpoint("pictures")?)
            .multipart(form)
            .send()
            .await?;
        let uploaded: PictureUploadResponse = Self::ensure_success(response).await?.json().await?;

        log::info!("Uploaded image {} as {}", image.local_id, uploaded.id);
        Ok(uploaded.id)
    }

    async fn create_listing(&self, request: &CreateListingRequest) -> Result<Listing, ApiError> {
        let response = self
            .client
            .post(self.endpoint("listing")?)
            .json(request)
            .send()
            .await?;
        let listing: Listing = Self::ensure_success(response).await?.json().await?;

        log::info!("Created listing {} ({})", listing.id, listing.title);
        Ok(listing)
    }

    async fn list_listings(&self) -> Result<Vec<Listing>, ApiError> {
        let response = self.client.get(self.endpoint("listing")?).send().await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("listing/{}", id))?)
            .send()
            .await?;

        match response.status().as_u16() {
            204 | 404 => Ok(None),
            _ => Ok(Some(Self::ensure_success(response).await?.json().await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_endpoints_resolve_against_base_url() {
        let api = HttpListingApi::new(&ApiConfig {
            base_url: "http://plants.local:3000/api/v1".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();

        assert_eq!(
            api.endpoint("pictures").unwrap().as_str(),
            "http://plants.local:3000/api/v1/pictures"
        );
        assert_eq!(
            api.endpoint("listing/abc").unwrap().as_str(),
            "http://plants.local:3000/api/v1/listing/abc"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpListingApi::new(&ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        });
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn test_create_request_matches_backend_fields() {
        let image = ImageId(Uuid::from_u128(101));
        let request = CreateListingRequest {
            title: "Monstera cutting".to_string(),
            description: String::new(),
            listing_type: ListingType::Selling,
            pictures: vec![image],
            thumbnail: image,
            tradeable: true,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["listing_type"], "Selling");
        assert_eq!(json["pictures"][0], image.0.to_string());
        assert_eq!(json["thumbnail"], image.0.to_string());
        assert_eq!(json["tradeable"], true);
    }

    #[test]
    fn test_listing_response_parses() {
        let body = r#"{
            "id": "00000000-0000-0000-0000-000000000037",
            "title": "Monstera cutting",
            "description": "",
            "insertion_date": "2024-05-01T12:30:00",
            "author": "00000000-0000-0000-0000-000000000001",
            "listing_type": "Buying",
            "thumbnail": "00000000-0000-0000-0000-000000000065",
            "tradeable": false,
            "identified_plant": null
        }"#;

        let listing: Listing = serde_json::from_str(body).unwrap();
        assert_eq!(listing.id, ListingId(Uuid::from_u128(55)));
        assert_eq!(listing.thumbnail, ImageId(Uuid::from_u128(101)));
        assert_eq!(listing.listing_type, ListingType::Buying);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ApiConfig = serde_json::from_str(r#"{"base_url": "https://plantswap.app/api/v1/"}"#).unwrap();
        assert_eq!(config.base_url, "https://plantswap.app/api/v1/");
        assert_eq!(config.timeout_secs, 60);
    }
}
