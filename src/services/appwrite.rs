use super::{PictureResolver, ServiceError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Appwrite Storage location of profile pictures
#[derive(Debug, Clone)]
pub struct AppwriteStorage {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub bucket_id: String,
}

/// Resolves picture names as Appwrite Storage file ids
///
/// The file metadata is fetched first so that missing or non-image files
/// fail the resolution instead of producing a broken URL; the returned URL is
/// the public `view` endpoint of the file.
pub struct AppwritePictureResolver {
    storage: AppwriteStorage,
    client: Client,
}

impl AppwritePictureResolver {
    pub fn new(storage: AppwriteStorage, timeout_secs: u64) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { storage, client })
    }

    fn file_url(&self, file_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}",
            self.storage.endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.storage.bucket_id),
            urlencoding::encode(file_id)
        )
    }

    /// Public URL rendering the file
    pub fn view_url(&self, file_id: &str) -> String {
        format!(
            "{}/view?project={}",
            self.file_url(file_id),
            urlencoding::encode(&self.storage.project_id)
        )
    }
}

#[async_trait]
impl PictureResolver for AppwritePictureResolver {
    async fn resolve(&self, profile_id: &str, picture_name: &str) -> Result<String, ServiceError> {
        let url = self.file_url(picture_name);

        tracing::debug!("Fetching picture metadata for profile {}: {}", profile_id, url);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.storage.api_key)
            .header("X-Appwrite-Project", &self.storage.project_id)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ServiceError::NotFound(format!(
                    "picture {} of profile {}",
                    picture_name, profile_id
                )));
            }
            StatusCode::UNAUTHORIZED => {
                return Err(ServiceError::Rejected("invalid API key or project".into()));
            }
            status => {
                return Err(ServiceError::Unavailable(format!(
                    "Failed to fetch picture metadata: {}",
                    status
                )));
            }
        }

        let json: Value = response.json().await?;

        let mime_type = json
            .get("mimeType")
            .and_then(|m| m.as_str())
            .ok_or_else(|| ServiceError::InvalidResponse("Missing mimeType".into()))?;

        if !mime_type.starts_with("image/") {
            return Err(ServiceError::InvalidResponse(format!(
                "File {} is not an image ({})",
                picture_name, mime_type
            )));
        }

        Ok(self.view_url(picture_name))
    }
}
