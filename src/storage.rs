//! Google Cloud Storage upload through the JSON API media endpoint.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::client::{http_client, send};
use crate::config::StorageConfig;
use crate::contract::ObjectStore;
use crate::error::ApiError;

pub struct GcsStore {
    http: Client,
    base_url: String,
    bucket: String,
    token: SecretString,
}

impl GcsStore {
    pub fn new(config: &StorageConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http: http_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            token: SecretString::from(config.access_token.expose_secret().to_string()),
        })
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn upload(
        &self,
        object_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ApiError> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);
        let size = content.len();
        let request = self
            .http
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object_name)])
            .bearer_auth(self.token.expose_secret())
            .header(CONTENT_TYPE, content_type)
            .body(content);
        send(request, "POST", &url).await?;

        let location = format!("gs://{}/{}", self.bucket, object_name);
        info!(location = %location, bytes = size, "Uploaded object");
        Ok(location)
    }
}
