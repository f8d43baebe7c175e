use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{MetadataStorage, NftMetadata};

/// Metadata storage service reached over HTTP. `POST {base}/metadata` stores a
/// JSON document and answers with its content-addressed URI.
#[derive(Clone)]
pub struct HttpMetadataStorage {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadRes {
    uri: String,
}

impl HttpMetadataStorage {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetadataStorage for HttpMetadataStorage {
    async fn upload_json(&self, metadata: &NftMetadata) -> Result<String> {
        let uploaded: UploadRes = self
            .client
            .post(format!("{}/metadata", self.base_url))
            .json(metadata)
            .send()
            .await
            .context("Metadata storage unreachable")?
            .error_for_status()
            .context("Metadata storage rejected the upload")?
            .json()
            .await
            .context("Failed to parse JSON")?;

        Ok(uploaded.uri)
    }
}
