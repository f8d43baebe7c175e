use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::{MintRequest, MintedNft, NftMinter};

/// Minting service reached over HTTP. It signs as the store's issuing
/// identity and transfers the new token to the recipient.
#[derive(Clone)]
pub struct HttpMinter {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpMinter {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl NftMinter for HttpMinter {
    async fn create_nft(&self, request: &MintRequest) -> Result<MintedNft> {
        let mut builder = self
            .client
            .post(format!("{}/nfts", self.base_url))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        builder
            .send()
            .await
            .context("Minting service unreachable")?
            .error_for_status()
            .context("Minting service rejected the request")?
            .json()
            .await
            .context("Failed to parse JSON")
    }
}
