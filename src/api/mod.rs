//! Clients for the remote services the storefront depends on.
//!
//! Workflows only see the traits below. Concrete HTTP clients are built once
//! at startup and injected through [`crate::app_state::AppState`].

pub mod ledger;
pub mod minter;
pub mod storage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::wallet::WalletAddress;

pub use ledger::SolanaRpc;
pub use minter::HttpMinter;
pub use storage::HttpMetadataStorage;

/// What the ledger currently knows about a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Not seen yet, or seen but not confirmed.
    Pending,
    Confirmed,
    /// Included but the ledger reports an execution error.
    Failed(String),
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn latest_blockhash(&self) -> anyhow::Result<String>;

    async fn signature_status(&self, signature: &str) -> anyhow::Result<SignatureStatus>;

    /// Balance in lamports.
    async fn balance(&self, wallet: &WalletAddress) -> anyhow::Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub uri: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataProperties {
    pub category: String,
    pub files: Vec<MetadataFile>,
}

/// Off-chain token metadata in the common NFT JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image: String,
    pub seller_fee_basis_points: u16,
    pub attributes: Vec<MetadataAttribute>,
    pub properties: MetadataProperties,
}

#[async_trait]
pub trait MetadataStorage: Send + Sync {
    /// Stores the document and returns its permanent URI.
    async fn upload_json(&self, metadata: &NftMetadata) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintRequest {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub recipient: WalletAddress,
    pub seller_fee_basis_points: u16,
    pub is_mutable: bool,
    pub max_supply: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintedNft {
    pub mint_address: String,
}

#[async_trait]
pub trait NftMinter: Send + Sync {
    /// Creates a one-of-one token owned by `request.recipient`. Not idempotent.
    async fn create_nft(&self, request: &MintRequest) -> anyhow::Result<MintedNft>;
}

/// Shared outbound HTTP client with the configured per-request timeout.
pub fn http_client(timeout: std::time::Duration) -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}
