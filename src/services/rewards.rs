//! Loyalty rewards: tier eligibility and NFT issuance.
//!
//! Eligibility counts completed orders only. Every tier whose threshold is met
//! and which the wallet has not minted yet is offered, ascending.
//!
//! Issuance claims the (wallet, tier) slot in the store before any remote
//! work, so two concurrent requests cannot both reach the minter. Every
//! attempt that gets past the claim ends as a `minted` or `failed` row.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::api::{
    MetadataAttribute, MetadataFile, MetadataProperties, MetadataStorage, MintRequest, NftMetadata,
    NftMinter,
};
use crate::app_error::AppError;
use crate::models::{NftReward, RewardTier};
use crate::services::retry::RetryPolicy;
use crate::store::{Store, StoreError};
use crate::wallet::WalletAddress;

pub const NFT_SYMBOL: &str = "LEMON";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub eligible_tiers: Vec<RewardTier>,
    pub current_count: i64,
    pub minted_tiers: Vec<RewardTier>,
    /// Completed orders needed for the next tier, if any remain.
    pub next_tier_at: Option<i64>,
    /// Percent of the way to `next_tier_at`; 100 once past the top tier.
    pub progress: u8,
}

/// Every tier reached by `completed` that is not in `minted`, ascending.
pub fn eligible_tiers(completed: i64, minted: &[RewardTier]) -> Vec<RewardTier> {
    RewardTier::ALL
        .into_iter()
        .filter(|tier| completed >= tier.threshold() && !minted.contains(tier))
        .collect()
}

pub fn evaluate(completed: i64, mut minted: Vec<RewardTier>) -> Eligibility {
    minted.sort();
    minted.dedup();

    let next_tier_at = RewardTier::ALL
        .into_iter()
        .map(RewardTier::threshold)
        .find(|threshold| *threshold > completed);
    let progress = match next_tier_at {
        Some(next) => (completed.max(0) * 100 / next).clamp(0, 100) as u8,
        None => 100,
    };

    Eligibility {
        eligible_tiers: eligible_tiers(completed, &minted),
        current_count: completed,
        minted_tiers: minted,
        next_tier_at,
        progress,
    }
}

pub fn build_metadata(
    wallet: &WalletAddress,
    tier: RewardTier,
    awarded_at: DateTime<Utc>,
    base_url: &str,
) -> NftMetadata {
    let image = format!("{base_url}/assets/nft-{}.svg", tier.as_str());
    let attribute = |trait_type: &str, value: String| MetadataAttribute {
        trait_type: trait_type.to_string(),
        value,
    };

    NftMetadata {
        name: format!("Joey's Lemonades {} NFT", tier.display_name()),
        symbol: NFT_SYMBOL.to_string(),
        description: tier.description().to_string(),
        image: image.clone(),
        seller_fee_basis_points: 0,
        attributes: vec![
            attribute("Tier", tier.display_name().to_string()),
            attribute("Discount", format!("{}%", tier.discount_percent())),
            attribute("Wallet", wallet.to_string()),
            attribute(
                "Date Awarded",
                awarded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        ],
        properties: MetadataProperties {
            category: "image".to_string(),
            files: vec![MetadataFile {
                uri: image,
                content_type: "image/svg+xml".to_string(),
            }],
        },
    }
}

#[derive(Clone)]
pub struct RewardService {
    store: Arc<dyn Store>,
    storage: Arc<dyn MetadataStorage>,
    minter: Arc<dyn NftMinter>,
    public_base_url: String,
    upload_retry: RetryPolicy,
}

impl RewardService {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn MetadataStorage>,
        minter: Arc<dyn NftMinter>,
        public_base_url: String,
        upload_retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            storage,
            minter,
            public_base_url,
            upload_retry,
        }
    }

    pub async fn eligibility(&self, wallet: &WalletAddress) -> Result<Eligibility, AppError> {
        let completed = self.store.count_completed_orders(wallet).await?;
        let minted = self.store.minted_tiers(wallet).await?;
        Ok(evaluate(completed, minted))
    }

    pub async fn rewards_for(&self, wallet: &WalletAddress) -> Result<Vec<NftReward>, AppError> {
        Ok(self.store.list_rewards_for_wallet(wallet).await?)
    }

    pub async fn mint(&self, wallet: &WalletAddress, tier: RewardTier) -> Result<NftReward, AppError> {
        let eligibility = self.eligibility(wallet).await?;
        if eligibility.minted_tiers.contains(&tier) {
            return Err(AppError::AlreadyClaimed(format!(
                "The {} reward has already been minted for this wallet",
                tier.display_name()
            )));
        }
        if !eligibility.eligible_tiers.contains(&tier) {
            return Err(AppError::NotEligible(format!(
                "{} requires {} completed orders, wallet has {}",
                tier.display_name(),
                tier.threshold(),
                eligibility.current_count
            )));
        }

        let claim = match self.store.claim_reward(wallet, tier).await {
            Ok(claim) => claim,
            Err(StoreError::Conflict(_)) => {
                warn!(wallet = %wallet, tier = %tier, "Rejected concurrent reward claim");
                return Err(AppError::AlreadyClaimed(format!(
                    "The {} reward is already being minted for this wallet",
                    tier.display_name()
                )));
            }
            Err(err) => return Err(err.into()),
        };

        let metadata = build_metadata(wallet, tier, Utc::now(), &self.public_base_url);

        let metadata_uri = match self
            .upload_retry
            .retry("Metadata upload", || self.storage.upload_json(&metadata))
            .await
        {
            Ok(uri) => uri,
            Err(err) => return Err(self.record_failure(&claim, None, err).await),
        };

        let request = MintRequest {
            name: metadata.name.clone(),
            symbol: metadata.symbol.clone(),
            uri: metadata_uri.clone(),
            recipient: wallet.clone(),
            seller_fee_basis_points: 0,
            is_mutable: false,
            max_supply: 1,
        };
        let minted = match self.minter.create_nft(&request).await {
            Ok(minted) => minted,
            Err(err) => {
                let err = err.context("NFT mint failed");
                return Err(self.record_failure(&claim, Some(&metadata_uri), err).await);
            }
        };

        let reward =
            record_minted(self.store.as_ref(), &claim, &minted.mint_address, &metadata_uri).await?;

        info!(
            wallet = %wallet,
            tier = %tier,
            mint = %minted.mint_address,
            "Minted reward NFT"
        );

        Ok(reward)
    }

    /// Closes the claim as `failed` and hands back the error to surface.
    async fn record_failure(
        &self,
        claim: &NftReward,
        metadata_uri: Option<&str>,
        err: anyhow::Error,
    ) -> AppError {
        let reason = format!("{err:#}");
        if let Err(mark_err) = self
            .store
            .mark_reward_failed(claim.id, metadata_uri, &reason)
            .await
        {
            error!(reward = %claim.id, error = %mark_err, "Failed to record failed mint");
        }
        warn!(
            wallet = %claim.wallet_address,
            tier = %claim.tier,
            reason = %reason,
            "Reward mint failed"
        );
        AppError::Upstream(err)
    }
}

/// Moves the claim to `minted`. On failure the token exists on chain while the
/// claim stays `pending`, which keeps the tier locked until an operator reconciles it.
async fn record_minted(
    store: &dyn Store,
    claim: &NftReward,
    mint_address: &str,
    metadata_uri: &str,
) -> Result<NftReward, AppError> {
    match store
        .mark_reward_minted(claim.id, mint_address, metadata_uri)
        .await
    {
        Ok(reward) => Ok(reward),
        Err(err) => {
            error!(
                reward = %claim.id,
                wallet = %claim.wallet_address,
                tier = %claim.tier,
                mint = %mint_address,
                metadata_uri = %metadata_uri,
                error = %err,
                "Minted NFT could not be recorded"
            );
            Err(AppError::Upstream(anyhow::Error::new(err).context(format!(
                "NFT {mint_address} was minted but reward {} was not recorded",
                claim.id
            ))))
        }
    }
}
