//! Wallet sign-in by signed challenge, and session lookup.
//!
//! A caller asks for a challenge, signs its message with the wallet key and
//! trades the signature for a bearer session token. A `wallet-address`
//! header, when sent, is only a claim and must match the session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::app_error::AppError;
use crate::config::AuthConfig;
use crate::models::{AuthChallenge, Session};
use crate::store::Store;
use crate::wallet::WalletAddress;

/// The identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthWallet {
    pub address: WalletAddress,
    pub is_admin: bool,
}

impl AuthWallet {
    /// Owners and admins may see a wallet's resources.
    pub fn can_access(&self, owner: &WalletAddress) -> bool {
        self.is_admin || &self.address == owner
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRes {
    pub wallet_address: WalletAddress,
    pub nonce: String,
    /// Exact text the wallet must sign.
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRes {
    pub token: String,
    pub wallet_address: WalletAddress,
    pub is_admin: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    config: AuthConfig,
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn expires_in(ttl: Duration) -> anyhow::Result<DateTime<Utc>> {
    let ttl = TimeDelta::from_std(ttl).context("TTL out of range")?;
    Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow!("TTL out of range"))
}

pub fn challenge_message(wallet: &WalletAddress, nonce: &str, expires_at: DateTime<Utc>) -> String {
    format!(
        "Sign in to Joey's Lemonades\n\nWallet: {wallet}\nNonce: {nonce}\nExpires: {}",
        expires_at.to_rfc3339()
    )
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    fn is_configured_admin(&self, wallet: &WalletAddress) -> bool {
        self.config.admin_wallets.contains(wallet)
    }

    pub async fn issue_challenge(&self, wallet: WalletAddress) -> Result<ChallengeRes, AppError> {
        let nonce = random_token(24);
        let expires_at = expires_in(self.config.challenge_ttl)?;
        let message = challenge_message(&wallet, &nonce, expires_at);

        self.store
            .create_challenge(&AuthChallenge {
                nonce: nonce.clone(),
                wallet_address: wallet.clone(),
                message: message.clone(),
                expires_at,
            })
            .await?;

        Ok(ChallengeRes {
            wallet_address: wallet,
            nonce,
            message,
            expires_at,
        })
    }

    /// Consumes the challenge whether or not the signature checks out.
    pub async fn verify(
        &self,
        wallet: WalletAddress,
        nonce: &str,
        signature: &str,
    ) -> Result<SessionRes, AppError> {
        let challenge = self
            .store
            .take_challenge(&wallet, nonce)
            .await?
            .ok_or_else(|| AppError::unauthorized("Unknown or already used challenge"))?;

        if challenge.expires_at <= Utc::now() {
            return Err(AppError::unauthorized("Challenge expired"));
        }

        if let Err(err) = wallet.verify_signature(challenge.message.as_bytes(), signature) {
            warn!(wallet = %wallet, error = %err, "Rejected sign-in signature");
            return Err(AppError::unauthorized(err.to_string()));
        }

        let user = self.store.upsert_user(&wallet).await?;
        let session = Session {
            token: random_token(32),
            wallet_address: wallet.clone(),
            expires_at: expires_in(self.config.session_ttl)?,
        };
        self.store.create_session(&session).await?;

        info!(wallet = %wallet, "Wallet signed in");

        Ok(SessionRes {
            is_admin: user.is_admin || self.is_configured_admin(&wallet),
            token: session.token,
            wallet_address: wallet,
            expires_at: session.expires_at,
        })
    }

    /// Resolves a bearer token to the wallet behind it.
    pub async fn authenticate(
        &self,
        token: &str,
        claimed_wallet: Option<&str>,
    ) -> Result<AuthWallet, AppError> {
        let session = self
            .store
            .find_session(token, Utc::now())
            .await?
            .ok_or_else(|| AppError::unauthorized("Session expired or invalid"))?;

        if let Some(claimed) = claimed_wallet {
            let claimed: WalletAddress = claimed
                .parse()
                .map_err(|_| AppError::unauthorized("Invalid wallet address"))?;
            if claimed != session.wallet_address {
                return Err(AppError::unauthorized(
                    "Wallet address does not match the session",
                ));
            }
        }

        let flagged = self
            .store
            .get_user(&session.wallet_address)
            .await?
            .is_some_and(|user| user.is_admin);

        Ok(AuthWallet {
            is_admin: flagged || self.is_configured_admin(&session.wallet_address),
            address: session.wallet_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;
    use crate::store::MemoryStore;

    fn service(admins: Vec<WalletAddress>) -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            AuthConfig {
                challenge_ttl: Duration::from_secs(60),
                session_ttl: Duration::from_secs(3600),
                admin_wallets: admins,
            },
        )
    }

    fn signer(seed: u8) -> (SigningKey, WalletAddress) {
        let key = SigningKey::from_bytes(&[seed; 32]);
        let wallet = WalletAddress::from_bytes(key.verifying_key().to_bytes());
        (key, wallet)
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string()
    }

    #[tokio::test]
    async fn signed_challenge_yields_a_session() {
        let auth = service(Vec::new());
        let (key, wallet) = signer(11);

        let challenge = auth.issue_challenge(wallet.clone()).await.unwrap();
        assert!(challenge.message.contains(wallet.as_str()));

        let session = auth
            .verify(wallet.clone(), &challenge.nonce, &sign(&key, &challenge.message))
            .await
            .unwrap();
        assert!(!session.is_admin);

        let who = auth
            .authenticate(&session.token, Some(wallet.as_str()))
            .await
            .unwrap();
        assert_eq!(who.address, wallet);
    }

    #[tokio::test]
    async fn nonces_are_single_use() {
        let auth = service(Vec::new());
        let (key, wallet) = signer(12);

        let challenge = auth.issue_challenge(wallet.clone()).await.unwrap();
        let signature = sign(&key, &challenge.message);

        auth.verify(wallet.clone(), &challenge.nonce, &signature)
            .await
            .unwrap();
        let replay = auth.verify(wallet, &challenge.nonce, &signature).await;
        assert!(matches!(replay, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn rejects_signatures_from_other_keys() {
        let auth = service(Vec::new());
        let (_, wallet) = signer(13);
        let (intruder, _) = signer(14);

        let challenge = auth.issue_challenge(wallet.clone()).await.unwrap();
        let result = auth
            .verify(wallet, &challenge.nonce, &sign(&intruder, &challenge.message))
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn claimed_wallet_must_match_the_session() {
        let (key, wallet) = signer(15);
        let (_, other) = signer(16);
        let auth = service(vec![wallet.clone()]);

        let challenge = auth.issue_challenge(wallet.clone()).await.unwrap();
        let session = auth
            .verify(wallet, &challenge.nonce, &sign(&key, &challenge.message))
            .await
            .unwrap();
        assert!(session.is_admin);

        let spoofed = auth.authenticate(&session.token, Some(other.as_str())).await;
        assert!(matches!(spoofed, Err(AppError::Unauthorized(_))));
        assert!(matches!(
            auth.authenticate("made-up", None).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
