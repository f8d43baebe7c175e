#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use ed25519_dalek::{Signer, SigningKey};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use lemonade_storefront::{
    api::{Ledger, MetadataStorage, MintRequest, MintedNft, NftMetadata, NftMinter, SignatureStatus},
    app_state::AppState,
    config::AppConfig,
    models::{
        Customizations, MenuItem, NewOrder, OrderItem, OrderStatus, Size,
    },
    store::{MemoryStore, StatusChange, Store},
    wallet::WalletAddress,
};

pub const STORE_WALLET: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";

#[derive(Default)]
pub struct FakeLedger {
    statuses: Mutex<HashMap<String, SignatureStatus>>,
    pub status_calls: AtomicU32,
}

impl FakeLedger {
    pub fn set_status(&self, signature: &str, status: SignatureStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(signature.to_string(), status);
    }

    pub fn blockhash() -> String {
        WalletAddress::from_bytes([9; 32]).to_string()
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn latest_blockhash(&self) -> Result<String> {
        Ok(Self::blockhash())
    }

    async fn signature_status(&self, signature: &str) -> Result<SignatureStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(signature)
            .cloned()
            .unwrap_or(SignatureStatus::Pending))
    }

    async fn balance(&self, _wallet: &WalletAddress) -> Result<u64> {
        Ok(2_500_000_000)
    }
}

#[derive(Default)]
pub struct FakeStorage {
    /// Number of uploads that fail before one succeeds.
    pub failures_left: AtomicU32,
    pub uploads: AtomicU32,
    pub documents: Mutex<Vec<NftMetadata>>,
}

#[async_trait]
impl MetadataStorage for FakeStorage {
    async fn upload_json(&self, metadata: &NftMetadata) -> Result<String> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("storage node unavailable"));
        }
        self.documents.lock().unwrap().push(metadata.clone());
        Ok(format!("https://storage.test/metadata/{n}"))
    }
}

#[derive(Default)]
pub struct FakeMinter {
    pub calls: AtomicU32,
    pub fail: AtomicBool,
}

#[async_trait]
impl NftMinter for FakeMinter {
    async fn create_nft(&self, request: &MintRequest) -> Result<MintedNft> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        // Keeps concurrent mints overlapping.
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("minter rejected {}", request.name));
        }
        Ok(MintedNft {
            mint_address: WalletAddress::from_bytes([100 + n as u8; 32]).to_string(),
        })
    }
}

pub struct Wallet {
    pub key: SigningKey,
    pub address: WalletAddress,
}

impl Wallet {
    pub fn from_seed(seed: u8) -> Self {
        let key = SigningKey::from_bytes(&[seed; 32]);
        let address = WalletAddress::from_bytes(key.verifying_key().to_bytes());
        Self { key, address }
    }

    pub fn sign(&self, message: &str) -> String {
        bs58::encode(self.key.sign(message.as_bytes()).to_bytes()).into_string()
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<FakeLedger>,
    pub storage: Arc<FakeStorage>,
    pub minter: Arc<FakeMinter>,
}

pub fn test_config(track_inventory: bool) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://unused".to_string()),
        ("SOLANA_RPC_URL", "http://ledger.test".to_string()),
        ("STORE_WALLET", STORE_WALLET.to_string()),
        ("METADATA_STORAGE_URL", "http://storage.test".to_string()),
        ("MINTER_URL", "http://minter.test".to_string()),
        ("PUBLIC_BASE_URL", "https://joeys.test".to_string()),
        ("CONFIRM_MAX_ATTEMPTS", "3".to_string()),
        ("CONFIRM_INITIAL_DELAY_MS", "1".to_string()),
        ("CONFIRM_MAX_DELAY_MS", "2".to_string()),
        ("UPLOAD_MAX_ATTEMPTS", "3".to_string()),
        ("UPLOAD_INITIAL_DELAY_MS", "1".to_string()),
        ("UPLOAD_MAX_DELAY_MS", "2".to_string()),
        ("TRACK_INVENTORY", track_inventory.to_string()),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub fn menu_item(name: &str, size: Size, price: &str, stock: i32) -> MenuItem {
    MenuItem {
        id: uuid::Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        size,
        price: price.parse().unwrap(),
        stock,
        is_available: true,
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(MemoryStore::new(), false)
    }

    pub fn with_inventory(menu: Vec<MenuItem>) -> Self {
        Self::build(MemoryStore::with_menu(menu), true)
    }

    fn build(store: MemoryStore, track_inventory: bool) -> Self {
        let store = Arc::new(store);
        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage::default());
        let minter = Arc::new(FakeMinter::default());

        let state = AppState::new(
            store.clone(),
            ledger.clone(),
            storage.clone(),
            minter.clone(),
            &test_config(track_inventory),
        );

        Self {
            router: lemonade_storefront::app(state),
            store,
            ledger,
            storage,
            minter,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request_with(method, uri, token, &[], body).await
    }

    pub async fn request_with(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// Signs in through the challenge routes and returns the session token.
    pub async fn sign_in(&self, wallet: &Wallet) -> String {
        let (status, challenge) = self
            .request(
                Method::POST,
                "/api/auth/challenge",
                None,
                Some(json!({ "walletAddress": wallet.address.as_str() })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{challenge}");

        let message = challenge["data"]["message"].as_str().unwrap();
        let (status, session) = self
            .request(
                Method::POST,
                "/api/auth/verify",
                None,
                Some(json!({
                    "walletAddress": wallet.address.as_str(),
                    "nonce": challenge["data"]["nonce"],
                    "signature": wallet.sign(message),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{session}");

        session["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn sign_in_admin(&self, wallet: &Wallet) -> String {
        let token = self.sign_in(wallet).await;
        self.store.set_admin(&wallet.address, true).await;
        token
    }

    /// Writes `count` completed orders for `wallet` straight into the store.
    pub async fn seed_completed_orders(&self, wallet: &WalletAddress, count: usize) {
        for _ in 0..count {
            let order = self
                .store
                .create_order(&NewOrder {
                    wallet_address: wallet.clone(),
                    items: vec![OrderItem {
                        name: "Classic Lemonade".to_string(),
                        size: Size::Small,
                        quantity: 1,
                        price: Decimal::new(399, 2),
                        customizations: Customizations::default(),
                    }],
                    total: Decimal::new(399, 2),
                    idempotency_key: None,
                    decrement_inventory: false,
                })
                .await
                .unwrap();
            self.store
                .update_order_status(&StatusChange {
                    order_id: order.id,
                    from: OrderStatus::Pending,
                    to: OrderStatus::Completed,
                })
                .await
                .unwrap();
        }
    }
}

pub fn order_body() -> Value {
    json!({
        "items": [
            { "name": "Classic Lemonade", "size": "large", "quantity": 2, "price": 4.99,
              "customizations": { "sweetness": "normal", "ice": "light_ice" } },
            { "name": "Strawberry Lemonade", "size": "small", "quantity": 1, "price": 5.99 }
        ],
        "total": 0.01
    })
}
