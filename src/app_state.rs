use std::sync::Arc;

use crate::{
    api::{Ledger, MetadataStorage, NftMinter},
    config::AppConfig,
    services::{
        admin::AdminService, auth::AuthService, orders::OrderService, payments::PaymentService,
        rewards::RewardService, support::SupportService,
    },
    store::Store,
};

/// Workflow services shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: AuthService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub rewards: RewardService,
    pub support: SupportService,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        ledger: Arc<dyn Ledger>,
        storage: Arc<dyn MetadataStorage>,
        minter: Arc<dyn NftMinter>,
        config: &AppConfig,
    ) -> Self {
        Self {
            auth: AuthService::new(store.clone(), config.auth.clone()),
            orders: OrderService::new(store.clone(), config.orders.track_inventory),
            payments: PaymentService::new(
                store.clone(),
                ledger,
                config.chain.store_wallet.clone(),
                config.payments.confirm_retry,
            ),
            rewards: RewardService::new(
                store.clone(),
                storage,
                minter,
                config.rewards.public_base_url.clone(),
                config.rewards.upload_retry,
            ),
            support: SupportService::new(store.clone()),
            admin: AdminService::new(store.clone()),
            store,
        }
    }
}
