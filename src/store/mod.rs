//! Persistence adapter.
//!
//! Workflows talk to the database only through [`Store`]. Correctness under
//! concurrent requests comes from the constraints each implementation
//! enforces (unique live reward claims, idempotency keys, unique ledger
//! signatures, compare-and-set status updates), never from in-process locks
//! held across requests.

pub mod entities;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AuthChallenge, DashboardStats, MenuItem, NewOrder, NewTicket, NftReward, Order, OrderStatus,
    PaymentTransaction, RewardTier, Session, SupportTicket, TicketComment, TicketStatus, User,
};
use crate::wallet::WalletAddress;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness or compare-and-set guard rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The write is impossible for a reason the caller can fix (e.g. stock).
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Unexpired sign-in challenges kept per wallet; issuing another drops the oldest.
pub const MAX_LIVE_CHALLENGES: usize = 5;

/// Outcome of a compare-and-set order status update.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Users and sessions

    /// Creates the user row on first sight; returns the current row.
    async fn upsert_user(&self, wallet: &WalletAddress) -> StoreResult<User>;

    async fn get_user(&self, wallet: &WalletAddress) -> StoreResult<Option<User>>;

    /// Stores a challenge after purging expired ones and the wallet's oldest
    /// beyond [`MAX_LIVE_CHALLENGES`].
    async fn create_challenge(&self, challenge: &AuthChallenge) -> StoreResult<()>;

    /// Removes and returns the challenge so a nonce can be used once.
    async fn take_challenge(
        &self,
        wallet: &WalletAddress,
        nonce: &str,
    ) -> StoreResult<Option<AuthChallenge>>;

    /// Stores a session after purging expired ones.
    async fn create_session(&self, session: &Session) -> StoreResult<()>;

    /// Returns the session only while it has not expired at `now`.
    async fn find_session(&self, token: &str, now: DateTime<Utc>) -> StoreResult<Option<Session>>;

    // Menu

    async fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>>;

    // Orders

    /// Writes the order, the implicit user row and (optionally) the inventory
    /// decrements as one unit. A repeated idempotency key for the same wallet
    /// returns the order created the first time.
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order>;

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    async fn list_orders_for_wallet(&self, wallet: &WalletAddress) -> StoreResult<Vec<Order>>;

    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    async fn count_completed_orders(&self, wallet: &WalletAddress) -> StoreResult<i64>;

    /// Moves the order from `change.from` to `change.to`; fails with
    /// `Conflict` if the stored status is no longer `change.from`. Entering
    /// `completed` also bumps the owner's order count and spend.
    async fn update_order_status(&self, change: &StatusChange) -> StoreResult<Order>;

    // Payments

    /// One payment row per order. Re-initiating a pending payment refreshes
    /// its amount; a completed payment is returned unchanged.
    async fn upsert_pending_payment(
        &self,
        order_id: Uuid,
        wallet: &WalletAddress,
        amount: Decimal,
    ) -> StoreResult<PaymentTransaction>;

    async fn get_payment_for_order(&self, order_id: Uuid)
    -> StoreResult<Option<PaymentTransaction>>;

    /// Marks the payment and the order completed with `signature` in one
    /// unit. The order must still be in `expected`.
    async fn complete_payment(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        signature: &str,
    ) -> StoreResult<Order>;

    // Rewards

    async fn minted_tiers(&self, wallet: &WalletAddress) -> StoreResult<Vec<RewardTier>>;

    /// Inserts a `pending` claim row. Fails with `Conflict` while another
    /// pending or minted row exists for the same (wallet, tier).
    async fn claim_reward(&self, wallet: &WalletAddress, tier: RewardTier)
    -> StoreResult<NftReward>;

    async fn mark_reward_minted(
        &self,
        id: Uuid,
        mint_address: &str,
        metadata_uri: &str,
    ) -> StoreResult<NftReward>;

    async fn mark_reward_failed(
        &self,
        id: Uuid,
        metadata_uri: Option<&str>,
        reason: &str,
    ) -> StoreResult<NftReward>;

    async fn list_rewards_for_wallet(&self, wallet: &WalletAddress) -> StoreResult<Vec<NftReward>>;

    // Support

    async fn create_ticket(&self, ticket: &NewTicket) -> StoreResult<SupportTicket>;

    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<SupportTicket>>;

    async fn list_tickets_for_wallet(&self, wallet: &WalletAddress)
    -> StoreResult<Vec<SupportTicket>>;

    async fn list_tickets(&self) -> StoreResult<Vec<SupportTicket>>;

    async fn update_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        admin_response: Option<&str>,
    ) -> StoreResult<SupportTicket>;

    async fn add_comment(
        &self,
        ticket_id: Uuid,
        wallet: &WalletAddress,
        comment: &str,
        is_admin: bool,
    ) -> StoreResult<TicketComment>;

    async fn list_comments(&self, ticket_id: Uuid) -> StoreResult<Vec<TicketComment>>;

    // Admin

    async fn dashboard_stats(&self) -> StoreResult<DashboardStats>;
}
