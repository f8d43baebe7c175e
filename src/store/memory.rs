//! In-process [`Store`] used by tests and local runs without Postgres.
//!
//! All tables sit behind one lock so every method is a single atomic unit,
//! and each write checks the same constraints the SQL schema declares.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MAX_LIVE_CHALLENGES, StatusChange, Store, StoreError, StoreResult};
use crate::models::{
    AuthChallenge, DashboardStats, MenuItem, NewOrder, NewTicket, NftReward, Order, OrderStatus,
    PaymentStatus, PaymentTransaction, RewardStatus, RewardTier, Session, SupportTicket,
    TicketComment, TicketStatus, User,
};
use crate::wallet::WalletAddress;

#[derive(Default)]
struct Tables {
    users: HashMap<WalletAddress, User>,
    challenges: HashMap<String, AuthChallenge>,
    sessions: HashMap<String, Session>,
    menu: Vec<MenuItem>,
    orders: Vec<Order>,
    payments: Vec<PaymentTransaction>,
    rewards: Vec<NftReward>,
    tickets: Vec<SupportTicket>,
    comments: Vec<TicketComment>,
}

impl Tables {
    fn user_entry(&mut self, wallet: &WalletAddress) -> &mut User {
        self.users.entry(wallet.clone()).or_insert_with(|| {
            let now = Utc::now();
            User {
                wallet_address: wallet.clone(),
                total_orders: 0,
                total_spent: Decimal::ZERO,
                is_admin: false,
                created_at: now,
                updated_at: now,
            }
        })
    }

    fn order_mut(&mut self, id: Uuid) -> StoreResult<&mut Order> {
        self.orders
            .iter_mut()
            .find(|order| order.id == id)
            .ok_or(StoreError::NotFound("Order"))
    }

    fn reward_mut(&mut self, id: Uuid) -> StoreResult<&mut NftReward> {
        self.rewards
            .iter_mut()
            .find(|reward| reward.id == id)
            .ok_or(StoreError::NotFound("NFT reward"))
    }

    fn signature_taken(&self, order_id: Uuid, signature: &str) -> bool {
        let by_order = self.orders.iter().any(|order| {
            order.id != order_id && order.transaction_signature.as_deref() == Some(signature)
        });
        let by_payment = self.payments.iter().any(|payment| {
            payment.order_id != order_id && payment.signature.as_deref() == Some(signature)
        });
        by_order || by_payment
    }

    fn record_completion(&mut self, wallet: &WalletAddress, total: Decimal) {
        let user = self.user_entry(wallet);
        user.total_orders += 1;
        user.total_spent += total;
        user.updated_at = Utc::now();
    }
}

/// Newest first; ties keep reverse insertion order.
fn newest_first<T>(
    rows: impl DoubleEndedIterator<Item = T>,
    key: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
    rows
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the menu table.
    pub fn with_menu(menu: Vec<MenuItem>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                menu,
                ..Tables::default()
            }),
        }
    }

    /// Sets the admin flag directly, the way an operator would in SQL.
    pub async fn set_admin(&self, wallet: &WalletAddress, is_admin: bool) {
        let mut tables = self.tables.write().await;
        tables.user_entry(wallet).is_admin = is_admin;
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_user(&self, wallet: &WalletAddress) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        Ok(tables.user_entry(wallet).clone())
    }

    async fn get_user(&self, wallet: &WalletAddress) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(wallet).cloned())
    }

    async fn create_challenge(&self, challenge: &AuthChallenge) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.challenges.contains_key(&challenge.nonce) {
            return Err(StoreError::Conflict("nonce already issued".into()));
        }

        let now = Utc::now();
        tables.challenges.retain(|_, issued| issued.expires_at > now);

        let mut live: Vec<(DateTime<Utc>, String)> = tables
            .challenges
            .values()
            .filter(|issued| issued.wallet_address == challenge.wallet_address)
            .map(|issued| (issued.expires_at, issued.nonce.clone()))
            .collect();
        live.sort();
        let excess = (live.len() + 1).saturating_sub(MAX_LIVE_CHALLENGES);
        for (_, nonce) in live.into_iter().take(excess) {
            tables.challenges.remove(&nonce);
        }

        tables
            .challenges
            .insert(challenge.nonce.clone(), challenge.clone());
        Ok(())
    }

    async fn take_challenge(
        &self,
        wallet: &WalletAddress,
        nonce: &str,
    ) -> StoreResult<Option<AuthChallenge>> {
        let mut tables = self.tables.write().await;
        let matches = tables
            .challenges
            .get(nonce)
            .is_some_and(|challenge| &challenge.wallet_address == wallet);
        Ok(if matches {
            tables.challenges.remove(nonce)
        } else {
            None
        })
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        tables.sessions.retain(|_, open| open.expires_at > now);
        tables.user_entry(&session.wallet_address);
        tables
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str, now: DateTime<Utc>) -> StoreResult<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(token)
            .filter(|session| session.expires_at > now)
            .cloned())
    }

    async fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .menu
            .iter()
            .filter(|item| item.is_available)
            .cloned()
            .collect())
    }

    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;

        if let Some(key) = order.idempotency_key.as_deref() {
            let existing = tables.orders.iter().find(|existing| {
                existing.wallet_address == order.wallet_address
                    && existing.idempotency_key.as_deref() == Some(key)
            });
            if let Some(existing) = existing {
                return Ok(existing.clone());
            }
        }

        if order.decrement_inventory {
            // check every line before touching stock so a rejection writes nothing
            let mut remaining: HashMap<usize, i32> = HashMap::new();
            for item in &order.items {
                let index = tables
                    .menu
                    .iter()
                    .position(|menu| menu.name == item.name && menu.size == item.size)
                    .ok_or_else(|| {
                        StoreError::Rejected(format!("Unknown menu item {} ({})", item.name, item.size))
                    })?;
                let stock = remaining
                    .entry(index)
                    .or_insert(tables.menu[index].stock);
                if !tables.menu[index].is_available || *stock < item.quantity {
                    return Err(StoreError::Rejected(format!(
                        "Insufficient stock for {} ({})",
                        item.name, item.size
                    )));
                }
                *stock -= item.quantity;
            }
            for (index, stock) in remaining {
                tables.menu[index].stock = stock;
            }
        }

        tables.user_entry(&order.wallet_address);

        let now = Utc::now();
        let created = Order {
            id: Uuid::new_v4(),
            wallet_address: order.wallet_address.clone(),
            items: order.items.clone(),
            total: order.total,
            status: OrderStatus::Pending,
            transaction_signature: None,
            idempotency_key: order.idempotency_key.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.orders.push(created.clone());
        Ok(created)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|order| order.id == id).cloned())
    }

    async fn list_orders_for_wallet(&self, wallet: &WalletAddress) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .orders
                .iter()
                .filter(|order| &order.wallet_address == wallet)
                .cloned(),
            |order| order.created_at,
        ))
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.orders.iter().cloned(), |order| {
            order.created_at
        }))
    }

    async fn count_completed_orders(&self, wallet: &WalletAddress) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .orders
            .iter()
            .filter(|order| {
                &order.wallet_address == wallet && order.status == OrderStatus::Completed
            })
            .count();
        Ok(count as i64)
    }

    async fn update_order_status(&self, change: &StatusChange) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        let order = tables.order_mut(change.order_id)?;
        if order.status != change.from {
            return Err(StoreError::Conflict(format!(
                "order status changed to {} concurrently",
                order.status
            )));
        }
        order.status = change.to;
        order.updated_at = Utc::now();
        let updated = order.clone();

        if change.to == OrderStatus::Completed {
            tables.record_completion(&updated.wallet_address, updated.total);
        }
        Ok(updated)
    }

    async fn upsert_pending_payment(
        &self,
        order_id: Uuid,
        wallet: &WalletAddress,
        amount: Decimal,
    ) -> StoreResult<PaymentTransaction> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(payment) = tables
            .payments
            .iter_mut()
            .find(|payment| payment.order_id == order_id)
        {
            if payment.status == PaymentStatus::Pending {
                payment.amount = amount;
                payment.updated_at = now;
            }
            return Ok(payment.clone());
        }

        let payment = PaymentTransaction {
            id: Uuid::new_v4(),
            order_id,
            wallet_address: wallet.clone(),
            amount,
            signature: None,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.payments.push(payment.clone());
        Ok(payment)
    }

    async fn get_payment_for_order(
        &self,
        order_id: Uuid,
    ) -> StoreResult<Option<PaymentTransaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .iter()
            .find(|payment| payment.order_id == order_id)
            .cloned())
    }

    async fn complete_payment(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        signature: &str,
    ) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;

        if tables.signature_taken(order_id, signature) {
            return Err(StoreError::Conflict(
                "signature already settles another order".into(),
            ));
        }

        let order = tables.order_mut(order_id)?;
        if order.status != expected {
            return Err(StoreError::Conflict(format!(
                "order status changed to {} concurrently",
                order.status
            )));
        }
        let now = Utc::now();
        order.status = OrderStatus::Completed;
        order.transaction_signature = Some(signature.to_string());
        order.updated_at = now;
        let completed = order.clone();

        match tables
            .payments
            .iter_mut()
            .find(|payment| payment.order_id == order_id)
        {
            Some(payment) => {
                payment.status = PaymentStatus::Completed;
                payment.signature = Some(signature.to_string());
                payment.updated_at = now;
            }
            None => tables.payments.push(PaymentTransaction {
                id: Uuid::new_v4(),
                order_id,
                wallet_address: completed.wallet_address.clone(),
                amount: completed.total,
                signature: Some(signature.to_string()),
                status: PaymentStatus::Completed,
                created_at: now,
                updated_at: now,
            }),
        }

        tables.record_completion(&completed.wallet_address, completed.total);
        Ok(completed)
    }

    async fn minted_tiers(&self, wallet: &WalletAddress) -> StoreResult<Vec<RewardTier>> {
        let tables = self.tables.read().await;
        let mut tiers: Vec<RewardTier> = tables
            .rewards
            .iter()
            .filter(|reward| {
                &reward.wallet_address == wallet && reward.status == RewardStatus::Minted
            })
            .map(|reward| reward.tier)
            .collect();
        tiers.sort();
        tiers.dedup();
        Ok(tiers)
    }

    async fn claim_reward(
        &self,
        wallet: &WalletAddress,
        tier: RewardTier,
    ) -> StoreResult<NftReward> {
        let mut tables = self.tables.write().await;

        let live = tables.rewards.iter().any(|reward| {
            &reward.wallet_address == wallet
                && reward.tier == tier
                && matches!(reward.status, RewardStatus::Pending | RewardStatus::Minted)
        });
        if live {
            return Err(StoreError::Conflict(format!(
                "{tier} reward already claimed for {wallet}"
            )));
        }

        let now = Utc::now();
        let reward = NftReward {
            id: Uuid::new_v4(),
            wallet_address: wallet.clone(),
            tier,
            mint_address: None,
            metadata_uri: None,
            status: RewardStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        tables.rewards.push(reward.clone());
        Ok(reward)
    }

    async fn mark_reward_minted(
        &self,
        id: Uuid,
        mint_address: &str,
        metadata_uri: &str,
    ) -> StoreResult<NftReward> {
        let mut tables = self.tables.write().await;
        let reward = tables.reward_mut(id)?;
        if reward.status != RewardStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "reward claim is already {}",
                reward.status
            )));
        }
        reward.status = RewardStatus::Minted;
        reward.mint_address = Some(mint_address.to_string());
        reward.metadata_uri = Some(metadata_uri.to_string());
        reward.updated_at = Utc::now();
        Ok(reward.clone())
    }

    async fn mark_reward_failed(
        &self,
        id: Uuid,
        metadata_uri: Option<&str>,
        reason: &str,
    ) -> StoreResult<NftReward> {
        let mut tables = self.tables.write().await;
        let reward = tables.reward_mut(id)?;
        if reward.status != RewardStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "reward claim is already {}",
                reward.status
            )));
        }
        reward.status = RewardStatus::Failed;
        reward.metadata_uri = metadata_uri.map(str::to_string);
        reward.failure_reason = Some(reason.to_string());
        reward.updated_at = Utc::now();
        Ok(reward.clone())
    }

    async fn list_rewards_for_wallet(&self, wallet: &WalletAddress) -> StoreResult<Vec<NftReward>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .rewards
                .iter()
                .filter(|reward| &reward.wallet_address == wallet)
                .cloned(),
            |reward| reward.created_at,
        ))
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> StoreResult<SupportTicket> {
        let mut tables = self.tables.write().await;
        if let Some(order_id) = ticket.order_id {
            if !tables.orders.iter().any(|order| order.id == order_id) {
                return Err(StoreError::NotFound("Order"));
            }
        }

        let now = Utc::now();
        let created = SupportTicket {
            id: Uuid::new_v4(),
            wallet_address: ticket.wallet_address.clone(),
            order_id: ticket.order_id,
            subject: ticket.subject.clone(),
            description: ticket.description.clone(),
            status: TicketStatus::Open,
            priority: ticket.priority,
            admin_response: None,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.push(created.clone());
        Ok(created)
    }

    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<SupportTicket>> {
        let tables = self.tables.read().await;
        Ok(tables.tickets.iter().find(|ticket| ticket.id == id).cloned())
    }

    async fn list_tickets_for_wallet(
        &self,
        wallet: &WalletAddress,
    ) -> StoreResult<Vec<SupportTicket>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .tickets
                .iter()
                .filter(|ticket| &ticket.wallet_address == wallet)
                .cloned(),
            |ticket| ticket.created_at,
        ))
    }

    async fn list_tickets(&self) -> StoreResult<Vec<SupportTicket>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.tickets.iter().cloned(), |ticket| {
            ticket.created_at
        }))
    }

    async fn update_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        admin_response: Option<&str>,
    ) -> StoreResult<SupportTicket> {
        let mut tables = self.tables.write().await;
        let ticket = tables
            .tickets
            .iter_mut()
            .find(|ticket| ticket.id == id)
            .ok_or(StoreError::NotFound("Ticket"))?;

        ticket.status = status;
        if let Some(response) = admin_response {
            ticket.admin_response = Some(response.to_string());
        }
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn add_comment(
        &self,
        ticket_id: Uuid,
        wallet: &WalletAddress,
        comment: &str,
        is_admin: bool,
    ) -> StoreResult<TicketComment> {
        let mut tables = self.tables.write().await;
        if !tables.tickets.iter().any(|ticket| ticket.id == ticket_id) {
            return Err(StoreError::NotFound("Ticket"));
        }

        let created = TicketComment {
            id: Uuid::new_v4(),
            ticket_id,
            wallet_address: wallet.clone(),
            comment: comment.to_string(),
            is_admin,
            created_at: Utc::now(),
        };
        tables.comments.push(created.clone());
        Ok(created)
    }

    async fn list_comments(&self, ticket_id: Uuid) -> StoreResult<Vec<TicketComment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|comment| comment.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let tables = self.tables.read().await;
        let completed: Vec<&Order> = tables
            .orders
            .iter()
            .filter(|order| order.status == OrderStatus::Completed)
            .collect();

        let mut customers: Vec<&WalletAddress> =
            completed.iter().map(|order| &order.wallet_address).collect();
        customers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        customers.dedup();

        Ok(DashboardStats {
            total_orders: completed.len() as i64,
            total_revenue: completed.iter().map(|order| order.total).sum(),
            active_customers: customers.len() as i64,
            nfts_minted: tables
                .rewards
                .iter()
                .filter(|reward| reward.status == RewardStatus::Minted)
                .count() as i64,
        })
    }
}
