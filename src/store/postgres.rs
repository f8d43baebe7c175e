use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::entities::{
    AuthChallengeEntity, CreateAuthChallengeEntity, CreateNftRewardEntity, CreateOrderEntity,
    CreatePaymentEntity, CreateSessionEntity, CreateSupportTicketEntity,
    CreateTicketCommentEntity, CreateUserEntity, MenuItemEntity, NftRewardEntity, OrderEntity,
    PaymentEntity, SessionEntity, SupportTicketEntity, TicketCommentEntity, UserEntity,
    convert_all,
};
use super::{MAX_LIVE_CHALLENGES, StatusChange, Store, StoreError, StoreResult};
use crate::db::DbPool;
use crate::models::{
    AuthChallenge, DashboardStats, MenuItem, NewOrder, NewTicket, NftReward, Order, OrderStatus,
    PaymentStatus, PaymentTransaction, RewardStatus, RewardTier, Session, SupportTicket,
    TicketComment, TicketStatus, User,
};
use crate::schema::{
    auth_challenges, menu_items, nft_rewards, orders, payment_transactions, sessions,
    support_tickets, ticket_comments, users,
};
use crate::wallet::WalletAddress;

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound("Record"),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(format!(
                    "{} already exists",
                    info.table_name().unwrap_or("record")
                ))
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                StoreError::Rejected("Referenced record does not exist".into())
            }
            other => StoreError::Other(anyhow::Error::new(other)),
        }
    }
}

/// [`Store`] backed by Postgres through diesel-async.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> anyhow::Result<PooledConnection<'_, AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")
    }
}

async fn ensure_user(conn: &mut AsyncPgConnection, wallet: &str) -> Result<(), DieselError> {
    diesel::insert_into(users::table)
        .values(CreateUserEntity {
            wallet_address: wallet,
        })
        .on_conflict(users::wallet_address)
        .do_nothing()
        .execute(conn)
        .await?;
    Ok(())
}

async fn record_completion(
    conn: &mut AsyncPgConnection,
    wallet: &str,
    total: Decimal,
) -> Result<(), DieselError> {
    diesel::update(users::table.find(wallet))
        .set((
            users::total_orders.eq(users::total_orders + 1),
            users::total_spent.eq(users::total_spent + total),
            users::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

/// Explains why a compare-and-set on an order matched no row.
async fn stale_order(conn: &mut AsyncPgConnection, id: Uuid) -> StoreError {
    let current: Result<Option<String>, DieselError> = orders::table
        .find(id)
        .select(orders::status)
        .get_result(conn)
        .await
        .optional();

    match current {
        Ok(Some(status)) => {
            StoreError::Conflict(format!("order status changed to {status} concurrently"))
        }
        Ok(None) => StoreError::NotFound("Order"),
        Err(err) => err.into(),
    }
}

async fn stale_reward(conn: &mut AsyncPgConnection, id: Uuid) -> StoreError {
    let current: Result<Option<String>, DieselError> = nft_rewards::table
        .find(id)
        .select(nft_rewards::status)
        .get_result(conn)
        .await
        .optional();

    match current {
        Ok(Some(status)) => StoreError::Conflict(format!("reward claim is already {status}")),
        Ok(None) => StoreError::NotFound("NFT reward"),
        Err(err) => err.into(),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_user(&self, wallet: &WalletAddress) -> StoreResult<User> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        ensure_user(conn, wallet.as_str()).await?;
        let user: UserEntity = users::table
            .find(wallet.as_str())
            .select(UserEntity::as_select())
            .get_result(conn)
            .await
            .context("Failed to get user")?;

        Ok(user.try_into()?)
    }

    async fn get_user(&self, wallet: &WalletAddress) -> StoreResult<Option<User>> {
        let conn = &mut self.conn().await?;

        let user: Option<UserEntity> = users::table
            .find(wallet.as_str())
            .select(UserEntity::as_select())
            .get_result(conn)
            .await
            .optional()
            .context("Failed to get user")?;

        Ok(user.map(User::try_from).transpose()?)
    }

    async fn create_challenge(&self, challenge: &AuthChallenge) -> StoreResult<()> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let challenge = challenge.clone();
        conn.transaction(move |conn| {
            Box::pin(async move {
                let wallet = challenge.wallet_address.as_str();

                diesel::delete(
                    auth_challenges::table.filter(auth_challenges::expires_at.le(Utc::now())),
                )
                .execute(conn)
                .await?;

                let stale: Vec<String> = auth_challenges::table
                    .filter(auth_challenges::wallet_address.eq(wallet))
                    .order_by(auth_challenges::expires_at.desc())
                    .offset((MAX_LIVE_CHALLENGES - 1) as i64)
                    .select(auth_challenges::nonce)
                    .get_results(conn)
                    .await?;
                if !stale.is_empty() {
                    diesel::delete(
                        auth_challenges::table.filter(auth_challenges::nonce.eq_any(stale)),
                    )
                    .execute(conn)
                    .await?;
                }

                diesel::insert_into(auth_challenges::table)
                    .values(CreateAuthChallengeEntity {
                        nonce: &challenge.nonce,
                        wallet_address: wallet,
                        message: &challenge.message,
                        expires_at: challenge.expires_at,
                    })
                    .execute(conn)
                    .await?;
                Ok::<(), StoreError>(())
            })
        })
        .await
    }

    async fn take_challenge(
        &self,
        wallet: &WalletAddress,
        nonce: &str,
    ) -> StoreResult<Option<AuthChallenge>> {
        let conn = &mut self.conn().await?;

        let challenge: Option<AuthChallengeEntity> = diesel::delete(
            auth_challenges::table
                .find(nonce)
                .filter(auth_challenges::wallet_address.eq(wallet.as_str())),
        )
        .returning(AuthChallengeEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to consume auth challenge")?;

        Ok(challenge.map(AuthChallenge::try_from).transpose()?)
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let session = session.clone();
        conn.transaction(move |conn| {
            Box::pin(async move {
                diesel::delete(sessions::table.filter(sessions::expires_at.le(Utc::now())))
                    .execute(conn)
                    .await?;
                ensure_user(conn, session.wallet_address.as_str()).await?;
                diesel::insert_into(sessions::table)
                    .values(CreateSessionEntity {
                        token: &session.token,
                        wallet_address: session.wallet_address.as_str(),
                        expires_at: session.expires_at,
                    })
                    .execute(conn)
                    .await?;
                Ok::<(), StoreError>(())
            })
        })
        .await
    }

    async fn find_session(&self, token: &str, now: DateTime<Utc>) -> StoreResult<Option<Session>> {
        let conn = &mut self.conn().await?;

        let session: Option<SessionEntity> = sessions::table
            .find(token)
            .filter(sessions::expires_at.gt(now))
            .select(SessionEntity::as_select())
            .get_result(conn)
            .await
            .optional()
            .context("Failed to get session")?;

        Ok(session.map(Session::try_from).transpose()?)
    }

    async fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        let conn = &mut self.conn().await?;

        let items: Vec<MenuItemEntity> = menu_items::table
            .filter(menu_items::is_available.eq(true))
            .order_by((menu_items::name.asc(), menu_items::size.asc()))
            .select(MenuItemEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get menu items")?;

        Ok(convert_all(items)?)
    }

    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let items = serde_json::to_value(&order.items).context("Failed to encode order items")?;
        let new = order.clone();

        let created = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    let wallet = new.wallet_address.as_str();

                    if let Some(key) = new.idempotency_key.as_deref() {
                        let existing: Option<OrderEntity> = orders::table
                            .filter(orders::wallet_address.eq(wallet))
                            .filter(orders::idempotency_key.eq(key))
                            .select(OrderEntity::as_select())
                            .first(conn)
                            .await
                            .optional()?;
                        if let Some(existing) = existing {
                            return Ok(existing);
                        }
                    }

                    ensure_user(conn, wallet).await?;

                    if new.decrement_inventory {
                        for item in &new.items {
                            let updated = diesel::update(menu_items::table)
                                .filter(menu_items::name.eq(&item.name))
                                .filter(menu_items::size.eq(item.size.as_str()))
                                .filter(menu_items::is_available.eq(true))
                                .filter(menu_items::stock.ge(item.quantity))
                                .set((
                                    menu_items::stock.eq(menu_items::stock - item.quantity),
                                    menu_items::updated_at.eq(diesel::dsl::now),
                                ))
                                .execute(conn)
                                .await?;

                            if updated == 0 {
                                // rolls back every decrement made so far
                                return Err(StoreError::Rejected(format!(
                                    "Insufficient stock for {} ({})",
                                    item.name, item.size
                                )));
                            }
                        }
                    }

                    let created = diesel::insert_into(orders::table)
                        .values(CreateOrderEntity {
                            wallet_address: wallet,
                            items,
                            total: new.total,
                            status: OrderStatus::Pending.as_str(),
                            idempotency_key: new.idempotency_key.as_deref(),
                        })
                        .returning(OrderEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    Ok::<OrderEntity, StoreError>(created)
                })
            })
            .await;

        let created = match (created, order.idempotency_key.as_deref()) {
            // a concurrent request with the same key won the insert
            (Err(StoreError::Conflict(_)), Some(key)) => orders::table
                .filter(orders::wallet_address.eq(order.wallet_address.as_str()))
                .filter(orders::idempotency_key.eq(key))
                .select(OrderEntity::as_select())
                .first(conn)
                .await
                .context("Failed to get order by idempotency key")?,
            (created, _) => created?,
        };

        Ok(created.try_into()?)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let conn = &mut self.conn().await?;

        let order: Option<OrderEntity> = orders::table
            .find(id)
            .select(OrderEntity::as_select())
            .get_result(conn)
            .await
            .optional()
            .context("Failed to get order")?;

        Ok(order.map(Order::try_from).transpose()?)
    }

    async fn list_orders_for_wallet(&self, wallet: &WalletAddress) -> StoreResult<Vec<Order>> {
        let conn = &mut self.conn().await?;

        let orders: Vec<OrderEntity> = orders::table
            .filter(orders::wallet_address.eq(wallet.as_str()))
            .order_by(orders::created_at.desc())
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get orders for wallet")?;

        Ok(convert_all(orders)?)
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let conn = &mut self.conn().await?;

        let orders: Vec<OrderEntity> = orders::table
            .order_by(orders::created_at.desc())
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get orders")?;

        Ok(convert_all(orders)?)
    }

    async fn count_completed_orders(&self, wallet: &WalletAddress) -> StoreResult<i64> {
        let conn = &mut self.conn().await?;

        let count: i64 = orders::table
            .filter(orders::wallet_address.eq(wallet.as_str()))
            .filter(orders::status.eq(OrderStatus::Completed.as_str()))
            .count()
            .get_result(conn)
            .await
            .context("Failed to count completed orders")?;

        Ok(count)
    }

    async fn update_order_status(&self, change: &StatusChange) -> StoreResult<Order> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let change = change.clone();
        let updated = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    let updated: Option<OrderEntity> =
                        diesel::update(orders::table.find(change.order_id))
                            .filter(orders::status.eq(change.from.as_str()))
                            .set((
                                orders::status.eq(change.to.as_str()),
                                orders::updated_at.eq(diesel::dsl::now),
                            ))
                            .returning(OrderEntity::as_returning())
                            .get_result(conn)
                            .await
                            .optional()?;

                    let Some(updated) = updated else {
                        return Err(stale_order(conn, change.order_id).await);
                    };

                    if change.to == OrderStatus::Completed {
                        record_completion(conn, &updated.wallet_address, updated.total).await?;
                    }

                    Ok::<OrderEntity, StoreError>(updated)
                })
            })
            .await?;

        Ok(updated.try_into()?)
    }

    async fn upsert_pending_payment(
        &self,
        order_id: Uuid,
        wallet: &WalletAddress,
        amount: Decimal,
    ) -> StoreResult<PaymentTransaction> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let wallet = wallet.clone();
        let payment = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    let existing: Option<PaymentEntity> = payment_transactions::table
                        .filter(payment_transactions::order_id.eq(order_id))
                        .select(PaymentEntity::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;

                    let payment = match existing {
                        Some(existing) if existing.status == PaymentStatus::Pending.as_str() => {
                            diesel::update(payment_transactions::table.find(existing.id))
                                .set((
                                    payment_transactions::amount.eq(amount),
                                    payment_transactions::updated_at.eq(diesel::dsl::now),
                                ))
                                .returning(PaymentEntity::as_returning())
                                .get_result(conn)
                                .await?
                        }
                        Some(settled) => settled,
                        None => {
                            diesel::insert_into(payment_transactions::table)
                                .values(CreatePaymentEntity {
                                    order_id,
                                    wallet_address: wallet.as_str(),
                                    amount,
                                    signature: None,
                                    status: PaymentStatus::Pending.as_str(),
                                })
                                .returning(PaymentEntity::as_returning())
                                .get_result(conn)
                                .await?
                        }
                    };

                    Ok::<PaymentEntity, StoreError>(payment)
                })
            })
            .await?;

        Ok(payment.try_into()?)
    }

    async fn get_payment_for_order(
        &self,
        order_id: Uuid,
    ) -> StoreResult<Option<PaymentTransaction>> {
        let conn = &mut self.conn().await?;

        let payment: Option<PaymentEntity> = payment_transactions::table
            .filter(payment_transactions::order_id.eq(order_id))
            .select(PaymentEntity::as_select())
            .first(conn)
            .await
            .optional()
            .context("Failed to get payment")?;

        Ok(payment.map(PaymentTransaction::try_from).transpose()?)
    }

    async fn complete_payment(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        signature: &str,
    ) -> StoreResult<Order> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let signature = signature.to_string();
        let completed = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    let completed: Option<OrderEntity> =
                        diesel::update(orders::table.find(order_id))
                            .filter(orders::status.eq(expected.as_str()))
                            .set((
                                orders::status.eq(OrderStatus::Completed.as_str()),
                                orders::transaction_signature.eq(&signature),
                                orders::updated_at.eq(diesel::dsl::now),
                            ))
                            .returning(OrderEntity::as_returning())
                            .get_result(conn)
                            .await
                            .optional()?;

                    let Some(completed) = completed else {
                        return Err(stale_order(conn, order_id).await);
                    };

                    diesel::insert_into(payment_transactions::table)
                        .values(CreatePaymentEntity {
                            order_id,
                            wallet_address: &completed.wallet_address,
                            amount: completed.total,
                            signature: Some(&signature),
                            status: PaymentStatus::Completed.as_str(),
                        })
                        .on_conflict(payment_transactions::order_id)
                        .do_update()
                        .set((
                            payment_transactions::status.eq(PaymentStatus::Completed.as_str()),
                            payment_transactions::signature.eq(&signature),
                            payment_transactions::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await?;

                    record_completion(conn, &completed.wallet_address, completed.total).await?;

                    Ok::<OrderEntity, StoreError>(completed)
                })
            })
            .await?;

        Ok(completed.try_into()?)
    }

    async fn minted_tiers(&self, wallet: &WalletAddress) -> StoreResult<Vec<RewardTier>> {
        let conn = &mut self.conn().await?;

        let tiers: Vec<String> = nft_rewards::table
            .filter(nft_rewards::wallet_address.eq(wallet.as_str()))
            .filter(nft_rewards::status.eq(RewardStatus::Minted.as_str()))
            .select(nft_rewards::tier)
            .distinct()
            .get_results(conn)
            .await
            .context("Failed to get minted tiers")?;

        let mut tiers = tiers
            .iter()
            .map(|tier| tier.parse::<RewardTier>())
            .collect::<Result<Vec<_>, _>>()
            .context("Stored reward tier is invalid")?;
        tiers.sort();
        tiers.dedup();
        Ok(tiers)
    }

    async fn claim_reward(
        &self,
        wallet: &WalletAddress,
        tier: RewardTier,
    ) -> StoreResult<NftReward> {
        let conn = &mut self.conn().await?;

        let claim: NftRewardEntity = diesel::insert_into(nft_rewards::table)
            .values(CreateNftRewardEntity {
                wallet_address: wallet.as_str(),
                tier: tier.as_str(),
                status: RewardStatus::Pending.as_str(),
            })
            .returning(NftRewardEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(claim.try_into()?)
    }

    async fn mark_reward_minted(
        &self,
        id: Uuid,
        mint_address: &str,
        metadata_uri: &str,
    ) -> StoreResult<NftReward> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let minted: Option<NftRewardEntity> = diesel::update(nft_rewards::table.find(id))
            .filter(nft_rewards::status.eq(RewardStatus::Pending.as_str()))
            .set((
                nft_rewards::status.eq(RewardStatus::Minted.as_str()),
                nft_rewards::mint_address.eq(mint_address),
                nft_rewards::metadata_uri.eq(metadata_uri),
                nft_rewards::updated_at.eq(diesel::dsl::now),
            ))
            .returning(NftRewardEntity::as_returning())
            .get_result(conn)
            .await
            .optional()?;

        match minted {
            Some(minted) => Ok(minted.try_into()?),
            None => Err(stale_reward(conn, id).await),
        }
    }

    async fn mark_reward_failed(
        &self,
        id: Uuid,
        metadata_uri: Option<&str>,
        reason: &str,
    ) -> StoreResult<NftReward> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let failed: Option<NftRewardEntity> = diesel::update(nft_rewards::table.find(id))
            .filter(nft_rewards::status.eq(RewardStatus::Pending.as_str()))
            .set((
                nft_rewards::status.eq(RewardStatus::Failed.as_str()),
                nft_rewards::metadata_uri.eq(metadata_uri),
                nft_rewards::failure_reason.eq(reason),
                nft_rewards::updated_at.eq(diesel::dsl::now),
            ))
            .returning(NftRewardEntity::as_returning())
            .get_result(conn)
            .await
            .optional()?;

        match failed {
            Some(failed) => Ok(failed.try_into()?),
            None => Err(stale_reward(conn, id).await),
        }
    }

    async fn list_rewards_for_wallet(&self, wallet: &WalletAddress) -> StoreResult<Vec<NftReward>> {
        let conn = &mut self.conn().await?;

        let rewards: Vec<NftRewardEntity> = nft_rewards::table
            .filter(nft_rewards::wallet_address.eq(wallet.as_str()))
            .order_by(nft_rewards::created_at.desc())
            .select(NftRewardEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get rewards for wallet")?;

        Ok(convert_all(rewards)?)
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> StoreResult<SupportTicket> {
        let conn = &mut self.conn().await?;

        let created: SupportTicketEntity = diesel::insert_into(support_tickets::table)
            .values(CreateSupportTicketEntity {
                wallet_address: ticket.wallet_address.as_str(),
                order_id: ticket.order_id,
                subject: &ticket.subject,
                description: &ticket.description,
                status: TicketStatus::Open.as_str(),
                priority: ticket.priority.as_str(),
            })
            .returning(SupportTicketEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(created.try_into()?)
    }

    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<SupportTicket>> {
        let conn = &mut self.conn().await?;

        let ticket: Option<SupportTicketEntity> = support_tickets::table
            .find(id)
            .select(SupportTicketEntity::as_select())
            .get_result(conn)
            .await
            .optional()
            .context("Failed to get ticket")?;

        Ok(ticket.map(SupportTicket::try_from).transpose()?)
    }

    async fn list_tickets_for_wallet(
        &self,
        wallet: &WalletAddress,
    ) -> StoreResult<Vec<SupportTicket>> {
        let conn = &mut self.conn().await?;

        let tickets: Vec<SupportTicketEntity> = support_tickets::table
            .filter(support_tickets::wallet_address.eq(wallet.as_str()))
            .order_by(support_tickets::created_at.desc())
            .select(SupportTicketEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get tickets for wallet")?;

        Ok(convert_all(tickets)?)
    }

    async fn list_tickets(&self) -> StoreResult<Vec<SupportTicket>> {
        let conn = &mut self.conn().await?;

        let tickets: Vec<SupportTicketEntity> = support_tickets::table
            .order_by(support_tickets::created_at.desc())
            .select(SupportTicketEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get tickets")?;

        Ok(convert_all(tickets)?)
    }

    async fn update_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        admin_response: Option<&str>,
    ) -> StoreResult<SupportTicket> {
        let conn = &mut self.conn().await?;

        let target = support_tickets::table.find(id);
        let updated: Option<SupportTicketEntity> = match admin_response {
            Some(response) => diesel::update(target)
                .set((
                    support_tickets::status.eq(status.as_str()),
                    support_tickets::admin_response.eq(response),
                    support_tickets::updated_at.eq(diesel::dsl::now),
                ))
                .returning(SupportTicketEntity::as_returning())
                .get_result(conn)
                .await
                .optional(),
            None => diesel::update(target)
                .set((
                    support_tickets::status.eq(status.as_str()),
                    support_tickets::updated_at.eq(diesel::dsl::now),
                ))
                .returning(SupportTicketEntity::as_returning())
                .get_result(conn)
                .await
                .optional(),
        }
        .context("Failed to update ticket status")?;

        let updated = updated.ok_or(StoreError::NotFound("Ticket"))?;
        Ok(updated.try_into()?)
    }

    async fn add_comment(
        &self,
        ticket_id: Uuid,
        wallet: &WalletAddress,
        comment: &str,
        is_admin: bool,
    ) -> StoreResult<TicketComment> {
        let conn = &mut self.conn().await?;

        let created: TicketCommentEntity = diesel::insert_into(ticket_comments::table)
            .values(CreateTicketCommentEntity {
                ticket_id,
                wallet_address: wallet.as_str(),
                comment,
                is_admin,
            })
            .returning(TicketCommentEntity::as_returning())
            .get_result(conn)
            .await
            .map_err(|err| match StoreError::from(err) {
                StoreError::Rejected(_) => StoreError::NotFound("Ticket"),
                other => other,
            })?;

        Ok(created.try_into()?)
    }

    async fn list_comments(&self, ticket_id: Uuid) -> StoreResult<Vec<TicketComment>> {
        let conn = &mut self.conn().await?;

        let comments: Vec<TicketCommentEntity> = ticket_comments::table
            .filter(ticket_comments::ticket_id.eq(ticket_id))
            .order_by(ticket_comments::created_at.asc())
            .select(TicketCommentEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get ticket comments")?;

        Ok(convert_all(comments)?)
    }

    async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let conn = &mut self.conn().await?;

        let completed = OrderStatus::Completed.as_str();

        let total_orders: i64 = orders::table
            .filter(orders::status.eq(completed))
            .count()
            .get_result(conn)
            .await
            .context("Failed to count completed orders")?;

        let total_revenue: Option<Decimal> = orders::table
            .filter(orders::status.eq(completed))
            .select(diesel::dsl::sum(orders::total))
            .get_result(conn)
            .await
            .context("Failed to sum revenue")?;

        let active_customers: i64 = orders::table
            .filter(orders::status.eq(completed))
            .select(diesel::dsl::count_distinct(orders::wallet_address))
            .get_result(conn)
            .await
            .context("Failed to count active customers")?;

        let nfts_minted: i64 = nft_rewards::table
            .filter(nft_rewards::status.eq(RewardStatus::Minted.as_str()))
            .count()
            .get_result(conn)
            .await
            .context("Failed to count minted rewards")?;

        Ok(DashboardStats {
            total_orders,
            total_revenue: total_revenue.unwrap_or_default(),
            active_customers,
            nfts_minted,
        })
    }
}
