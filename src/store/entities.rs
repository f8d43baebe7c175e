//! Row types for the Postgres store and their conversions to domain models.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{Insertable, Queryable},
};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    AuthChallenge, MenuItem, NftReward, Order, OrderItem, PaymentTransaction, Session,
    SupportTicket, TicketComment, User,
};
use crate::wallet::WalletAddress;

fn wallet(raw: &str) -> Result<WalletAddress> {
    raw.parse()
        .with_context(|| format!("Stored wallet address '{raw}' is invalid"))
}

// Users

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub wallet_address: String,
    pub total_orders: i32,
    pub total_spent: Decimal,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity<'a> {
    pub wallet_address: &'a str,
}

impl TryFrom<UserEntity> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserEntity) -> Result<Self> {
        Ok(Self {
            wallet_address: wallet(&row.wallet_address)?,
            total_orders: row.total_orders,
            total_spent: row.total_spent,
            is_admin: row.is_admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::auth_challenges)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuthChallengeEntity {
    pub nonce: String,
    pub wallet_address: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::auth_challenges)]
pub struct CreateAuthChallengeEntity<'a> {
    pub nonce: &'a str,
    pub wallet_address: &'a str,
    pub message: &'a str,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<AuthChallengeEntity> for AuthChallenge {
    type Error = anyhow::Error;

    fn try_from(row: AuthChallengeEntity) -> Result<Self> {
        Ok(Self {
            wallet_address: wallet(&row.wallet_address)?,
            nonce: row.nonce,
            message: row.message,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionEntity {
    pub token: String,
    pub wallet_address: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::sessions)]
pub struct CreateSessionEntity<'a> {
    pub token: &'a str,
    pub wallet_address: &'a str,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<SessionEntity> for Session {
    type Error = anyhow::Error;

    fn try_from(row: SessionEntity) -> Result<Self> {
        Ok(Self {
            wallet_address: wallet(&row.wallet_address)?,
            token: row.token,
            expires_at: row.expires_at,
        })
    }
}

// Menu

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::menu_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MenuItemEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub size: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_available: bool,
}

impl TryFrom<MenuItemEntity> for MenuItem {
    type Error = anyhow::Error;

    fn try_from(row: MenuItemEntity) -> Result<Self> {
        Ok(Self {
            id: row.id,
            size: row.size.parse()?,
            name: row.name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            is_available: row.is_available,
        })
    }
}

// Orders

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    pub wallet_address: String,
    pub items: Value,
    pub total: Decimal,
    pub status: String,
    pub transaction_signature: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity<'a> {
    pub wallet_address: &'a str,
    pub items: Value,
    pub total: Decimal,
    pub status: &'a str,
    pub idempotency_key: Option<&'a str>,
}

impl TryFrom<OrderEntity> for Order {
    type Error = anyhow::Error;

    fn try_from(row: OrderEntity) -> Result<Self> {
        let items: Vec<OrderItem> = serde_json::from_value(row.items)
            .with_context(|| format!("Order {} has malformed items", row.id))?;

        Ok(Self {
            id: row.id,
            wallet_address: wallet(&row.wallet_address)?,
            items,
            total: row.total,
            status: row.status.parse()?,
            transaction_signature: row.transaction_signature,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Payments

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::payment_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub wallet_address: String,
    pub amount: Decimal,
    pub signature: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::payment_transactions)]
pub struct CreatePaymentEntity<'a> {
    pub order_id: Uuid,
    pub wallet_address: &'a str,
    pub amount: Decimal,
    pub signature: Option<&'a str>,
    pub status: &'a str,
}

impl TryFrom<PaymentEntity> for PaymentTransaction {
    type Error = anyhow::Error;

    fn try_from(row: PaymentEntity) -> Result<Self> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            wallet_address: wallet(&row.wallet_address)?,
            amount: row.amount,
            signature: row.signature,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Rewards

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::nft_rewards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NftRewardEntity {
    pub id: Uuid,
    pub wallet_address: String,
    pub tier: String,
    pub mint_address: Option<String>,
    pub metadata_uri: Option<String>,
    pub status: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::nft_rewards)]
pub struct CreateNftRewardEntity<'a> {
    pub wallet_address: &'a str,
    pub tier: &'a str,
    pub status: &'a str,
}

impl TryFrom<NftRewardEntity> for NftReward {
    type Error = anyhow::Error;

    fn try_from(row: NftRewardEntity) -> Result<Self> {
        Ok(Self {
            id: row.id,
            wallet_address: wallet(&row.wallet_address)?,
            tier: row.tier.parse()?,
            mint_address: row.mint_address,
            metadata_uri: row.metadata_uri,
            status: row.status.parse()?,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Support

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::support_tickets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SupportTicketEntity {
    pub id: Uuid,
    pub wallet_address: String,
    pub order_id: Option<Uuid>,
    pub subject: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub admin_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::support_tickets)]
pub struct CreateSupportTicketEntity<'a> {
    pub wallet_address: &'a str,
    pub order_id: Option<Uuid>,
    pub subject: &'a str,
    pub description: &'a str,
    pub status: &'a str,
    pub priority: &'a str,
}

impl TryFrom<SupportTicketEntity> for SupportTicket {
    type Error = anyhow::Error;

    fn try_from(row: SupportTicketEntity) -> Result<Self> {
        Ok(Self {
            id: row.id,
            wallet_address: wallet(&row.wallet_address)?,
            order_id: row.order_id,
            subject: row.subject,
            description: row.description,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            admin_response: row.admin_response,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::ticket_comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TicketCommentEntity {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub wallet_address: String,
    pub comment: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::ticket_comments)]
pub struct CreateTicketCommentEntity<'a> {
    pub ticket_id: Uuid,
    pub wallet_address: &'a str,
    pub comment: &'a str,
    pub is_admin: bool,
}

impl TryFrom<TicketCommentEntity> for TicketComment {
    type Error = anyhow::Error;

    fn try_from(row: TicketCommentEntity) -> Result<Self> {
        Ok(Self {
            id: row.id,
            ticket_id: row.ticket_id,
            wallet_address: wallet(&row.wallet_address)?,
            comment: row.comment,
            is_admin: row.is_admin,
            created_at: row.created_at,
        })
    }
}

/// Converts a batch of rows, failing on the first malformed one.
pub fn convert_all<E, T>(rows: Vec<E>) -> Result<Vec<T>>
where
    T: TryFrom<E, Error = anyhow::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{OrderStatus, RewardStatus, RewardTier};

    const WALLET: &str = "11111111111111111111111111111111";

    #[test]
    fn order_rows_decode_items_and_legacy_status() {
        let row = OrderEntity {
            id: Uuid::new_v4(),
            wallet_address: WALLET.into(),
            items: json!([{"name": "Classic", "size": "small", "quantity": 1, "price": 3.5}]),
            total: Decimal::new(350, 2),
            status: "confirmed".into(),
            transaction_signature: None,
            idempotency_key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let order = Order::try_from(row).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, Decimal::new(350, 2));
    }

    #[test]
    fn reward_rows_accept_legacy_tier_names() {
        let row = NftRewardEntity {
            id: Uuid::new_v4(),
            wallet_address: WALLET.into(),
            tier: "purchase_count_silver".into(),
            mint_address: None,
            metadata_uri: None,
            status: "failed".into(),
            failure_reason: Some("minter offline".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let reward = NftReward::try_from(row).unwrap();
        assert_eq!(reward.tier, RewardTier::Silver);
        assert_eq!(reward.status, RewardStatus::Failed);
    }

    #[test]
    fn malformed_rows_are_errors() {
        let row = UserEntity {
            wallet_address: "not a wallet".into(),
            total_orders: 0,
            total_spent: Decimal::ZERO,
            is_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(User::try_from(row).is_err());
    }
}
