use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::wallet::WalletAddress;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Text column <-> enum mapping. The first literal is canonical, the rest are
/// spellings accepted on read.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text $(| $alias)* => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Users

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub wallet_address: WalletAddress,
    pub total_orders: i32,
    pub total_spent: Decimal,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuthChallenge {
    pub nonce: String,
    pub wallet_address: WalletAddress,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub wallet_address: WalletAddress,
    pub expires_at: DateTime<Utc>,
}

// Menu

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    #[serde(alias = "Small")]
    Small,
    #[serde(alias = "Large")]
    Large,
}

text_enum!(Size { Small => "small", Large => "large" });

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub size: Size,
    pub price: Decimal,
    pub stock: i32,
    pub is_available: bool,
}

// Orders

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    #[serde(alias = "confirmed")]
    Processing,
    Completed,
    Failed,
    Cancelled,
}

text_enum!(OrderStatus {
    Pending => "pending",
    Processing => "processing" | "confirmed",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Orders only move forward: pending -> processing -> completed, and may
    /// drop out to failed/cancelled while still open.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (Self::Pending, Self::Processing | Self::Completed) => true,
            (Self::Processing, Self::Completed) => true,
            (_, Self::Failed | Self::Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Sweetness {
    #[serde(alias = "Less Sweet")]
    LessSweet,
    #[default]
    #[serde(alias = "Normal")]
    Normal,
    #[serde(alias = "Extra Sweet")]
    ExtraSweet,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IceLevel {
    #[serde(alias = "No Ice")]
    NoIce,
    #[serde(alias = "Light Ice")]
    LightIce,
    #[default]
    #[serde(alias = "Normal Ice", alias = "Regular Ice")]
    NormalIce,
    #[serde(alias = "Extra Ice")]
    ExtraIce,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Customizations {
    #[serde(default)]
    pub sweetness: Sweetness,
    #[serde(default)]
    pub ice: IceLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub name: String,
    pub size: Size,
    pub quantity: i32,
    pub price: Decimal,
    #[serde(default)]
    pub customizations: Customizations,
}

impl OrderItem {
    /// `None` when the product does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub wallet_address: WalletAddress,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub transaction_signature: Option<String>,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated order ready to be written.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub wallet_address: WalletAddress,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub idempotency_key: Option<String>,
    pub decrement_inventory: bool,
}

// Payments

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

text_enum!(PaymentStatus { Pending => "pending", Completed => "completed" });

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub wallet_address: WalletAddress,
    pub amount: Decimal,
    pub signature: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Rewards

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RewardTier {
    #[serde(alias = "purchase_count_bronze")]
    Bronze,
    #[serde(alias = "purchase_count_silver")]
    Silver,
    #[serde(alias = "purchase_count_gold")]
    Gold,
}

text_enum!(RewardTier {
    Bronze => "bronze" | "purchase_count_bronze",
    Silver => "silver" | "purchase_count_silver",
    Gold => "gold" | "purchase_count_gold",
});

impl RewardTier {
    /// All tiers, ascending by threshold.
    pub const ALL: [RewardTier; 3] = [Self::Bronze, Self::Silver, Self::Gold];

    /// Completed orders needed to qualify.
    pub fn threshold(self) -> i64 {
        match self {
            Self::Bronze => 5,
            Self::Silver => 10,
            Self::Gold => 20,
        }
    }

    pub fn discount_percent(self) -> u8 {
        match self {
            Self::Bronze => 5,
            Self::Silver => 10,
            Self::Gold => 15,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze Tier",
            Self::Silver => "Silver Tier",
            Self::Gold => "Gold Tier",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Bronze => {
                "Earn 5% discount on all purchases and early access to seasonal flavors."
            }
            Self::Silver => "Unlock exclusive flavors and member-only events with 10% discount.",
            Self::Gold => "VIP treatment with 15% discount and custom flavor requests.",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Bronze => "#CD7F32",
            Self::Silver => "#C0C0C0",
            Self::Gold => "#FFD700",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Pending,
    Minted,
    Failed,
}

text_enum!(RewardStatus { Pending => "pending", Minted => "minted", Failed => "failed" });

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NftReward {
    pub id: Uuid,
    pub wallet_address: WalletAddress,
    pub tier: RewardTier,
    pub mint_address: Option<String>,
    pub metadata_uri: Option<String>,
    pub status: RewardStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Support

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

text_enum!(TicketStatus {
    Open => "open",
    InProgress => "in_progress",
    Resolved => "resolved",
    Closed => "closed",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

text_enum!(TicketPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: Uuid,
    pub wallet_address: WalletAddress,
    pub order_id: Option<Uuid>,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub admin_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub wallet_address: WalletAddress,
    pub order_id: Option<Uuid>,
    pub subject: String,
    pub description: String,
    pub priority: TicketPriority,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub wallet_address: WalletAddress,
    pub comment: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

// Admin

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub active_customers: i64,
    pub nfts_minted: i64,
}
