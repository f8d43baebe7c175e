//! Checkout and order lifecycle.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app_error::{AppError, ErrorDetail};
use crate::models::{NewOrder, Order, OrderItem, OrderStatus};
use crate::services::auth::AuthWallet;
use crate::store::{StatusChange, Store};
use crate::wallet::WalletAddress;

pub const MAX_QUANTITY: i32 = 100;
/// Highest unit price accepted at checkout.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 2);
/// Largest value a `NUMERIC(12, 2)` total column holds.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);
const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Checkout body. A client-side `total` is accepted and ignored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderReq {
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrderStatusReq {
    pub status: OrderStatus,
}

pub fn validate_items(items: &[OrderItem]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::invalid_field(
            "items",
            "Order must contain at least one item",
        ));
    }

    let mut details = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let mut fail = |field: &str, message: String| {
            details.push(ErrorDetail {
                path: format!("items[{i}].{field}"),
                message,
            });
        };

        if item.name.trim().is_empty() {
            fail("name", "Name must not be empty".to_string());
        }
        if !(1..=MAX_QUANTITY).contains(&item.quantity) {
            fail(
                "quantity",
                format!("Quantity must be between 1 and {MAX_QUANTITY}"),
            );
        }
        if item.price.is_sign_negative() {
            fail("price", "Price must not be negative".to_string());
        } else if item.price > MAX_PRICE {
            fail("price", format!("Price must be at most {MAX_PRICE}"));
        } else if item.price.normalize().scale() > 2 {
            fail("price", "Price must have at most 2 decimal places".to_string());
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation {
            message: "Validation failed".to_string(),
            details,
        })
    }
}

/// Authoritative order total, bounded by what the `orders.total` column stores.
pub fn order_total(items: &[OrderItem]) -> Result<Decimal, AppError> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| {
            item.line_total()
                .and_then(|line| total.checked_add(line))
                .filter(|total| *total <= MAX_ORDER_TOTAL)
        })
        .ok_or_else(|| {
            AppError::invalid_field(
                "items",
                format!("Order total must be at most {MAX_ORDER_TOTAL}"),
            )
        })
}

/// Whether `caller` may move an order owned by `owner` to `to`.
pub fn may_change_status(caller: &AuthWallet, owner: &WalletAddress, to: OrderStatus) -> bool {
    caller.is_admin || (&caller.address == owner && to == OrderStatus::Cancelled)
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    track_inventory: bool,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, track_inventory: bool) -> Self {
        Self {
            store,
            track_inventory,
        }
    }

    pub async fn create(
        &self,
        wallet: &WalletAddress,
        req: CreateOrderReq,
        idempotency_key: Option<String>,
    ) -> Result<Order, AppError> {
        validate_items(&req.items)?;

        let idempotency_key = idempotency_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        if idempotency_key
            .as_ref()
            .is_some_and(|key| key.len() > MAX_IDEMPOTENCY_KEY_LEN)
        {
            return Err(AppError::invalid_field(
                "Idempotency-Key",
                format!("Must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters"),
            ));
        }

        let items: Vec<OrderItem> = req
            .items
            .into_iter()
            .map(|item| OrderItem {
                name: item.name.trim().to_string(),
                ..item
            })
            .collect();

        let total = order_total(&items)?;
        let order = self
            .store
            .create_order(&NewOrder {
                wallet_address: wallet.clone(),
                total,
                items,
                idempotency_key,
                decrement_inventory: self.track_inventory,
            })
            .await?;

        info!(order = %order.id, wallet = %wallet, total = %order.total, "Order placed");

        Ok(order)
    }

    /// Loads an order the caller owns, or any order for admins.
    pub async fn get(&self, caller: &AuthWallet, id: Uuid) -> Result<Order, AppError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(AppError::NotFound("Order"))?;

        if !caller.can_access(&order.wallet_address) {
            return Err(AppError::unauthorized("Order belongs to another wallet"));
        }
        Ok(order)
    }

    pub async fn list_for(&self, wallet: &WalletAddress) -> Result<Vec<Order>, AppError> {
        Ok(self.store.list_orders_for_wallet(wallet).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Order>, AppError> {
        Ok(self.store.list_orders().await?)
    }

    pub async fn update_status(
        &self,
        caller: &AuthWallet,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, AppError> {
        let order = self.get(caller, id).await?;

        if !may_change_status(caller, &order.wallet_address, status) {
            return Err(AppError::unauthorized(
                "Only admins may change order status other than cancelling",
            ));
        }
        if order.status == status {
            return Ok(order);
        }
        if !order.status.can_transition_to(status) {
            return Err(AppError::invalid_field(
                "status",
                format!("Cannot move order from {} to {status}", order.status),
            ));
        }

        let updated = self
            .store
            .update_order_status(&StatusChange {
                order_id: id,
                from: order.status,
                to: status,
            })
            .await?;

        info!(order = %id, from = %order.status, to = %status, "Order status changed");

        Ok(updated)
    }
}
