//! Wallet checkout: unsigned transfer construction and ledger confirmation.

use std::sync::Arc;

use anyhow::anyhow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::{Ledger, SignatureStatus};
use crate::app_error::AppError;
use crate::models::{Order, OrderStatus};
use crate::services::auth::AuthWallet;
use crate::services::retry::RetryPolicy;
use crate::store::{StatusChange, Store, StoreError};
use crate::transfer::{UnsignedTransfer, lamports_to_sol, sol_to_lamports};
use crate::wallet::WalletAddress;

const LEDGER_SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestRes {
    pub order_id: Uuid,
    /// Base64 unsigned transaction for the wallet to sign and submit.
    pub transaction: String,
    pub amount: Decimal,
    pub lamports: u64,
    pub recent_blockhash: String,
    pub store_wallet: WalletAddress,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConfirmPaymentReq {
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfirmPaymentRes {
    pub order: Order,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRes {
    pub balance: Decimal,
    pub lamports: u64,
    pub wallet_address: WalletAddress,
}

/// Ledger transaction ids are base58 64-byte signatures.
pub fn validate_ledger_signature(signature: &str) -> Result<&str, AppError> {
    let signature = signature.trim();
    let decoded = bs58::decode(signature).into_vec().map_err(|_| {
        AppError::invalid_field("signature", "Signature must be base58 encoded")
    })?;
    if decoded.len() != LEDGER_SIGNATURE_LEN {
        return Err(AppError::invalid_field(
            "signature",
            format!("Signature must decode to {LEDGER_SIGNATURE_LEN} bytes"),
        ));
    }
    Ok(signature)
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
    ledger: Arc<dyn Ledger>,
    store_wallet: WalletAddress,
    confirm_retry: RetryPolicy,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn Store>,
        ledger: Arc<dyn Ledger>,
        store_wallet: WalletAddress,
        confirm_retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            ledger,
            store_wallet,
            confirm_retry,
        }
    }

    async fn owned_order(&self, caller: &AuthWallet, order_id: Uuid) -> Result<Order, AppError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(AppError::NotFound("Order"))?;
        if order.wallet_address != caller.address {
            return Err(AppError::unauthorized("Order belongs to another wallet"));
        }
        Ok(order)
    }

    pub async fn create_payment(
        &self,
        caller: &AuthWallet,
        order_id: Uuid,
    ) -> Result<PaymentRequestRes, AppError> {
        let order = self.owned_order(caller, order_id).await?;
        if order.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Order is already {}",
                order.status
            )));
        }

        let lamports =
            sol_to_lamports(order.total).map_err(|err| AppError::validation(err.to_string()))?;
        let recent_blockhash = self.ledger.latest_blockhash().await?;
        let transfer = UnsignedTransfer::new(
            &caller.address,
            &self.store_wallet,
            lamports,
            &recent_blockhash,
        )
        .map_err(|err| AppError::validation(err.to_string()))?;

        self.store
            .upsert_pending_payment(order.id, &order.wallet_address, order.total)
            .await?;

        if order.status == OrderStatus::Pending {
            let change = StatusChange {
                order_id: order.id,
                from: OrderStatus::Pending,
                to: OrderStatus::Processing,
            };
            match self.store.update_order_status(&change).await {
                Ok(_) | Err(StoreError::Conflict(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        info!(order = %order.id, lamports, "Payment requested");

        Ok(PaymentRequestRes {
            order_id: order.id,
            transaction: transfer.to_base64(),
            amount: order.total,
            lamports,
            recent_blockhash,
            store_wallet: self.store_wallet.clone(),
        })
    }

    pub async fn confirm_payment(
        &self,
        caller: &AuthWallet,
        order_id: Uuid,
        signature: &str,
    ) -> Result<ConfirmPaymentRes, AppError> {
        let signature = validate_ledger_signature(signature)?;
        let order = self.owned_order(caller, order_id).await?;

        if order.status == OrderStatus::Completed {
            return if order.transaction_signature.as_deref() == Some(signature) {
                Ok(ConfirmPaymentRes {
                    order,
                    signature: signature.to_string(),
                })
            } else {
                Err(AppError::validation("Order is already paid"))
            };
        }
        if order.status.is_terminal() {
            return Err(AppError::validation(format!("Order is {}", order.status)));
        }

        let settled = self
            .confirm_retry
            .retry("Payment confirmation", || async {
                match self.ledger.signature_status(signature).await? {
                    SignatureStatus::Pending => Err(anyhow!("transaction not confirmed yet")),
                    settled => Ok(settled),
                }
            })
            .await?;

        if let SignatureStatus::Failed(reason) = settled {
            warn!(order = %order.id, signature, reason = %reason, "Ledger rejected payment");
            return Err(AppError::PaymentFailed(reason));
        }

        let completed = match self
            .store
            .complete_payment(order.id, order.status, signature)
            .await
        {
            Ok(completed) => completed,
            Err(StoreError::Conflict(reason)) => {
                // A concurrent confirmation of the same signature already won.
                let current = self.owned_order(caller, order_id).await?;
                if current.transaction_signature.as_deref() != Some(signature) {
                    return Err(AppError::Conflict(reason));
                }
                current
            }
            Err(err) => return Err(err.into()),
        };

        info!(order = %completed.id, signature, "Payment confirmed");

        Ok(ConfirmPaymentRes {
            order: completed,
            signature: signature.to_string(),
        })
    }

    pub async fn balance(&self, wallet: &WalletAddress) -> Result<BalanceRes, AppError> {
        let lamports = self.ledger.balance(wallet).await?;
        Ok(BalanceRes {
            balance: lamports_to_sol(lamports),
            lamports,
            wallet_address: wallet.clone(),
        })
    }
}
