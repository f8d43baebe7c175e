//! Support tickets and their comment threads.
//!
//! Tickets are visible to their owner and to admins. Only admins change
//! status; the last write wins. Notifications are structured events on the
//! `notifications` tracing target for whatever ships the logs.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app_error::AppError;
use crate::models::{NewTicket, SupportTicket, TicketComment, TicketPriority, TicketStatus};
use crate::services::auth::AuthWallet;
use crate::store::Store;

const SUBJECT_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 5_000;
const COMMENT_MAX: usize = 2_000;
const ADMIN_RESPONSE_MAX: usize = 5_000;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketReq {
    pub subject: String,
    pub description: String,
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub priority: TicketPriority,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketStatusReq {
    pub status: TicketStatus,
    pub admin_response: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddCommentReq {
    pub comment: String,
}

/// Trims `value` and checks it holds 1..=`max` characters.
fn required_text(field: &str, value: &str, max: usize) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::invalid_field(field, "Must not be empty"));
    }
    if value.chars().count() > max {
        return Err(AppError::invalid_field(
            field,
            format!("Must be at most {max} characters"),
        ));
    }
    Ok(value.to_string())
}

#[derive(Clone)]
pub struct SupportService {
    store: Arc<dyn Store>,
}

impl SupportService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        caller: &AuthWallet,
        req: CreateTicketReq,
    ) -> Result<SupportTicket, AppError> {
        let subject = required_text("subject", &req.subject, SUBJECT_MAX)?;
        let description = required_text("description", &req.description, DESCRIPTION_MAX)?;

        if let Some(order_id) = req.order_id {
            let order = self
                .store
                .get_order(order_id)
                .await?
                .ok_or(AppError::NotFound("Order"))?;
            if !caller.can_access(&order.wallet_address) {
                return Err(AppError::unauthorized("Order belongs to another wallet"));
            }
        }

        let ticket = self
            .store
            .create_ticket(&NewTicket {
                wallet_address: caller.address.clone(),
                order_id: req.order_id,
                subject,
                description,
                priority: req.priority,
            })
            .await?;

        info!(
            target: "notifications",
            audience = "admin",
            ticket = %ticket.id,
            wallet = %ticket.wallet_address,
            priority = %ticket.priority,
            "New support ticket: {}",
            ticket.subject
        );

        Ok(ticket)
    }

    pub async fn get(&self, caller: &AuthWallet, id: Uuid) -> Result<SupportTicket, AppError> {
        let ticket = self
            .store
            .get_ticket(id)
            .await?
            .ok_or(AppError::NotFound("Ticket"))?;
        if !caller.can_access(&ticket.wallet_address) {
            return Err(AppError::unauthorized("Ticket belongs to another wallet"));
        }
        Ok(ticket)
    }

    pub async fn list_for(&self, caller: &AuthWallet) -> Result<Vec<SupportTicket>, AppError> {
        Ok(self.store.list_tickets_for_wallet(&caller.address).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<SupportTicket>, AppError> {
        Ok(self.store.list_tickets().await?)
    }

    pub async fn update_status(
        &self,
        caller: &AuthWallet,
        id: Uuid,
        req: UpdateTicketStatusReq,
    ) -> Result<SupportTicket, AppError> {
        if !caller.is_admin {
            return Err(AppError::unauthorized("Admin access required"));
        }
        let admin_response = req
            .admin_response
            .as_deref()
            .map(|response| required_text("adminResponse", response, ADMIN_RESPONSE_MAX))
            .transpose()?;

        let ticket = self
            .store
            .update_ticket_status(id, req.status, admin_response.as_deref())
            .await?;

        info!(
            target: "notifications",
            audience = "user",
            ticket = %ticket.id,
            wallet = %ticket.wallet_address,
            status = %ticket.status,
            "Support ticket updated"
        );

        Ok(ticket)
    }

    pub async fn add_comment(
        &self,
        caller: &AuthWallet,
        ticket_id: Uuid,
        req: AddCommentReq,
    ) -> Result<TicketComment, AppError> {
        let comment = required_text("comment", &req.comment, COMMENT_MAX)?;
        let ticket = self.get(caller, ticket_id).await?;

        let created = self
            .store
            .add_comment(ticket.id, &caller.address, &comment, caller.is_admin)
            .await?;

        let audience = if caller.is_admin { "user" } else { "admin" };
        info!(
            target: "notifications",
            audience,
            ticket = %ticket.id,
            wallet = %ticket.wallet_address,
            "New comment on support ticket"
        );

        Ok(created)
    }

    pub async fn comments(
        &self,
        caller: &AuthWallet,
        ticket_id: Uuid,
    ) -> Result<Vec<TicketComment>, AppError> {
        let ticket = self.get(caller, ticket_id).await?;
        Ok(self.store.list_comments(ticket.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::wallet::WalletAddress;

    fn caller(seed: u8, is_admin: bool) -> AuthWallet {
        AuthWallet {
            address: WalletAddress::from_bytes([seed; 32]),
            is_admin,
        }
    }

    fn ticket_req(subject: &str) -> CreateTicketReq {
        CreateTicketReq {
            subject: subject.to_string(),
            description: "My lemonade never arrived".to_string(),
            order_id: None,
            priority: TicketPriority::default(),
        }
    }

    #[test]
    fn text_fields_are_trimmed_and_bounded() {
        assert_eq!(required_text("subject", "  Late  ", 10).unwrap(), "Late");
        assert!(required_text("subject", "   ", 10).is_err());
        assert!(required_text("subject", &"x".repeat(11), 10).is_err());
        assert!(required_text("subject", &"é".repeat(10), 10).is_ok());
    }

    #[tokio::test]
    async fn tickets_are_private_to_owner_and_admins() {
        let service = SupportService::new(Arc::new(MemoryStore::new()));
        let owner = caller(21, false);

        let ticket = service.create(&owner, ticket_req("Late order")).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Medium);

        assert!(service.get(&owner, ticket.id).await.is_ok());
        assert!(service.get(&caller(22, true), ticket.id).await.is_ok());
        assert!(matches!(
            service.get(&caller(23, false), ticket.id).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            service
                .add_comment(
                    &caller(23, false),
                    ticket.id,
                    AddCommentReq {
                        comment: "me too".into()
                    }
                )
                .await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn comments_record_who_wrote_them() {
        let service = SupportService::new(Arc::new(MemoryStore::new()));
        let owner = caller(24, false);
        let admin = caller(25, true);

        let ticket = service.create(&owner, ticket_req("Refund")).await.unwrap();
        service
            .add_comment(&owner, ticket.id, AddCommentReq { comment: "Any news?".into() })
            .await
            .unwrap();
        service
            .add_comment(&admin, ticket.id, AddCommentReq { comment: "On it".into() })
            .await
            .unwrap();

        let thread = service.comments(&owner, ticket.id).await.unwrap();
        let flags: Vec<bool> = thread.iter().map(|c| c.is_admin).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[tokio::test]
    async fn only_admins_change_status() {
        let service = SupportService::new(Arc::new(MemoryStore::new()));
        let owner = caller(26, false);
        let ticket = service.create(&owner, ticket_req("Wrong size")).await.unwrap();

        let req = |status| UpdateTicketStatusReq {
            status,
            admin_response: None,
        };
        assert!(matches!(
            service
                .update_status(&owner, ticket.id, req(TicketStatus::Closed))
                .await,
            Err(AppError::Unauthorized(_))
        ));

        let resolved = service
            .update_status(
                &caller(27, true),
                ticket.id,
                UpdateTicketStatusReq {
                    status: TicketStatus::Resolved,
                    admin_response: Some(" Refunded ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert_eq!(resolved.admin_response.as_deref(), Some("Refunded"));
    }

    #[tokio::test]
    async fn linked_orders_must_belong_to_the_caller() {
        let service = SupportService::new(Arc::new(MemoryStore::new()));
        let mut req = ticket_req("Missing");
        req.order_id = Some(Uuid::new_v4());

        assert!(matches!(
            service.create(&caller(28, false), req).await,
            Err(AppError::NotFound("Order"))
        ));
    }
}
