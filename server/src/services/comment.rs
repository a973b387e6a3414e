//! Agent comments that carry a requested ticket status.
//!
//! Every precondition is checked before the comment is written. The
//! transition runs after the write; what happens to the comment when it
//! fails depends on [`CommentTransitionMode`].

use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use super::background::BackgroundTask;
use super::lifecycle::{ensure_can_start_work, ensure_transition_allowed, TicketLifecycle};
use super::notifications;
use super::ServiceContext;
use crate::config::CommentTransitionMode;
use crate::models::{
    Agent, AttachmentSnapshot, CommentSender, CompanyType, SenderType, Ticket, TicketComment,
    TicketStatus,
};
use crate::store::{AgentFilter, AttachmentFilter, CustomerFilter, TicketFilter};
use crate::utils::error::AppError;
use crate::utils::validation::FieldErrors;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentTransitionRequest {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub ticket_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachment_ids: Vec<String>,
    #[serde(default)]
    pub status: String,
}

impl CommentTransitionRequest {
    fn validate(&self) -> Result<TicketStatus, AppError> {
        let mut errors = FieldErrors::new();
        errors.require("agentId", &self.agent_id);
        errors.require("ticketId", &self.ticket_id);
        errors.require("content", &self.content);
        errors.require("status", &self.status);

        let status = TicketStatus::parse(self.status.trim());
        if status.is_none() {
            errors.add("status", format!("status '{}' is not recognised", self.status));
        }

        match status {
            Some(status) if errors.is_empty() => Ok(status),
            _ => Err(AppError::ValidationError(errors)),
        }
    }
}

#[derive(Clone)]
pub struct CommentService {
    ctx: ServiceContext,
    lifecycle: TicketLifecycle,
}

impl CommentService {
    pub fn new(ctx: ServiceContext, lifecycle: TicketLifecycle) -> Self {
        Self { ctx, lifecycle }
    }

    /// Posts `request.content` on the ticket as the agent and applies the
    /// requested status through the lifecycle.
    #[instrument(skip_all, fields(ticket_id = %request.ticket_id, agent_id = %request.agent_id, status = %request.status))]
    pub async fn apply_comment_transition(
        &self,
        request: CommentTransitionRequest,
    ) -> Result<TicketComment, AppError> {
        let target = request.validate()?;
        let _guard = self.ctx.locks.lock(&request.ticket_id).await;
        let now = self.ctx.clock.now();

        let agent = self
            .ctx
            .stores
            .agents
            .find_one(&AgentFilter::by_id(&request.agent_id))
            .await?
            .ok_or_else(|| AppError::not_found("agent", &request.agent_id))?;

        let mut ticket = self.load_ticket(&request.ticket_id, &agent).await?;

        let company = self
            .ctx
            .stores
            .companies
            .find_by_id(&ticket.company.id)
            .await?
            .ok_or_else(|| AppError::not_found("company", &ticket.company.id))?;

        if company.company_type == CompanyType::B2C {
            if ticket.agents.is_empty() {
                return Err(AppError::Forbidden(
                    "ticket has no assigned agent".to_string(),
                ));
            }
            if !ticket.is_assigned_to(&agent.id) {
                return Err(AppError::Forbidden(
                    "agent is not assigned to this ticket".to_string(),
                ));
            }
        }

        let customer = self
            .ctx
            .stores
            .customers
            .find_one(&CustomerFilter::by_id(&ticket.customer.id))
            .await?
            .ok_or_else(|| AppError::not_found("customer", &ticket.customer.id))?;

        ensure_transition_allowed(ticket.status, target)?;
        if target == TicketStatus::InProgress {
            ensure_can_start_work(&customer, now)?;
        }

        let attachments = self
            .resolve_attachments(&request.attachment_ids, &ticket.company.id)
            .await?;

        let comment = TicketComment {
            id: self.ctx.ids.next_id(),
            ticket_id: ticket.id.clone(),
            company_id: ticket.company.id.clone(),
            sender: CommentSender {
                id: agent.id.clone(),
                name: agent.name.clone(),
                email: agent.email.clone(),
                sender_type: SenderType::Agent,
            },
            content: request.content,
            attachments,
            status: target,
            created_at: now,
        };
        self.ctx.stores.comments.insert(&comment).await?;

        if let Err(err) = self.lifecycle.transition(&mut ticket, &agent, target).await {
            self.compensate(&comment).await;
            return Err(err);
        }

        self.ctx
            .queue
            .submit(BackgroundTask::SendEmail(notifications::comment_email(
                &ticket, &comment,
            )))
            .await;

        info!(comment_id = %comment.id, "Comment posted");
        Ok(comment)
    }

    async fn load_ticket(&self, ticket_id: &str, agent: &Agent) -> Result<Ticket, AppError> {
        let tickets = &self.ctx.stores.tickets;
        let scoped = TicketFilter::by_id(ticket_id).in_company(&agent.company_id);
        if let Some(ticket) = tickets.find_one(&scoped).await? {
            return Ok(ticket);
        }

        // Tell a ticket of another company apart from one that does not exist.
        match tickets.find_one(&TicketFilter::by_id(ticket_id)).await? {
            Some(_) => Err(AppError::Forbidden(
                "ticket belongs to another company".to_string(),
            )),
            None => Err(AppError::not_found("ticket", ticket_id)),
        }
    }

    /// Unknown ids are skipped. Marking the found ones as used happens in
    /// the background.
    async fn resolve_attachments(
        &self,
        ids: &[String],
        company_id: &str,
    ) -> Result<Vec<AttachmentSnapshot>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = self
            .ctx
            .stores
            .attachments
            .find(&AttachmentFilter {
                ids: Some(ids.to_vec()),
                company_id: Some(company_id.to_string()),
                ..AttachmentFilter::default()
            })
            .await?;

        if found.len() < ids.len() {
            warn!(
                requested = ids.len(),
                found = found.len(),
                "Some attachments were not found"
            );
        }
        if !found.is_empty() {
            self.ctx
                .queue
                .submit(BackgroundTask::MarkAttachmentsUsed {
                    ids: found.iter().map(|a| a.id.clone()).collect(),
                })
                .await;
        }

        Ok(found.iter().map(AttachmentSnapshot::from).collect())
    }

    async fn compensate(&self, comment: &TicketComment) {
        if self.ctx.settings.comment_transition_mode != CommentTransitionMode::Compensate {
            warn!(comment_id = %comment.id, "Transition failed, comment kept");
            return;
        }

        match self.ctx.stores.comments.delete(&comment.id).await {
            Ok(()) => warn!(comment_id = %comment.id, "Transition failed, comment removed"),
            Err(e) => error!(error = %e, comment_id = %comment.id, "Failed to remove comment"),
        }
    }
}
