//! Ticket status transitions.
//!
//! A transition only fires when the ticket is not already in the target
//! status, so re-requesting the current status leaves the ticket untouched.
//! Moving to `in_progress` starts a new timer session and moving to
//! `resolve` closes it and charges the customer's balance.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use super::background::BackgroundTask;
use super::ledger::BalanceLedger;
use super::notifications;
use super::ServiceContext;
use crate::models::time_log::{
    ACTIVITY_TICKET_IN_PROGRESS, ACTIVITY_TICKET_OPEN, ACTIVITY_TICKET_RESOLVE,
};
use crate::models::{Agent, Customer, Ticket, TicketStatus, TicketTimeLog};
use crate::utils::error::AppError;

const FROM_OPEN: &[TicketStatus] = &[TicketStatus::Open, TicketStatus::InProgress];
const FROM_IN_PROGRESS: &[TicketStatus] = &[TicketStatus::InProgress, TicketStatus::Resolve];
const FROM_RESOLVE: &[TicketStatus] = &[TicketStatus::InProgress, TicketStatus::Resolve];

/// Statuses an agent may request for a ticket in `current`. `None` means
/// the current status places no restriction.
pub fn allowed_targets(current: TicketStatus) -> Option<&'static [TicketStatus]> {
    match current {
        TicketStatus::Open => Some(FROM_OPEN),
        TicketStatus::InProgress => Some(FROM_IN_PROGRESS),
        TicketStatus::Resolve => Some(FROM_RESOLVE),
        TicketStatus::Processing | TicketStatus::Cancel | TicketStatus::Closed => None,
    }
}

pub fn ensure_transition_allowed(
    current: TicketStatus,
    requested: TicketStatus,
) -> Result<(), AppError> {
    match allowed_targets(current) {
        Some(allowed) if !allowed.contains(&requested) => Err(AppError::InvalidState(format!(
            "cannot change ticket status from {} to {}",
            current, requested
        ))),
        _ => Ok(()),
    }
}

/// Customers on a time balance need a live subscription and a non-negative
/// remaining balance before work can start.
pub fn ensure_can_start_work(customer: &Customer, now: DateTime<Utc>) -> Result<(), AppError> {
    if !customer.is_need_balance {
        return Ok(());
    }

    let subscription = &customer.subscription;
    if !subscription.is_active_at(now) {
        return Err(AppError::InvalidState(
            "customer doesn't have active subscription".to_string(),
        ));
    }
    if subscription.balance.time.remaining() < 0 {
        return Err(AppError::InvalidState(
            "customer doesn't have enough time balance".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct TicketLifecycle {
    ctx: ServiceContext,
    ledger: BalanceLedger,
}

impl TicketLifecycle {
    pub fn new(ctx: ServiceContext, ledger: BalanceLedger) -> Self {
        Self { ctx, ledger }
    }

    /// Applies `target` to `ticket` on behalf of `agent`, persisting every
    /// change. The agent's activity timestamps are refreshed even when the
    /// status does not change.
    #[instrument(skip_all, fields(ticket_id = %ticket.id, agent_id = %agent.id, from = %ticket.status, to = %target))]
    pub async fn transition(
        &self,
        ticket: &mut Ticket,
        agent: &Agent,
        target: TicketStatus,
    ) -> Result<(), AppError> {
        let now = self.ctx.clock.now();
        self.ctx.stores.agents.touch_activity(&agent.id, now).await?;

        if ticket.status == target {
            debug!("Ticket already in requested status");
            return Ok(());
        }

        match target {
            TicketStatus::Open => self.reopen(ticket, now).await?,
            TicketStatus::InProgress => self.start_work(ticket, now).await?,
            TicketStatus::Resolve => self.resolve(ticket, now).await?,
            TicketStatus::Processing | TicketStatus::Cancel | TicketStatus::Closed => {
                debug!("No transition defined for requested status");
                return Ok(());
            }
        }

        info!("Ticket status changed");
        Ok(())
    }

    async fn reopen(&self, ticket: &mut Ticket, now: DateTime<Utc>) -> Result<(), AppError> {
        ticket.status = TicketStatus::Open;
        ticket.updated_at = now;
        self.ctx.stores.tickets.update(ticket).await?;
        self.record(ticket, ACTIVITY_TICKET_OPEN, now).await
    }

    async fn start_work(&self, ticket: &mut Ticket, now: DateTime<Utc>) -> Result<(), AppError> {
        ticket.status = TicketStatus::InProgress;
        ticket.log_time.start_session(now);
        ticket.reminder_sent = false;
        ticket.updated_at = now;
        self.ctx.stores.tickets.update(ticket).await?;
        self.record(ticket, ACTIVITY_TICKET_IN_PROGRESS, now).await
    }

    async fn resolve(&self, ticket: &mut Ticket, now: DateTime<Utc>) -> Result<(), AppError> {
        ticket.status = TicketStatus::Resolve;
        ticket.log_time.close_session(now);
        ticket.reminder_sent = true;
        ticket.token = self.ctx.ids.next_token();
        ticket.updated_at = now;
        self.ctx.stores.tickets.update(ticket).await?;

        self.ledger.debit(ticket).await?;

        let company = self
            .ctx
            .stores
            .companies
            .find_by_id(&ticket.company.id)
            .await?
            .ok_or_else(|| AppError::not_found("company", &ticket.company.id))?;
        let link = notifications::confirm_close_link(&self.ctx.settings, &company, ticket);
        self.ctx
            .queue
            .submit(BackgroundTask::SendEmail(notifications::confirm_close_email(
                ticket, &company, &link,
            )))
            .await;

        self.record(ticket, ACTIVITY_TICKET_RESOLVE, now).await
    }

    async fn record(
        &self,
        ticket: &Ticket,
        activity_type: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let log = TicketTimeLog::snapshot(self.ctx.ids.next_id(), ticket, activity_type, now);
        self.ctx.stores.time_logs.insert(&log).await?;
        Ok(())
    }
}
