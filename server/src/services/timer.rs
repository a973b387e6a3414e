use tracing::{info, instrument};

use super::background::BackgroundTask;
use super::notifications;
use super::ServiceContext;
use crate::models::time_log::ACTIVITY_RESUME_LOG;
use crate::models::{Ticket, TicketTimeLog};
use crate::store::TicketFilter;
use crate::utils::error::AppError;

/// Pause/resume of a ticket's running work session.
#[derive(Clone)]
pub struct TicketTimer {
    ctx: ServiceContext,
}

impl TicketTimer {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    async fn load_ticket(&self, ticket_id: &str) -> Result<Ticket, AppError> {
        self.ctx
            .stores
            .tickets
            .find_one(&TicketFilter::by_id(ticket_id))
            .await?
            .ok_or_else(|| AppError::not_found("ticket", ticket_id))
    }

    /// Pauses the timer and closes out the ticket's latest time-log row.
    #[instrument(skip(self))]
    pub async fn pause(&self, ticket_id: &str) -> Result<Ticket, AppError> {
        let _guard = self.ctx.locks.lock(ticket_id).await;
        let mut ticket = self.load_ticket(ticket_id).await?;
        let now = self.ctx.clock.now();

        ticket.log_time.pause(now)?;

        let mut latest = self
            .ctx
            .stores
            .time_logs
            .latest_for_ticket(&ticket.id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("no time log found for ticket '{}'", ticket.id))
            })?;

        ticket.updated_at = now;
        self.ctx.stores.tickets.update(&ticket).await?;

        latest.close(now);
        self.ctx.stores.time_logs.update(&latest).await?;

        self.ctx
            .queue
            .submit(BackgroundTask::SendEmail(notifications::timer_email(
                &ticket,
            )))
            .await;

        info!(
            duration = ticket.log_time.duration_in_seconds,
            "Ticket timer paused"
        );
        Ok(ticket)
    }

    /// Resumes the timer and opens a fresh measurement row.
    #[instrument(skip(self))]
    pub async fn resume(&self, ticket_id: &str) -> Result<Ticket, AppError> {
        let _guard = self.ctx.locks.lock(ticket_id).await;
        let mut ticket = self.load_ticket(ticket_id).await?;
        let now = self.ctx.clock.now();

        ticket.log_time.resume(now)?;
        ticket.updated_at = now;
        self.ctx.stores.tickets.update(&ticket).await?;

        let log =
            TicketTimeLog::interval_start(self.ctx.ids.next_id(), &ticket, ACTIVITY_RESUME_LOG, now);
        self.ctx.stores.time_logs.insert(&log).await?;

        self.ctx
            .queue
            .submit(BackgroundTask::SendEmail(notifications::timer_email(
                &ticket,
            )))
            .await;

        info!(
            paused = ticket.log_time.pause_duration_in_seconds,
            "Ticket timer resumed"
        );
        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogTimeStatus, TicketStatus};
    use crate::services::clock::Clock;
    use crate::services::fixtures::Harness;

    async fn started(harness: &Harness) -> Ticket {
        let (mut ticket, agent) = harness.seed_ticket(TicketStatus::Open);
        harness
            .lifecycle()
            .transition(&mut ticket, &agent, TicketStatus::InProgress)
            .await
            .unwrap();
        ticket
    }

    #[tokio::test]
    async fn test_pause_closes_latest_time_log() {
        let mut harness = Harness::new();
        let ticket = started(&harness).await;
        harness.clock.advance(90);

        let paused = harness.timer().pause(&ticket.id).await.unwrap();

        assert_eq!(paused.log_time.status, LogTimeStatus::Paused);
        assert_eq!(paused.log_time.duration_in_seconds, 90);
        assert_eq!(paused.log_time.pause_history.len(), 1);

        let logs = harness.store.time_logs_for(&ticket.id);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].end_at, Some(harness.clock.now()));
        assert_eq!(logs[0].duration_in_seconds, 90);

        assert_eq!(harness.drain_emails().len(), 1);
    }

    #[tokio::test]
    async fn test_pause_without_time_log_is_not_found() {
        let harness = Harness::new();
        let (mut ticket, _) = harness.seed_ticket(TicketStatus::InProgress);
        ticket.log_time.start_session(harness.clock.now());
        harness.store.put_ticket(ticket.clone());

        let err = harness.timer().pause(&ticket.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let stored = harness.store.ticket(&ticket.id).unwrap();
        assert_eq!(stored.log_time.status, LogTimeStatus::Running);
    }

    #[tokio::test]
    async fn test_pause_unknown_ticket_is_not_found() {
        let harness = Harness::new();
        let err = harness.timer().pause("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pause_twice_is_invalid_state() {
        let harness = Harness::new();
        let ticket = started(&harness).await;
        harness.clock.advance(10);
        harness.timer().pause(&ticket.id).await.unwrap();

        let err = harness.timer().pause(&ticket.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_resume_opens_resume_log() {
        let harness = Harness::new();
        let ticket = started(&harness).await;
        harness.clock.advance(30);
        harness.timer().pause(&ticket.id).await.unwrap();
        harness.clock.advance(45);

        let resumed = harness.timer().resume(&ticket.id).await.unwrap();

        assert_eq!(resumed.log_time.status, LogTimeStatus::Running);
        assert_eq!(resumed.log_time.pause_duration_in_seconds, 45);
        assert_eq!(
            resumed.log_time.pause_history[0].resumed_at,
            Some(harness.clock.now())
        );

        let logs = harness.store.time_logs_for(&ticket.id);
        let resume_log = logs.last().unwrap();
        assert_eq!(resume_log.activity_type, ACTIVITY_RESUME_LOG);
        assert_eq!(resume_log.start_at, Some(harness.clock.now()));
        assert_eq!(resume_log.duration_in_seconds, 0);
        assert_eq!(resume_log.pause_duration_in_seconds, 0);
    }

    #[tokio::test]
    async fn test_immediate_resume_fails_and_keeps_pause_duration() {
        let harness = Harness::new();
        let ticket = started(&harness).await;
        harness.clock.advance(30);
        harness.timer().pause(&ticket.id).await.unwrap();

        let err = harness.timer().resume(&ticket.id).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        let stored = harness.store.ticket(&ticket.id).unwrap();
        assert_eq!(stored.log_time.pause_duration_in_seconds, 0);
        assert_eq!(stored.log_time.status, LogTimeStatus::Paused);
        assert_eq!(harness.store.time_logs_for(&ticket.id).len(), 1);
    }

    #[tokio::test]
    async fn test_immediate_resume_after_second_pause_fails() {
        let harness = Harness::new();
        let ticket = started(&harness).await;
        let timer = harness.timer();
        harness.clock.advance(10);
        timer.pause(&ticket.id).await.unwrap();
        harness.clock.advance(5);
        timer.resume(&ticket.id).await.unwrap();
        harness.clock.advance(10);
        timer.pause(&ticket.id).await.unwrap();

        let err = timer.resume(&ticket.id).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        let stored = harness.store.ticket(&ticket.id).unwrap();
        assert_eq!(stored.log_time.status, LogTimeStatus::Paused);
        assert_eq!(stored.log_time.pause_duration_in_seconds, 5);
    }

    #[tokio::test]
    async fn test_resume_running_timer_is_invalid_state() {
        let harness = Harness::new();
        let ticket = started(&harness).await;
        let err = harness.timer().resume(&ticket.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_pause_resume_then_resolve_accrues_exactly() {
        let harness = Harness::new();
        let (mut ticket, agent) = harness.seed_ticket(TicketStatus::Open);
        let lifecycle = harness.lifecycle();
        let timer = harness.timer();

        lifecycle
            .transition(&mut ticket, &agent, TicketStatus::InProgress)
            .await
            .unwrap();
        harness.clock.advance(120);
        timer.pause(&ticket.id).await.unwrap();
        harness.clock.advance(40);
        timer.resume(&ticket.id).await.unwrap();
        harness.clock.advance(60);
        timer.pause(&ticket.id).await.unwrap();
        harness.clock.advance(15);
        timer.resume(&ticket.id).await.unwrap();
        harness.clock.advance(5);

        let mut ticket = harness.store.ticket(&ticket.id).unwrap();
        lifecycle
            .transition(&mut ticket, &agent, TicketStatus::Resolve)
            .await
            .unwrap();

        let stored = harness.store.ticket(&ticket.id).unwrap();
        assert_eq!(stored.log_time.duration_in_seconds, 120 + 60 + 5);
        assert_eq!(stored.log_time.pause_duration_in_seconds, 40 + 15);
        assert_eq!(stored.log_time.total_paused_duration_in_seconds, 55);
    }
}
