use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::company::CompanySnapshot;
use super::customer::CustomerSnapshot;
use super::ticket::{LogTimeStatus, Ticket, TicketSnapshot};

pub const ACTIVITY_TICKET_OPEN: &str = "ticket open";
pub const ACTIVITY_TICKET_IN_PROGRESS: &str = "ticket in progress";
pub const ACTIVITY_TICKET_RESOLVE: &str = "ticket resolve";
pub const ACTIVITY_RESUME_LOG: &str = "resume log";

/// Write-only audit row. The latest row per ticket is closed out when the
/// timer pauses; nothing else reads these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTimeLog {
    pub id: String,
    pub company: CompanySnapshot,
    pub customer: CustomerSnapshot,
    pub ticket: TicketSnapshot,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub duration_in_seconds: i64,
    pub pause_duration_in_seconds: i64,
    pub total_duration_in_seconds: i64,
    pub total_paused_duration_in_seconds: i64,
    pub log_status: LogTimeStatus,
    pub activity_type: String,
    pub created_at: DateTime<Utc>,
}

impl TicketTimeLog {
    /// Copies the ticket's current timer state.
    pub fn snapshot(
        id: String,
        ticket: &Ticket,
        activity_type: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let log_time = &ticket.log_time;
        Self {
            id,
            company: ticket.company.clone(),
            customer: ticket.customer.clone(),
            ticket: TicketSnapshot::from(ticket),
            start_at: log_time.start_at,
            end_at: log_time.end_at,
            duration_in_seconds: log_time.duration_in_seconds,
            pause_duration_in_seconds: log_time.pause_duration_in_seconds,
            total_duration_in_seconds: log_time.total_duration_in_seconds,
            total_paused_duration_in_seconds: log_time.total_paused_duration_in_seconds,
            log_status: log_time.status,
            activity_type: activity_type.to_string(),
            created_at: now,
        }
    }

    /// A fresh measurement interval starting at `now` with zeroed durations.
    pub fn interval_start(
        id: String,
        ticket: &Ticket,
        activity_type: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            start_at: Some(now),
            end_at: None,
            duration_in_seconds: 0,
            pause_duration_in_seconds: 0,
            total_duration_in_seconds: 0,
            total_paused_duration_in_seconds: 0,
            ..Self::snapshot(id, ticket, activity_type, now)
        }
    }

    pub fn close(&mut self, now: DateTime<Utc>) {
        self.end_at = Some(now);
        self.duration_in_seconds = self
            .start_at
            .map(|start_at| (now - start_at).num_seconds())
            .unwrap_or(0);
    }
}
