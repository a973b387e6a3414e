use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::agent::AgentSnapshot;
use super::company::CompanySnapshot;
use super::customer::CustomerSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    /// Declared for compatibility with stored documents, never entered by transitions.
    Processing,
    Resolve,
    Cancel,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Processing => "processing",
            TicketStatus::Resolve => "resolve",
            TicketStatus::Cancel => "cancel",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(TicketStatus::Open),
            "in_progress" => Some(TicketStatus::InProgress),
            "processing" => Some(TicketStatus::Processing),
            "resolve" => Some(TicketStatus::Resolve),
            "cancel" => Some(TicketStatus::Cancel),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTimeStatus {
    #[default]
    NotStarted,
    Paused,
    Running,
    Done,
}

impl LogTimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTimeStatus::NotStarted => "not_started",
            LogTimeStatus::Paused => "paused",
            LogTimeStatus::Running => "running",
            LogTimeStatus::Done => "done",
        }
    }
}

/// One pause interval. `resumed_at == None` means the timer is still paused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseHistory {
    pub paused_at: DateTime<Utc>,
    pub resumed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("ticket timer is not running")]
    NotRunning,

    #[error("ticket timer is not paused")]
    NotPaused,

    #[error("ticket timer has no pause history")]
    NoPauseHistory,

    #[error("ticket timer already resumed")]
    AlreadyResumed,

    #[error("pause duration is invalid")]
    InvalidPauseDuration,
}

/// Work-session timer embedded in a ticket.
///
/// `duration_in_seconds` and `pause_duration_in_seconds` describe the current
/// session only; the `total_*` fields accumulate across sessions and are
/// never reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogTime {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub duration_in_seconds: i64,
    pub pause_duration_in_seconds: i64,
    pub total_duration_in_seconds: i64,
    pub total_paused_duration_in_seconds: i64,
    pub status: LogTimeStatus,
    pub pause_history: Vec<PauseHistory>,
}

impl LogTime {
    pub fn start_session(&mut self, now: DateTime<Utc>) {
        self.start_at = Some(now);
        self.end_at = None;
        self.status = LogTimeStatus::Running;
        self.duration_in_seconds = 0;
        self.pause_duration_in_seconds = 0;
        self.pause_history.clear();
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.status != LogTimeStatus::Running {
            return Err(TimerError::NotRunning);
        }

        self.accrue_running(now);
        self.pause_history.push(PauseHistory {
            paused_at: now,
            resumed_at: None,
        });
        self.status = LogTimeStatus::Paused;
        Ok(())
    }

    /// Leaves the timer untouched when any precondition fails.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.status != LogTimeStatus::Paused {
            return Err(TimerError::NotPaused);
        }

        let last = self
            .pause_history
            .last_mut()
            .ok_or(TimerError::NoPauseHistory)?;
        if last.resumed_at.is_some() {
            return Err(TimerError::AlreadyResumed);
        }

        // The pause being closed must itself last at least a second.
        let paused_for = seconds_between(last.paused_at, now);
        if paused_for < 1 {
            return Err(TimerError::InvalidPauseDuration);
        }

        last.resumed_at = Some(now);
        self.pause_duration_in_seconds += paused_for;
        self.status = LogTimeStatus::Running;
        Ok(())
    }

    /// Closes the session and folds it into the lifetime totals.
    pub fn close_session(&mut self, now: DateTime<Utc>) {
        self.end_at = Some(now);
        self.accrue_running(now);
        self.total_duration_in_seconds += self.duration_in_seconds;
        self.total_paused_duration_in_seconds += self.pause_duration_in_seconds;
        self.status = LogTimeStatus::Done;
    }

    pub fn open_pause(&self) -> Option<&PauseHistory> {
        self.pause_history
            .last()
            .filter(|entry| entry.resumed_at.is_none())
    }

    // A pause that is still open contributes nothing: the time since it
    // started is paused time, not running time.
    fn accrue_running(&mut self, now: DateTime<Utc>) {
        match self.pause_history.last() {
            None => {
                self.duration_in_seconds = self
                    .start_at
                    .map(|start| seconds_between(start, now))
                    .unwrap_or(0);
            }
            Some(PauseHistory {
                resumed_at: Some(resumed_at),
                ..
            }) => {
                self.duration_in_seconds += seconds_between(*resumed_at, now);
            }
            Some(_) => {}
        }
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySnapshot {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub code: String,
    pub subject: String,
    pub content: String,
    pub company: CompanySnapshot,
    pub customer: CustomerSnapshot,
    pub project: Option<ProjectSnapshot>,
    pub category: Option<CategorySnapshot>,
    /// Populated only for B2C companies.
    #[serde(default)]
    pub agents: Vec<AgentSnapshot>,
    pub status: TicketStatus,
    #[serde(default)]
    pub log_time: LogTime,
    #[serde(default)]
    pub reminder_sent: bool,
    #[serde(default)]
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_assigned_to(&self, agent_id: &str) -> bool {
        self.agents.iter().any(|agent| agent.id == agent_id)
    }
}

/// Compact ticket reference embedded in audit rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSnapshot {
    pub id: String,
    pub code: String,
    pub subject: String,
    pub status: TicketStatus,
}

impl From<&Ticket> for TicketSnapshot {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id.clone(),
            code: ticket.code.clone(),
            subject: ticket.subject.clone(),
            status: ticket.status,
        }
    }
}
