//! Fire-and-forget side effects.
//!
//! Use-cases submit [`BackgroundTask`]s to a bounded queue; a single worker
//! drains it. Failures are logged and never reach the request that submitted
//! the task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::CompanySnapshot;
use crate::store::Stores;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundTask {
    SendEmail(Email),
    MarkAttachmentsUsed { ids: Vec<String> },
    /// Rewrites the embedded company snapshot on child documents.
    /// Safe to run more than once for the same company.
    PropagateCompanySnapshot(CompanySnapshot),
}

impl BackgroundTask {
    fn kind(&self) -> &'static str {
        match self {
            BackgroundTask::SendEmail(_) => "send_email",
            BackgroundTask::MarkAttachmentsUsed { .. } => "mark_attachments_used",
            BackgroundTask::PropagateCompanySnapshot(_) => "propagate_company_snapshot",
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "Email dispatched");
        debug!(body = %email.body, "Email body");
        Ok(())
    }
}

/// What `submit` does when the queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new task and count it.
    #[default]
    Reject,
    /// Wait for capacity.
    Block,
}

impl OverflowPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "reject" => Some(OverflowPolicy::Reject),
            "block" => Some(OverflowPolicy::Block),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct BackgroundQueue {
    sender: mpsc::Sender<BackgroundTask>,
    policy: OverflowPolicy,
    dropped: Arc<AtomicU64>,
}

impl BackgroundQueue {
    pub fn channel(
        capacity: usize,
        policy: OverflowPolicy,
    ) -> (Self, mpsc::Receiver<BackgroundTask>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queue = Self {
            sender,
            policy,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (queue, receiver)
    }

    /// Returns whether the task was queued.
    pub async fn submit(&self, task: BackgroundTask) -> bool {
        let kind = task.kind();
        let queued = match self.policy {
            OverflowPolicy::Reject => match self.sender.try_send(task) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(task = kind, "Background queue full, task dropped");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(task = kind, "Background queue closed, task dropped");
                    false
                }
            },
            OverflowPolicy::Block => match self.sender.send(task).await {
                Ok(()) => true,
                Err(_) => {
                    warn!(task = kind, "Background queue closed, task dropped");
                    false
                }
            },
        };

        if !queued {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queued
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct BackgroundWorker {
    receiver: mpsc::Receiver<BackgroundTask>,
    stores: Stores,
    mailer: Arc<dyn Mailer>,
}

impl BackgroundWorker {
    pub fn new(
        receiver: mpsc::Receiver<BackgroundTask>,
        stores: Stores,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            receiver,
            stores,
            mailer,
        }
    }

    /// Runs until every queue handle has been dropped.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!("Background worker started");
        while let Some(task) = self.receiver.recv().await {
            self.handle(task).await;
        }
        info!("Background worker stopped");
    }

    pub async fn handle(&self, task: BackgroundTask) {
        match task {
            BackgroundTask::SendEmail(email) => {
                if let Err(e) = self.mailer.send(&email).await {
                    error!(error = %e, to = %email.to, "Failed to send email");
                }
            }
            BackgroundTask::MarkAttachmentsUsed { ids } => {
                match self.stores.attachments.mark_used(&ids).await {
                    Ok(touched) => debug!(touched, "Attachments marked as used"),
                    Err(e) => error!(error = %e, ?ids, "Failed to mark attachments as used"),
                }
            }
            BackgroundTask::PropagateCompanySnapshot(company) => {
                match self.stores.tickets.update_company_snapshot(&company).await {
                    Ok(touched) => {
                        info!(company_id = %company.id, touched, "Company snapshot propagated")
                    }
                    Err(e) => {
                        error!(error = %e, company_id = %company.id, "Failed to propagate company snapshot")
                    }
                }
            }
        }
    }
}
