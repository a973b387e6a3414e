use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::AttachmentSnapshot;
use super::ticket::TicketStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Agent,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSender {
    pub id: String,
    pub name: String,
    pub email: String,
    pub sender_type: SenderType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketComment {
    pub id: String,
    pub ticket_id: String,
    pub company_id: String,
    pub sender: CommentSender,
    pub content: String,
    pub attachments: Vec<AttachmentSnapshot>,
    /// Status requested alongside the comment.
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}
