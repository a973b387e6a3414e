use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::CustomerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceReferenceType {
    Order,
    Ticket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReference {
    #[serde(rename = "uniqueID")]
    pub unique_id: String,
    #[serde(rename = "type")]
    pub reference_type: BalanceReferenceType,
}

/// Append-only ledger entry; exactly one of `in_seconds`/`out_seconds` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBalanceHistory {
    pub id: String,
    pub customer: CustomerSnapshot,
    #[serde(rename = "in")]
    pub in_seconds: Option<i64>,
    #[serde(rename = "out")]
    pub out_seconds: Option<i64>,
    pub reference: BalanceReference,
    pub created_at: DateTime<Utc>,
}
