//! Persistence gateway.
//!
//! One narrow trait per aggregate so use-cases depend only on what they
//! touch. Lookups return `Ok(None)` for absent rows; updates that match
//! nothing return [`StoreError::Missing`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Agent, Attachment, Company, CompanySnapshot, Customer, CustomerBalanceHistory, Order, Ticket,
    TicketComment, TicketStatus, TicketTimeLog,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} does not exist")]
    Missing(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub id: Option<String>,
    pub company_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<TicketStatus>,
    pub include_deleted: bool,
}

impl TicketFilter {
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn in_company(mut self, company_id: &str) -> Self {
        self.company_id = Some(company_id.to_string());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub id: Option<String>,
    pub company_id: Option<String>,
    pub include_deleted: bool,
}

impl AgentFilter {
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub id: Option<String>,
    pub company_id: Option<String>,
    pub include_deleted: bool,
}

impl CustomerFilter {
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentFilter {
    pub ids: Option<Vec<String>>,
    pub company_id: Option<String>,
    pub is_used: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BalanceHistoryFilter {
    pub customer_id: Option<String>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub id: Option<String>,
    pub company_id: Option<String>,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>>;

    /// Saves the ticket but keeps the stored company snapshot, which only
    /// [`TicketStore::update_company_snapshot`] writes.
    async fn update(&self, ticket: &Ticket) -> StoreResult<()>;

    /// Rewrites the embedded company snapshot on every ticket of that
    /// company. Returns the number of tickets touched.
    async fn update_company_snapshot(&self, company: &CompanySnapshot) -> StoreResult<u64>;
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn find_one(&self, filter: &AgentFilter) -> StoreResult<Option<Agent>>;

    /// Sets both `updated_at` and `last_activity_at`.
    async fn touch_activity(&self, agent_id: &str, now: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Company>>;

    async fn update(&self, company: &Company) -> StoreResult<()>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_one(&self, filter: &CustomerFilter) -> StoreResult<Option<Customer>>;

    async fn update(&self, customer: &Customer) -> StoreResult<()>;

    /// Adds `seconds` to the time balance's `used` counter in one write and
    /// returns the new value.
    async fn add_time_balance_used(
        &self,
        customer_id: &str,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<i64>;

    /// Same as [`CustomerStore::add_time_balance_used`] for `total`.
    async fn add_time_balance_total(
        &self,
        customer_id: &str,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<i64>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert(&self, comment: &TicketComment) -> StoreResult<()>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait TimeLogStore: Send + Sync {
    async fn insert(&self, log: &TicketTimeLog) -> StoreResult<()>;

    /// Most recently created row for the ticket.
    async fn latest_for_ticket(&self, ticket_id: &str) -> StoreResult<Option<TicketTimeLog>>;

    async fn update(&self, log: &TicketTimeLog) -> StoreResult<()>;
}

#[async_trait]
pub trait BalanceHistoryStore: Send + Sync {
    async fn insert(&self, entry: &CustomerBalanceHistory) -> StoreResult<()>;

    async fn find(&self, filter: &BalanceHistoryFilter)
        -> StoreResult<Vec<CustomerBalanceHistory>>;
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn find(&self, filter: &AttachmentFilter) -> StoreResult<Vec<Attachment>>;

    async fn mark_used(&self, ids: &[String]) -> StoreResult<u64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_one(&self, filter: &OrderFilter) -> StoreResult<Option<Order>>;

    async fn update(&self, order: &Order) -> StoreResult<()>;
}

/// Every store the services need, usually all backed by the same value.
#[derive(Clone)]
pub struct Stores {
    pub tickets: Arc<dyn TicketStore>,
    pub agents: Arc<dyn AgentStore>,
    pub companies: Arc<dyn CompanyStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub comments: Arc<dyn CommentStore>,
    pub time_logs: Arc<dyn TimeLogStore>,
    pub balance_histories: Arc<dyn BalanceHistoryStore>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: TicketStore
            + AgentStore
            + CompanyStore
            + CustomerStore
            + CommentStore
            + TimeLogStore
            + BalanceHistoryStore
            + AttachmentStore
            + OrderStore
            + 'static,
    {
        Self {
            tickets: backend.clone(),
            agents: backend.clone(),
            companies: backend.clone(),
            customers: backend.clone(),
            comments: backend.clone(),
            time_logs: backend.clone(),
            balance_histories: backend.clone(),
            attachments: backend.clone(),
            orders: backend,
        }
    }
}
