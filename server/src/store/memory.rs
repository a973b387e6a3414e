//! In-memory backend for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{
    AgentFilter, AgentStore, AttachmentFilter, AttachmentStore, BalanceHistoryFilter,
    BalanceHistoryStore, CommentStore, CompanyStore, CustomerFilter, CustomerStore, OrderFilter,
    OrderStore, StoreError, StoreResult, TicketFilter, TicketStore, TimeLogStore,
};
use crate::models::{
    Agent, Attachment, Company, CompanySnapshot, Customer, CustomerBalanceHistory, Order, Ticket,
    TicketComment, TicketTimeLog,
};

#[derive(Default)]
pub struct MemoryStore {
    tickets: RwLock<HashMap<String, Ticket>>,
    agents: RwLock<HashMap<String, Agent>>,
    companies: RwLock<HashMap<String, Company>>,
    customers: RwLock<HashMap<String, Customer>>,
    comments: RwLock<Vec<TicketComment>>,
    time_logs: RwLock<Vec<TicketTimeLog>>,
    balance_histories: RwLock<Vec<CustomerBalanceHistory>>,
    attachments: RwLock<HashMap<String, Attachment>>,
    orders: RwLock<HashMap<String, Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_ticket(&self, ticket: Ticket) {
        self.tickets.write().insert(ticket.id.clone(), ticket);
    }

    pub fn put_agent(&self, agent: Agent) {
        self.agents.write().insert(agent.id.clone(), agent);
    }

    pub fn put_company(&self, company: Company) {
        self.companies.write().insert(company.id.clone(), company);
    }

    pub fn put_customer(&self, customer: Customer) {
        self.customers.write().insert(customer.id.clone(), customer);
    }

    pub fn put_attachment(&self, attachment: Attachment) {
        self.attachments
            .write()
            .insert(attachment.id.clone(), attachment);
    }

    pub fn put_order(&self, order: Order) {
        self.orders.write().insert(order.id.clone(), order);
    }

    pub fn put_time_log(&self, log: TicketTimeLog) {
        self.time_logs.write().push(log);
    }

    pub fn ticket(&self, id: &str) -> Option<Ticket> {
        self.tickets.read().get(id).cloned()
    }

    pub fn agent(&self, id: &str) -> Option<Agent> {
        self.agents.read().get(id).cloned()
    }

    pub fn customer(&self, id: &str) -> Option<Customer> {
        self.customers.read().get(id).cloned()
    }

    pub fn attachment(&self, id: &str) -> Option<Attachment> {
        self.attachments.read().get(id).cloned()
    }

    pub fn order(&self, id: &str) -> Option<Order> {
        self.orders.read().get(id).cloned()
    }

    pub fn comments(&self) -> Vec<TicketComment> {
        self.comments.read().clone()
    }

    pub fn time_logs_for(&self, ticket_id: &str) -> Vec<TicketTimeLog> {
        self.time_logs
            .read()
            .iter()
            .filter(|log| log.ticket.id == ticket_id)
            .cloned()
            .collect()
    }

    pub fn balance_histories(&self) -> Vec<CustomerBalanceHistory> {
        self.balance_histories.read().clone()
    }
}

fn matches(expected: &Option<String>, actual: &str) -> bool {
    expected.as_deref().map_or(true, |value| value == actual)
}

fn not_deleted(include_deleted: bool, deleted_at: &Option<DateTime<Utc>>) -> bool {
    include_deleted || deleted_at.is_none()
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>> {
        Ok(self
            .tickets
            .read()
            .values()
            .find(|ticket| {
                matches(&filter.id, &ticket.id)
                    && matches(&filter.company_id, &ticket.company.id)
                    && matches(&filter.customer_id, &ticket.customer.id)
                    && filter.status.map_or(true, |status| status == ticket.status)
                    && not_deleted(filter.include_deleted, &ticket.deleted_at)
            })
            .cloned())
    }

    async fn update(&self, ticket: &Ticket) -> StoreResult<()> {
        let mut tickets = self.tickets.write();
        let slot = tickets
            .get_mut(&ticket.id)
            .ok_or_else(|| StoreError::Missing(format!("ticket {}", ticket.id)))?;
        let company = slot.company.clone();
        *slot = Ticket {
            company,
            ..ticket.clone()
        };
        Ok(())
    }

    async fn update_company_snapshot(&self, company: &CompanySnapshot) -> StoreResult<u64> {
        let mut touched = 0;
        for ticket in self.tickets.write().values_mut() {
            if ticket.company.id == company.id {
                ticket.company = company.clone();
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn find_one(&self, filter: &AgentFilter) -> StoreResult<Option<Agent>> {
        Ok(self
            .agents
            .read()
            .values()
            .find(|agent| {
                matches(&filter.id, &agent.id)
                    && matches(&filter.company_id, &agent.company_id)
                    && not_deleted(filter.include_deleted, &agent.deleted_at)
            })
            .cloned())
    }

    async fn touch_activity(&self, agent_id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| StoreError::Missing(format!("agent {}", agent_id)))?;
        agent.updated_at = now;
        agent.last_activity_at = Some(now);
        Ok(())
    }
}

#[async_trait]
impl CompanyStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Company>> {
        Ok(self
            .companies
            .read()
            .get(id)
            .filter(|company| company.deleted_at.is_none())
            .cloned())
    }

    async fn update(&self, company: &Company) -> StoreResult<()> {
        let mut companies = self.companies.write();
        let slot = companies
            .get_mut(&company.id)
            .ok_or_else(|| StoreError::Missing(format!("company {}", company.id)))?;
        *slot = company.clone();
        Ok(())
    }
}

impl MemoryStore {
    fn with_customer<F, R>(&self, customer_id: &str, apply: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Customer) -> R,
    {
        let mut customers = self.customers.write();
        let customer = customers
            .get_mut(customer_id)
            .ok_or_else(|| StoreError::Missing(format!("customer {}", customer_id)))?;
        Ok(apply(customer))
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn find_one(&self, filter: &CustomerFilter) -> StoreResult<Option<Customer>> {
        Ok(self
            .customers
            .read()
            .values()
            .find(|customer| {
                matches(&filter.id, &customer.id)
                    && matches(&filter.company_id, &customer.company_id)
                    && not_deleted(filter.include_deleted, &customer.deleted_at)
            })
            .cloned())
    }

    async fn update(&self, customer: &Customer) -> StoreResult<()> {
        self.with_customer(&customer.id, |slot| *slot = customer.clone())
    }

    async fn add_time_balance_used(
        &self,
        customer_id: &str,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<i64> {
        self.with_customer(customer_id, |customer| {
            customer.updated_at = now;
            customer.subscription.balance.time.used += seconds;
            customer.subscription.balance.time.used
        })
    }

    async fn add_time_balance_total(
        &self,
        customer_id: &str,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<i64> {
        self.with_customer(customer_id, |customer| {
            customer.updated_at = now;
            customer.subscription.balance.time.total += seconds;
            customer.subscription.balance.time.total
        })
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert(&self, comment: &TicketComment) -> StoreResult<()> {
        self.comments.write().push(comment.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut comments = self.comments.write();
        let before = comments.len();
        comments.retain(|comment| comment.id != id);
        if comments.len() == before {
            return Err(StoreError::Missing(format!("comment {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TimeLogStore for MemoryStore {
    async fn insert(&self, log: &TicketTimeLog) -> StoreResult<()> {
        self.time_logs.write().push(log.clone());
        Ok(())
    }

    async fn latest_for_ticket(&self, ticket_id: &str) -> StoreResult<Option<TicketTimeLog>> {
        // Later inserts win ties on created_at.
        Ok(self
            .time_logs
            .read()
            .iter()
            .filter(|log| log.ticket.id == ticket_id)
            .fold(None::<&TicketTimeLog>, |latest, log| match latest {
                Some(current) if current.created_at > log.created_at => Some(current),
                _ => Some(log),
            })
            .cloned())
    }

    async fn update(&self, log: &TicketTimeLog) -> StoreResult<()> {
        let mut logs = self.time_logs.write();
        let slot = logs
            .iter_mut()
            .find(|existing| existing.id == log.id)
            .ok_or_else(|| StoreError::Missing(format!("ticket time log {}", log.id)))?;
        *slot = log.clone();
        Ok(())
    }
}

#[async_trait]
impl BalanceHistoryStore for MemoryStore {
    async fn insert(&self, entry: &CustomerBalanceHistory) -> StoreResult<()> {
        self.balance_histories.write().push(entry.clone());
        Ok(())
    }

    async fn find(
        &self,
        filter: &BalanceHistoryFilter,
    ) -> StoreResult<Vec<CustomerBalanceHistory>> {
        Ok(self
            .balance_histories
            .read()
            .iter()
            .filter(|entry| {
                matches(&filter.customer_id, &entry.customer.id)
                    && matches(&filter.reference_id, &entry.reference.unique_id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn find(&self, filter: &AttachmentFilter) -> StoreResult<Vec<Attachment>> {
        Ok(self
            .attachments
            .read()
            .values()
            .filter(|attachment| {
                filter
                    .ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&attachment.id))
                    && matches(&filter.company_id, &attachment.company_id)
                    && filter.is_used.map_or(true, |used| used == attachment.is_used)
            })
            .cloned()
            .collect())
    }

    async fn mark_used(&self, ids: &[String]) -> StoreResult<u64> {
        let mut touched = 0;
        let mut attachments = self.attachments.write();
        for id in ids {
            if let Some(attachment) = attachments.get_mut(id) {
                attachment.is_used = true;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_one(&self, filter: &OrderFilter) -> StoreResult<Option<Order>> {
        Ok(self
            .orders
            .read()
            .values()
            .find(|order| {
                matches(&filter.id, &order.id) && matches(&filter.company_id, &order.company_id)
            })
            .cloned())
    }

    async fn update(&self, order: &Order) -> StoreResult<()> {
        let mut orders = self.orders.write();
        let slot = orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::Missing(format!("order {}", order.id)))?;
        *slot = order.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use chrono::Duration;

    #[tokio::test]
    async fn test_ticket_filter_scopes_company_and_soft_delete() {
        let store = MemoryStore::new();
        let mut ticket = fixtures::ticket("t1", &fixtures::company("c1"), "cu1");
        store.put_ticket(ticket.clone());

        let found = TicketStore::find_one(&store, &TicketFilter::by_id("t1").in_company("c1"))
            .await
            .unwrap();
        assert!(found.is_some());

        let other = TicketStore::find_one(&store, &TicketFilter::by_id("t1").in_company("c2"))
            .await
            .unwrap();
        assert!(other.is_none());

        ticket.deleted_at = Some(Utc::now());
        store.put_ticket(ticket);
        let deleted = TicketStore::find_one(&store, &TicketFilter::by_id("t1"))
            .await
            .unwrap();
        assert!(deleted.is_none());
    }

    #[tokio::test]
    async fn test_latest_time_log_by_created_at() {
        let store = MemoryStore::new();
        let company = fixtures::company("c1");
        let ticket = fixtures::ticket("t1", &company, "cu1");
        let now = Utc::now();

        let newer = TicketTimeLog::snapshot("l2".into(), &ticket, "ticket in progress", now);
        let older = TicketTimeLog::snapshot(
            "l1".into(),
            &ticket,
            "ticket open",
            now - Duration::seconds(30),
        );
        store.put_time_log(newer);
        store.put_time_log(older);

        let latest = store.latest_for_ticket("t1").await.unwrap().unwrap();
        assert_eq!(latest.id, "l2");
        assert!(store.latest_for_ticket("t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_row_fails() {
        let store = MemoryStore::new();
        let ticket = fixtures::ticket("t1", &fixtures::company("c1"), "cu1");
        let err = TicketStore::update(&store, &ticket).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn test_company_snapshot_propagates_to_company_tickets_only() {
        let store = MemoryStore::new();
        let company = fixtures::company("c1");
        store.put_ticket(fixtures::ticket("t1", &company, "cu1"));
        store.put_ticket(fixtures::ticket("t2", &fixtures::company("c2"), "cu2"));

        let mut renamed = company.snapshot();
        renamed.name = "Renamed".into();
        let touched = store.update_company_snapshot(&renamed).await.unwrap();

        assert_eq!(touched, 1);
        assert_eq!(store.ticket("t1").unwrap().company.name, "Renamed");
        assert_ne!(store.ticket("t2").unwrap().company.name, "Renamed");
    }

    #[tokio::test]
    async fn test_time_balance_increments_accumulate() {
        let store = MemoryStore::new();
        store.put_customer(fixtures::customer("cu1", "c1"));
        let now = Utc::now();

        assert_eq!(store.add_time_balance_used("cu1", 300, now).await.unwrap(), 300);
        assert_eq!(store.add_time_balance_used("cu1", 200, now).await.unwrap(), 500);
        assert_eq!(store.add_time_balance_total("cu1", 3600, now).await.unwrap(), 3600);

        let err = store.add_time_balance_used("ghost", 1, now).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn test_ticket_update_keeps_stored_company_snapshot() {
        let store = MemoryStore::new();
        let company = fixtures::company("c1");
        let mut stale = fixtures::ticket("t1", &company, "cu1");
        store.put_ticket(stale.clone());

        let mut renamed = company.snapshot();
        renamed.name = "Renamed".into();
        store.update_company_snapshot(&renamed).await.unwrap();

        stale.subject = "Printer on fire".into();
        TicketStore::update(&store, &stale).await.unwrap();

        let stored = store.ticket("t1").unwrap();
        assert_eq!(stored.subject, "Printer on fire");
        assert_eq!(stored.company.name, "Renamed");
    }
}
