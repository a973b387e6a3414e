//! Postgres backend.
//!
//! Each aggregate is stored whole as a JSONB `doc` next to the key columns
//! the filters use. Key columns are rewritten together with the document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgQueryResult};
use sqlx::types::Json;

use super::{
    AgentFilter, AgentStore, AttachmentFilter, AttachmentStore, BalanceHistoryFilter,
    BalanceHistoryStore, CommentStore, CompanyStore, CustomerFilter, CustomerStore, OrderFilter,
    OrderStore, StoreError, StoreResult, TicketFilter, TicketStore, TimeLogStore,
};
use crate::config::Config;
use crate::models::{
    Agent, Attachment, Company, CompanySnapshot, Customer, CustomerBalanceHistory, Order, Ticket,
    TicketComment, TicketTimeLog,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &Config) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

fn expect_row(result: PgQueryResult, what: impl FnOnce() -> String) -> StoreResult<()> {
    if result.rows_affected() == 0 {
        return Err(StoreError::Missing(what()));
    }
    Ok(())
}

#[async_trait]
impl TicketStore for PgStore {
    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query_scalar::<_, Json<Ticket>>(
            r#"
            SELECT doc FROM tickets
            WHERE ($1::text IS NULL OR id = $1)
              AND ($2::text IS NULL OR company_id = $2)
              AND ($3::text IS NULL OR customer_id = $3)
              AND ($4::text IS NULL OR status = $4)
              AND ($5 OR deleted_at IS NULL)
            LIMIT 1
            "#,
        )
        .bind(&filter.id)
        .bind(&filter.company_id)
        .bind(&filter.customer_id)
        .bind(filter.status.map(|status| status.as_str()))
        .bind(filter.include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(ticket)| ticket))
    }

    async fn update(&self, ticket: &Ticket) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET doc = jsonb_set($2::jsonb, '{company}', tickets.doc->'company'),
                status = $3, customer_id = $4, deleted_at = $5
            WHERE id = $1
            "#,
        )
        .bind(&ticket.id)
        .bind(Json(ticket))
        .bind(ticket.status.as_str())
        .bind(&ticket.customer.id)
        .bind(ticket.deleted_at)
        .execute(&self.pool)
        .await?;

        expect_row(result, || format!("ticket {}", ticket.id))
    }

    async fn update_company_snapshot(&self, company: &CompanySnapshot) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE tickets SET doc = jsonb_set(doc, '{company}', $2) WHERE company_id = $1",
        )
        .bind(&company.id)
        .bind(Json(company))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AgentStore for PgStore {
    async fn find_one(&self, filter: &AgentFilter) -> StoreResult<Option<Agent>> {
        let row = sqlx::query_scalar::<_, Json<Agent>>(
            r#"
            SELECT doc FROM agents
            WHERE ($1::text IS NULL OR id = $1)
              AND ($2::text IS NULL OR company_id = $2)
              AND ($3 OR deleted_at IS NULL)
            LIMIT 1
            "#,
        )
        .bind(&filter.id)
        .bind(&filter.company_id)
        .bind(filter.include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(agent)| agent))
    }

    async fn touch_activity(&self, agent_id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE agents
            SET doc = jsonb_set(jsonb_set(doc, '{updatedAt}', to_jsonb($2::timestamptz)),
                                '{lastActivityAt}', to_jsonb($2::timestamptz))
            WHERE id = $1
            "#,
        )
        .bind(agent_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        expect_row(result, || format!("agent {}", agent_id))
    }
}

#[async_trait]
impl CompanyStore for PgStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Company>> {
        let row = sqlx::query_scalar::<_, Json<Company>>(
            "SELECT doc FROM companies WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(company)| company))
    }

    async fn update(&self, company: &Company) -> StoreResult<()> {
        let result = sqlx::query("UPDATE companies SET doc = $2, deleted_at = $3 WHERE id = $1")
            .bind(&company.id)
            .bind(Json(company))
            .bind(company.deleted_at)
            .execute(&self.pool)
            .await?;

        expect_row(result, || format!("company {}", company.id))
    }
}

impl PgStore {
    // Adds to the stored value in the same statement that reads it.
    async fn add_time_balance_field(
        &self,
        customer_id: &str,
        field: &str,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let path = vec![
            "subscription".to_string(),
            "balance".to_string(),
            "time".to_string(),
            field.to_string(),
        ];
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE customers
            SET doc = jsonb_set(
                    jsonb_set(doc, $2::text[],
                              to_jsonb(COALESCE((doc #>> $2::text[])::bigint, 0) + $3)),
                    '{updatedAt}', to_jsonb($4::timestamptz))
            WHERE id = $1
            RETURNING (doc #>> $2::text[])::bigint
            "#,
        )
        .bind(customer_id)
        .bind(path)
        .bind(seconds)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        value.ok_or_else(|| StoreError::Missing(format!("customer {}", customer_id)))
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn find_one(&self, filter: &CustomerFilter) -> StoreResult<Option<Customer>> {
        let row = sqlx::query_scalar::<_, Json<Customer>>(
            r#"
            SELECT doc FROM customers
            WHERE ($1::text IS NULL OR id = $1)
              AND ($2::text IS NULL OR company_id = $2)
              AND ($3 OR deleted_at IS NULL)
            LIMIT 1
            "#,
        )
        .bind(&filter.id)
        .bind(&filter.company_id)
        .bind(filter.include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(customer)| customer))
    }

    async fn update(&self, customer: &Customer) -> StoreResult<()> {
        let result = sqlx::query("UPDATE customers SET doc = $2, deleted_at = $3 WHERE id = $1")
            .bind(&customer.id)
            .bind(Json(customer))
            .bind(customer.deleted_at)
            .execute(&self.pool)
            .await?;

        expect_row(result, || format!("customer {}", customer.id))
    }

    async fn add_time_balance_used(
        &self,
        customer_id: &str,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<i64> {
        self.add_time_balance_field(customer_id, "used", seconds, now)
            .await
    }

    async fn add_time_balance_total(
        &self,
        customer_id: &str,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<i64> {
        self.add_time_balance_field(customer_id, "total", seconds, now)
            .await
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert(&self, comment: &TicketComment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_comments (id, ticket_id, company_id, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.ticket_id)
        .bind(&comment.company_id)
        .bind(Json(comment))
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM ticket_comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, || format!("comment {}", id))
    }
}

#[async_trait]
impl TimeLogStore for PgStore {
    async fn insert(&self, log: &TicketTimeLog) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_time_logs (id, ticket_id, company_id, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&log.id)
        .bind(&log.ticket.id)
        .bind(&log.company.id)
        .bind(Json(log))
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_for_ticket(&self, ticket_id: &str) -> StoreResult<Option<TicketTimeLog>> {
        let row = sqlx::query_scalar::<_, Json<TicketTimeLog>>(
            r#"
            SELECT doc FROM ticket_time_logs
            WHERE ticket_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(log)| log))
    }

    async fn update(&self, log: &TicketTimeLog) -> StoreResult<()> {
        let result = sqlx::query("UPDATE ticket_time_logs SET doc = $2 WHERE id = $1")
            .bind(&log.id)
            .bind(Json(log))
            .execute(&self.pool)
            .await?;

        expect_row(result, || format!("ticket time log {}", log.id))
    }
}

#[async_trait]
impl BalanceHistoryStore for PgStore {
    async fn insert(&self, entry: &CustomerBalanceHistory) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customer_balance_histories (id, customer_id, reference_id, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.customer.id)
        .bind(&entry.reference.unique_id)
        .bind(Json(entry))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        filter: &BalanceHistoryFilter,
    ) -> StoreResult<Vec<CustomerBalanceHistory>> {
        let rows = sqlx::query_scalar::<_, Json<CustomerBalanceHistory>>(
            r#"
            SELECT doc FROM customer_balance_histories
            WHERE ($1::text IS NULL OR customer_id = $1)
              AND ($2::text IS NULL OR reference_id = $2)
            ORDER BY created_at
            "#,
        )
        .bind(&filter.customer_id)
        .bind(&filter.reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|Json(entry)| entry).collect())
    }
}

#[async_trait]
impl AttachmentStore for PgStore {
    async fn find(&self, filter: &AttachmentFilter) -> StoreResult<Vec<Attachment>> {
        let rows = sqlx::query_scalar::<_, Json<Attachment>>(
            r#"
            SELECT doc FROM attachments
            WHERE ($1::text[] IS NULL OR id = ANY($1))
              AND ($2::text IS NULL OR company_id = $2)
              AND ($3::bool IS NULL OR is_used = $3)
            "#,
        )
        .bind(&filter.ids)
        .bind(&filter.company_id)
        .bind(filter.is_used)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|Json(attachment)| attachment).collect())
    }

    async fn mark_used(&self, ids: &[String]) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE attachments
            SET is_used = TRUE, doc = jsonb_set(doc, '{isUsed}', 'true'::jsonb)
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn find_one(&self, filter: &OrderFilter) -> StoreResult<Option<Order>> {
        let row = sqlx::query_scalar::<_, Json<Order>>(
            r#"
            SELECT doc FROM orders
            WHERE ($1::text IS NULL OR id = $1)
              AND ($2::text IS NULL OR company_id = $2)
            LIMIT 1
            "#,
        )
        .bind(&filter.id)
        .bind(&filter.company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(order)| order))
    }

    async fn update(&self, order: &Order) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET doc = $2, status = $3 WHERE id = $1")
            .bind(&order.id)
            .bind(Json(order))
            .bind(order.status.as_str())
            .execute(&self.pool)
            .await?;

        expect_row(result, || format!("order {}", order.id))
    }
}
