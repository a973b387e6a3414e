//! Prepaid time balance.
//!
//! The balance write and the history append are two sequential writes with
//! no transaction around them.

use tracing::{info, instrument};

use super::ServiceContext;
use crate::models::{
    BalanceReference, BalanceReferenceType, Customer, CustomerBalanceHistory, Ticket, TimeBalance,
};
use crate::store::CustomerFilter;
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct BalanceLedger {
    ctx: ServiceContext,
}

impl BalanceLedger {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    async fn load_customer(&self, customer_id: &str) -> Result<Customer, AppError> {
        self.ctx
            .stores
            .customers
            .find_one(&CustomerFilter::by_id(customer_id))
            .await?
            .ok_or_else(|| AppError::not_found("customer", customer_id))
    }

    /// Charges the ticket's closed session to its customer. No-op for
    /// customers that are not on a time balance.
    #[instrument(skip_all, fields(ticket_id = %ticket.id))]
    pub async fn debit(&self, ticket: &Ticket) -> Result<(), AppError> {
        let customer = self.load_customer(&ticket.customer.id).await?;
        if !customer.is_need_balance {
            return Ok(());
        }

        let now = self.ctx.clock.now();
        let seconds = ticket.log_time.duration_in_seconds;
        let used = self
            .ctx
            .stores
            .customers
            .add_time_balance_used(&customer.id, seconds, now)
            .await?;

        let entry = CustomerBalanceHistory {
            id: self.ctx.ids.next_id(),
            customer: customer.snapshot(),
            in_seconds: None,
            out_seconds: Some(seconds),
            reference: BalanceReference {
                unique_id: ticket.id.clone(),
                reference_type: BalanceReferenceType::Ticket,
            },
            created_at: now,
        };
        self.ctx.stores.balance_histories.insert(&entry).await?;

        info!(customer_id = %customer.id, seconds, used, "Time balance debited");
        Ok(())
    }

    /// Adds purchased seconds to the customer's balance.
    #[instrument(skip(self))]
    pub async fn credit(
        &self,
        customer_id: &str,
        seconds: i64,
        order_id: &str,
    ) -> Result<TimeBalance, AppError> {
        let customer = self.load_customer(customer_id).await?;
        let now = self.ctx.clock.now();

        let mut balance = customer.subscription.balance.time;
        balance.total = self
            .ctx
            .stores
            .customers
            .add_time_balance_total(&customer.id, seconds, now)
            .await?;

        let entry = CustomerBalanceHistory {
            id: self.ctx.ids.next_id(),
            customer: customer.snapshot(),
            in_seconds: Some(seconds),
            out_seconds: None,
            reference: BalanceReference {
                unique_id: order_id.to_string(),
                reference_type: BalanceReferenceType::Order,
            },
            created_at: now,
        };
        self.ctx.stores.balance_histories.insert(&entry).await?;

        info!(customer_id = %customer.id, seconds, total = balance.total, "Time balance credited");
        Ok(balance)
    }
}
