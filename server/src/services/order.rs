use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument};

use super::ledger::BalanceLedger;
use super::ServiceContext;
use crate::models::{Order, OrderStatus, PackageType, SubscriptionStatus};
use crate::store::{CustomerFilter, OrderFilter};
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct OrderService {
    ctx: ServiceContext,
    ledger: BalanceLedger,
}

impl OrderService {
    pub fn new(ctx: ServiceContext, ledger: BalanceLedger) -> Self {
        Self { ctx, ledger }
    }

    /// Marks a pending order as paid. A time package also opens the
    /// customer's subscription window and credits its seconds.
    #[instrument(skip(self))]
    pub async fn pay(&self, order_id: &str) -> Result<Order, AppError> {
        let mut order = self
            .ctx
            .stores
            .orders
            .find_one(&OrderFilter {
                id: Some(order_id.to_string()),
                ..OrderFilter::default()
            })
            .await?
            .ok_or_else(|| AppError::not_found("order", order_id))?;

        if order.status != OrderStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "order is already {}",
                order.status.as_str()
            )));
        }

        let customer = self
            .ctx
            .stores
            .customers
            .find_one(&CustomerFilter::by_id(&order.customer_id))
            .await?
            .ok_or_else(|| AppError::not_found("customer", &order.customer_id))?;

        let now = self.ctx.clock.now();
        let is_time_package = order.package.package_type == PackageType::Time;
        let end_at = if is_time_package {
            Some(subscription_end(now, order.package.validity_days)?)
        } else {
            None
        };

        order.status = OrderStatus::Paid;
        order.paid_at = Some(now);
        order.updated_at = now;
        self.ctx.stores.orders.update(&order).await?;

        if is_time_package {
            let mut customer = customer;
            customer.subscription.package_id = Some(order.package.id.clone());
            customer.subscription.status = SubscriptionStatus::Active;
            customer.subscription.start_at = Some(now);
            customer.subscription.end_at = end_at;
            customer.updated_at = now;
            self.ctx.stores.customers.update(&customer).await?;

            self.ledger
                .credit(&customer.id, order.package.time_in_seconds, &order.id)
                .await?;
        }

        info!(customer_id = %order.customer_id, "Order paid");
        Ok(order)
    }
}

fn subscription_end(start: DateTime<Utc>, validity_days: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_days(validity_days)
        .and_then(|validity| start.checked_add_signed(validity))
        .ok_or_else(|| {
            AppError::InvalidState(format!(
                "package validity of {} days is out of range",
                validity_days
            ))
        })
}
