//! Ticket lifecycle core and its collaborators.

use std::sync::Arc;

use crate::config::Settings;
use crate::store::Stores;

pub mod background;
pub mod clock;
pub mod comment;
pub mod company;
pub mod ids;
pub mod ledger;
pub mod lifecycle;
pub mod locks;
pub mod notifications;
pub mod order;
pub mod timer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use background::{BackgroundQueue, BackgroundTask, BackgroundWorker, LogMailer, Mailer};
pub use clock::{Clock, SystemClock};
pub use comment::{CommentService, CommentTransitionRequest};
pub use company::{CompanyService, UpdateCompanyProfile};
pub use ids::{IdGenerator, RandomIds};
pub use ledger::BalanceLedger;
pub use lifecycle::TicketLifecycle;
pub use locks::TicketLocks;
pub use order::OrderService;
pub use timer::TicketTimer;

/// Collaborators shared by every use-case.
#[derive(Clone)]
pub struct ServiceContext {
    pub stores: Stores,
    pub queue: BackgroundQueue,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub locks: Arc<TicketLocks>,
    pub settings: Arc<Settings>,
}

impl ServiceContext {
    pub fn new(
        stores: Stores,
        queue: BackgroundQueue,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        settings: Settings,
    ) -> Self {
        Self {
            stores,
            queue,
            clock,
            ids,
            locks: Arc::new(TicketLocks::new()),
            settings: Arc::new(settings),
        }
    }
}

/// The use-cases exposed to the HTTP layer.
#[derive(Clone)]
pub struct Services {
    pub timer: TicketTimer,
    pub comments: CommentService,
    pub companies: CompanyService,
    pub orders: OrderService,
}

impl Services {
    pub fn new(ctx: ServiceContext) -> Self {
        let ledger = BalanceLedger::new(ctx.clone());
        let lifecycle = TicketLifecycle::new(ctx.clone(), ledger.clone());

        Self {
            timer: TicketTimer::new(ctx.clone()),
            comments: CommentService::new(ctx.clone(), lifecycle),
            companies: CompanyService::new(ctx.clone()),
            orders: OrderService::new(ctx, ledger),
        }
    }
}
