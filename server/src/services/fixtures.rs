use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::mpsc;

use super::background::{BackgroundQueue, BackgroundTask, Email, OverflowPolicy};
use super::clock::{Clock, ManualClock};
use super::comment::CommentService;
use super::ids::SequentialIds;
use super::ledger::BalanceLedger;
use super::lifecycle::TicketLifecycle;
use super::timer::TicketTimer;
use super::ServiceContext;
use crate::config::{CommentTransitionMode, Settings};
use crate::models::{
    Agent, AgentRole, Attachment, Balance, Company, CompanyType, Customer, Order, OrderStatus,
    PackageSnapshot, PackageType, Subscription, SubscriptionStatus, Ticket, TicketStatus,
    TimeBalance,
};
use crate::store::{MemoryStore, Stores};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn company(id: &str) -> Company {
    Company {
        id: id.to_string(),
        name: format!("Company {}", id),
        logo: None,
        subdomain: id.to_string(),
        company_type: CompanyType::B2B,
        created_at: epoch(),
        updated_at: epoch(),
        deleted_at: None,
    }
}

pub fn b2c_company(id: &str) -> Company {
    Company {
        company_type: CompanyType::B2C,
        ..company(id)
    }
}

pub fn agent(id: &str, company_id: &str) -> Agent {
    Agent {
        id: id.to_string(),
        company_id: company_id.to_string(),
        name: format!("Agent {}", id),
        email: format!("{}@agents.test", id),
        role: AgentRole::Agent,
        last_activity_at: None,
        created_at: epoch(),
        updated_at: epoch(),
        deleted_at: None,
    }
}

pub fn customer(id: &str, company_id: &str) -> Customer {
    Customer {
        id: id.to_string(),
        company_id: company_id.to_string(),
        name: format!("Customer {}", id),
        email: format!("{}@customers.test", id),
        is_need_balance: false,
        subscription: Subscription::default(),
        created_at: epoch(),
        updated_at: epoch(),
        deleted_at: None,
    }
}

pub fn ticket(id: &str, company: &Company, customer_id: &str) -> Ticket {
    let owner = customer(customer_id, &company.id);
    Ticket {
        id: id.to_string(),
        code: format!("TCK-{}", id),
        subject: "Printer is on fire".to_string(),
        content: "Smoke everywhere".to_string(),
        company: company.snapshot(),
        customer: owner.snapshot(),
        project: None,
        category: None,
        agents: Vec::new(),
        status: TicketStatus::Open,
        log_time: Default::default(),
        reminder_sent: false,
        token: String::new(),
        created_at: epoch(),
        updated_at: epoch(),
        deleted_at: None,
    }
}

pub fn attachment(id: &str, company_id: &str) -> Attachment {
    Attachment {
        id: id.to_string(),
        company_id: company_id.to_string(),
        name: format!("{}.png", id),
        url: format!("https://files.test/{}.png", id),
        size: 1024,
        is_used: false,
        created_at: epoch(),
    }
}

pub fn active_subscription(now: DateTime<Utc>, total: i64, used: i64) -> Subscription {
    Subscription {
        package_id: Some("pkg-1".to_string()),
        status: SubscriptionStatus::Active,
        start_at: Some(now - Duration::days(1)),
        end_at: Some(now + Duration::days(29)),
        balance: Balance {
            time: TimeBalance { total, used },
        },
    }
}

pub fn time_order(id: &str, company_id: &str, customer_id: &str, seconds: i64) -> Order {
    Order {
        id: id.to_string(),
        company_id: company_id.to_string(),
        customer_id: customer_id.to_string(),
        package: PackageSnapshot {
            id: "pkg-1".to_string(),
            name: "10 hours".to_string(),
            package_type: PackageType::Time,
            time_in_seconds: seconds,
            validity_days: 30,
        },
        status: OrderStatus::Pending,
        paid_at: None,
        created_at: epoch(),
        updated_at: epoch(),
    }
}

/// Service context over a [`MemoryStore`] with a manual clock and a
/// background queue nobody drains until the test does.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub ctx: ServiceContext,
    pub tasks: mpsc::Receiver<BackgroundTask>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(epoch()));
        let (queue, tasks) = BackgroundQueue::channel(64, OverflowPolicy::Reject);
        let ctx = ServiceContext::new(
            Stores::from_backend(store.clone()),
            queue,
            clock.clone(),
            Arc::new(SequentialIds::new("id")),
            Settings::default(),
        );

        Self {
            store,
            clock,
            ctx,
            tasks,
        }
    }

    pub fn ledger(&self) -> BalanceLedger {
        BalanceLedger::new(self.ctx.clone())
    }

    pub fn lifecycle(&self) -> TicketLifecycle {
        TicketLifecycle::new(self.ctx.clone(), self.ledger())
    }

    pub fn timer(&self) -> TicketTimer {
        TicketTimer::new(self.ctx.clone())
    }

    pub fn comments(&self, mode: CommentTransitionMode) -> CommentService {
        let mut ctx = self.ctx.clone();
        ctx.settings = Arc::new(Settings {
            comment_transition_mode: mode,
            ..Settings::clone(&self.ctx.settings)
        });
        CommentService::new(ctx.clone(), TicketLifecycle::new(ctx.clone(), BalanceLedger::new(ctx)))
    }

    /// Seeds company `c1`, agent `a1`, customer `cu1` and ticket `t1` in
    /// `status`. An `in_progress` ticket gets a running timer but no
    /// time-log row.
    pub fn seed_ticket(&self, status: TicketStatus) -> (Ticket, Agent) {
        let company = company("c1");
        let agent = agent("a1", "c1");
        let mut ticket = ticket("t1", &company, "cu1");
        ticket.status = status;
        if status == TicketStatus::InProgress {
            ticket.log_time.start_session(self.clock.now());
        }

        self.store.put_company(company);
        self.store.put_agent(agent.clone());
        self.store.put_customer(customer("cu1", "c1"));
        self.store.put_ticket(ticket.clone());
        (ticket, agent)
    }

    pub fn drain_tasks(&mut self) -> Vec<BackgroundTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.tasks.try_recv() {
            tasks.push(task);
        }
        tasks
    }

    pub fn drain_emails(&mut self) -> Vec<Email> {
        self.drain_tasks()
            .into_iter()
            .filter_map(|task| match task {
                BackgroundTask::SendEmail(email) => Some(email),
                _ => None,
            })
            .collect()
    }
}
