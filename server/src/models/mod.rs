pub mod agent;
pub mod attachment;
pub mod balance_history;
pub mod comment;
pub mod company;
pub mod customer;
pub mod order;
pub mod ticket;
pub mod time_log;

pub use agent::{Agent, AgentRole, AgentSnapshot};
pub use attachment::{Attachment, AttachmentSnapshot};
pub use balance_history::{BalanceReference, BalanceReferenceType, CustomerBalanceHistory};
pub use comment::{CommentSender, SenderType, TicketComment};
pub use company::{Company, CompanySnapshot, CompanyType};
pub use customer::{
    Balance, Customer, CustomerSnapshot, Subscription, SubscriptionStatus, TimeBalance,
};
pub use order::{Order, OrderStatus, PackageSnapshot, PackageType};
pub use ticket::{
    LogTime, LogTimeStatus, PauseHistory, Ticket, TicketSnapshot, TicketStatus, TimerError,
};
pub use time_log::TicketTimeLog;
