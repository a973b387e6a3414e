use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes mutations of a single ticket. Pause, resume and
/// comment-driven transitions hold the ticket's guard from read to write.
#[derive(Default)]
pub struct TicketLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TicketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, ticket_id: &str) -> TicketGuard<'_> {
        // Clone the Arc out so the map shard is not held across the await.
        let mutex = self
            .locks
            .entry(ticket_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;

        TicketGuard {
            locks: self,
            ticket_id: ticket_id.to_string(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct TicketGuard<'a> {
    locks: &'a TicketLocks,
    ticket_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the registry still references the mutex: nobody holds or waits.
        self.locks
            .locks
            .remove_if(&self.ticket_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
