use std::sync::atomic::{AtomicU64, Ordering};

use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

pub const TOKEN_LENGTH: usize = 64;

pub trait IdGenerator: Send + Sync {
    /// Identifier for a newly created entity.
    fn next_id(&self) -> String;

    /// Opaque token for customer-facing links.
    fn next_token(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn next_token(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }
}

/// Deterministic ids (`{prefix}-1`, `{prefix}-2`, ...) with random tokens.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::Relaxed))
    }

    fn next_token(&self) -> String {
        RandomIds.next_token()
    }
}
