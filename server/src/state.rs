use std::sync::Arc;

use crate::config::Settings;
use crate::services::{
    BackgroundQueue, Clock, IdGenerator, RandomIds, ServiceContext, Services, SystemClock,
};
use crate::store::Stores;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Wires the use-cases with the system clock and random ids.
    pub fn with_stores(stores: Stores, queue: BackgroundQueue, settings: Settings) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids: Arc<dyn IdGenerator> = Arc::new(RandomIds);
        Self::new(Services::new(ServiceContext::new(
            stores, queue, clock, ids, settings,
        )))
    }
}
