use std::sync::Arc;

use hireup_db::Database;
use hireup_gateway::Broker;

/// Shared state behind every handler: the conversation store and the
/// channel bus.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub broker: Broker,
}

impl AppState {
    pub fn new(db: Arc<Database>, broker: Broker) -> Self {
        Self { db, broker }
    }
}
