//! Application state.

use std::sync::Arc;

use ytvault_worker::{ChannelTransport, JobManager};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub manager: JobManager,
    /// WebSocket clients subscribe here; the manager's event bus pushes into it
    pub transport: Arc<ChannelTransport>,
}

impl AppState {
    pub fn new(config: ApiConfig, manager: JobManager, transport: Arc<ChannelTransport>) -> Self {
        Self {
            config,
            manager,
            transport,
        }
    }
}
