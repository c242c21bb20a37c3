use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;

pub type SharedSessionRegistry = Arc<RwLock<SessionRegistry>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SharedSessionRegistry,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, SessionRegistry::new())
    }

    /// Build state around an existing registry.
    pub fn with_registry(config: ServerConfig, registry: SessionRegistry) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(registry)),
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Increments a connection counter on creation and decrements it on drop.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
