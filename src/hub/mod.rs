//! Coordination hub: registry, task routing, broadcast fanout, dispatch.

pub mod dispatcher;
pub mod fanout;
pub mod registry;
pub mod router;
pub mod session;

use std::sync::Arc;

use crate::config::GlobalConfig;

pub use dispatcher::Dispatcher;
pub use fanout::{BroadcastFanout, DeliveryReport};
pub use registry::{ConnectionRegistry, RegistrySnapshot};
pub use router::TaskRouter;
pub use session::Session;

/// Shared application state handed to every transport handler.
#[derive(Debug)]
pub struct AppState {
    /// Validated configuration.
    pub config: Arc<GlobalConfig>,
    /// Live agents and pending tasks.
    pub registry: Arc<ConnectionRegistry>,
    /// Task submission path.
    pub router: Arc<TaskRouter>,
    /// Broadcast path.
    pub fanout: Arc<BroadcastFanout>,
    /// Inbound frame handling.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Wire up hub components for `config`.
    #[must_use]
    pub fn new(config: GlobalConfig) -> Self {
        let send_timeout = config.session.send_timeout();
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(TaskRouter::new(Arc::clone(&registry), send_timeout));
        let fanout = Arc::new(BroadcastFanout::new(Arc::clone(&registry), send_timeout));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&router),
            Arc::clone(&fanout),
        ));
        Self {
            config: Arc::new(config),
            registry,
            router,
            fanout,
            dispatcher,
        }
    }
}
