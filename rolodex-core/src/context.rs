use std::sync::Arc;

use rolodex_provider::ResourceClient;

use crate::bus::EventBus;

/// Shared collaborators handed to screens and dialogs.
///
/// The platform layer builds this once and clones it into every component.
#[derive(Clone)]
pub struct ConsoleContext {
    /// Remote resource transport
    pub client: Arc<dyn ResourceClient>,
    /// Process-wide event bus
    pub bus: EventBus,
}

impl ConsoleContext {
    #[must_use]
    pub fn new(client: Arc<dyn ResourceClient>, bus: EventBus) -> Self {
        Self { client, bus }
    }
}

impl std::fmt::Debug for ConsoleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleContext")
            .field("client", &self.client.id())
            .field("bus", &self.bus)
            .finish()
    }
}
