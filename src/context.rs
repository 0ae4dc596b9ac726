//! State shared between the client's startup operations.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use lockstep_hooks::{EventClass, HookEvent};

use crate::runtime::{AppConfig, ClientConfiguration, ClientSettings};

#[derive(Default)]
struct ContextState {
    connected: bool,
    configuration: Option<ClientConfiguration>,
    app_config: Option<AppConfig>,
    hook_events: HashMap<EventClass, u64>,
}

/// Cheaply cloneable handle to the client state.
///
/// Operations run one at a time, so the lock is only contended by hook
/// callbacks recording events.
#[derive(Clone, Default)]
pub struct ClientContext {
    state: Arc<RwLock<ContextState>>,
}

impl ClientContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.write().connected = connected;
    }

    pub fn configuration(&self) -> Option<ClientConfiguration> {
        self.state.read().configuration.clone()
    }

    pub fn set_configuration(&self, configuration: ClientConfiguration) {
        self.state.write().configuration = Some(configuration);
    }

    /// Session settings, once the configuration has been fetched.
    pub fn settings(&self) -> Option<ClientSettings> {
        self.state
            .read()
            .configuration
            .as_ref()
            .map(|c| c.settings.clone())
    }

    /// The application config currently in effect.
    pub fn app_config(&self) -> Option<AppConfig> {
        self.state.read().app_config.clone()
    }

    /// Put the fetched application config into effect.
    /// Returns false if no configuration has been fetched yet.
    pub fn apply_app_config(&self) -> bool {
        let mut state = self.state.write();
        match state.configuration.as_ref().map(|c| c.app_config.clone()) {
            Some(app_config) => {
                state.app_config = Some(app_config);
                true
            }
            None => false,
        }
    }

    pub fn record_hook_event(&self, event: &HookEvent) {
        *self.state.write().hook_events.entry(event.class).or_default() += 1;
    }

    pub fn hook_event_count(&self, class: EventClass) -> u64 {
        self.state
            .read()
            .hook_events
            .get(&class)
            .copied()
            .unwrap_or(0)
    }
}
