//! Application State

use std::sync::Arc;

use magent_core::Agent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The single agent; its thread store holds every conversation
    pub agent: Arc<Agent>,
}
