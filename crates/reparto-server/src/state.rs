//! Server state management.

use std::sync::Arc;

use reparto_core::RecordStore;

/// Shared application state.
///
/// Holds the record store selected once at startup; handlers never know or
/// care which backend is behind it.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
}

impl AppState {
    /// Create application state around an injected store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The active backend's identifier, for health reporting.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
