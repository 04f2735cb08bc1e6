//! Factory for creating the configured record store.

use std::sync::Arc;

use reparto_core::config::{StoreBackend, StoreConfig};
use reparto_core::error::RepartoResult;
use reparto_core::traits::RecordStore;
use tracing::info;

use crate::memory::MemoryStore;
use crate::sqlite::SqlStore;

/// Create the record store selected by `config`.
///
/// Called once at startup; every call site works against the returned
/// `Arc<dyn RecordStore>` and never branches on the backend again.
pub fn create_store(config: &StoreConfig) -> RepartoResult<Arc<dyn RecordStore>> {
    match config.backend {
        StoreBackend::Sql => {
            info!(path = %config.database_path.display(), "using SQL record store");
            Ok(Arc::new(SqlStore::new(&config.database_path)?))
        }
        StoreBackend::Memory => {
            info!("using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
