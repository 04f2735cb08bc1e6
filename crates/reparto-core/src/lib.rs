//! reparto-core - Core library for reparto.
//!
//! This crate provides the domain types, error taxonomy, record store
//! contract, filter predicates, and change auditing for the reparto
//! logistics back-office.
//!
//! # Example
//!
//! ```ignore
//! use reparto_core::{FacturaDraft, FacturaFilter, Page, RecordStore};
//!
//! let nueva = draft.validate()?;
//! let id = store.create(nueva, archivos).await?;
//!
//! let filter = FacturaFilter::default().with_cliente(12);
//! let facturas = store.list(&filter, Page::default()).await?;
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use audit::{diff_facturas, AUDITED_FIELDS};
pub use config::{StoreBackend, StoreConfig};
pub use error::{RepartoError, RepartoResult};
pub use traits::RecordStore;
pub use types::{
    Archivo, ChangeSet, Factura, FacturaDraft, FacturaFilter, FacturaPatch, FieldChange,
    HistoryEntry, NewArchivo, NewFactura, Page, MAX_ARCHIVOS_POR_FACTURA, MAX_LIST_LIMIT,
};
