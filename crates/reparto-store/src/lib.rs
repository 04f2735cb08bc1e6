//! reparto-store - Record store backends for reparto.
//!
//! Two implementations of [`reparto_core::RecordStore`] with equivalent
//! observable behavior: [`SqlStore`] over SQLite for durable deployments,
//! and [`MemoryStore`] for environments without a database. Pick one at
//! startup with [`create_store`].

pub mod factory;
pub mod memory;
pub mod sqlite;

pub use factory::create_store;
pub use memory::MemoryStore;
pub use sqlite::SqlStore;
