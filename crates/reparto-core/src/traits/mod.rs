//! Core traits for reparto backends.

mod record_store;

pub use record_store::*;
