//! Core types for reparto.

mod draft;
mod factura;
mod filter;
mod historial;

pub use draft::*;
pub use factura::*;
pub use filter::*;
pub use historial::*;
