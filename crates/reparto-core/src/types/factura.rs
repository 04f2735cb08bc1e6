//! Factura and attachment types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RepartoError, RepartoResult};

/// Maximum number of attachments accepted per factura. Callers are expected
/// to reject over-limit uploads earlier; the store checks again before any
/// write.
pub const MAX_ARCHIVOS_POR_FACTURA: usize = 5;

/// A delivery-invoice record.
///
/// `id` and `created_at` are assigned by the store at creation and never
/// change afterwards. `estado` is conventionally one of
/// `entregado sin novedad | entregado con detalle | rechazado | reprogramado`
/// but the store does not enforce the set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factura {
    /// Store-assigned identifier.
    pub id: i64,
    /// Customer number.
    pub cliente: i64,
    /// Day-name label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dia: Option<String>,
    /// Delivery date.
    pub fecha: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conductor_xp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carga: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    /// Number of delivery rounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vueltas: Option<u32>,
    /// Cargo weight in kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kg: Option<f64>,
    /// Human-assigned tracking number; not unique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guia: Option<String>,
    /// Creation timestamp, set once.
    pub created_at: DateTime<Utc>,
    /// Attached files, embedded on read. Empty when none exist, never null.
    #[serde(default)]
    pub archivos: Vec<Archivo>,
}

/// A file attached to a factura.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archivo {
    pub id: i64,
    pub factura_id: i64,
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
}

/// Descriptor of an already-stored upload, to be linked to a factura at
/// creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArchivo {
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
}

impl NewArchivo {
    pub fn new(
        filename: impl Into<String>,
        mimetype: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            filename: filename.into(),
            mimetype: mimetype.into(),
            size,
        }
    }

    /// Enforce the per-factura attachment cap.
    ///
    /// Both backends call this before writing anything, so an over-limit
    /// batch never leaves a partial factura behind.
    pub fn validate_batch(archivos: &[NewArchivo]) -> RepartoResult<()> {
        if archivos.len() > MAX_ARCHIVOS_POR_FACTURA {
            return Err(RepartoError::validation_field(
                "archivos",
                format!(
                    "at most {} attachments per factura, got {}",
                    MAX_ARCHIVOS_POR_FACTURA,
                    archivos.len()
                ),
            ));
        }
        Ok(())
    }
}
