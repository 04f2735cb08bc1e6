//! The record store contract.

use async_trait::async_trait;

use crate::error::RepartoResult;
use crate::types::{Factura, FacturaFilter, FacturaPatch, HistoryEntry, NewArchivo, NewFactura, Page};

/// Single authoritative interface for factura persistence.
///
/// Implemented twice — durable (`SqlStore`) and transient (`MemoryStore`) —
/// with equivalent observable behavior for equivalent inputs. The backend is
/// selected once at startup; call sites never branch on it. Within one
/// backend instance, `create` calls receive strictly increasing ids; the two
/// backends do not share an id space.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a validated factura and its attachments as one unit of work,
    /// returning the new id. Rejects more than
    /// [`MAX_ARCHIVOS_POR_FACTURA`](crate::types::MAX_ARCHIVOS_POR_FACTURA)
    /// attachments before writing anything.
    async fn create(
        &self,
        factura: NewFactura,
        archivos: Vec<NewArchivo>,
    ) -> RepartoResult<i64>;

    /// Fetch one factura with its attachments embedded.
    async fn get(&self, id: i64) -> RepartoResult<Factura>;

    /// List facturas matching `filter`, ordered by `created_at` descending
    /// (id descending as tiebreak), with attachments embedded. Never returns
    /// more than `min(page.limit, MAX_LIST_LIMIT)` rows.
    async fn list(&self, filter: &FacturaFilter, page: Page) -> RepartoResult<Vec<Factura>>;

    /// Apply a partial update. Fields absent from the patch retain their
    /// stored value. When the applied patch changes data, the field-level
    /// diff is appended to the factura's history in the same unit of work.
    async fn update(&self, id: i64, patch: FacturaPatch) -> RepartoResult<Factura>;

    /// Audit trail for one factura, most recent entry first.
    async fn history(&self, id: i64) -> RepartoResult<Vec<HistoryEntry>>;

    /// Short backend identifier, e.g. for health reporting.
    fn backend_name(&self) -> &'static str;
}
