//! In-process record store.
//!
//! Mirrors the relational layout as three owned collections plus id
//! counters, so environments without a database observe the same contract
//! as `SqlStore`. State lives in an encapsulated instance, not a global:
//! every test (or process) constructs its own store with no leakage.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use reparto_core::audit::diff_facturas;
use reparto_core::error::{RepartoError, RepartoResult};
use reparto_core::traits::RecordStore;
use reparto_core::types::{
    Archivo, Factura, FacturaFilter, FacturaPatch, HistoryEntry, NewArchivo, NewFactura, Page,
};

#[derive(Default)]
struct Inner {
    facturas: Vec<Factura>,
    archivos: Vec<Archivo>,
    historial: Vec<HistoryEntry>,
    next_factura_id: i64,
    next_archivo_id: i64,
    next_historial_id: i64,
}

impl Inner {
    fn new() -> Self {
        Self {
            next_factura_id: 1,
            next_archivo_id: 1,
            next_historial_id: 1,
            ..Self::default()
        }
    }

    /// Clone a stored factura with its attachments embedded.
    fn assemble(&self, factura: &Factura) -> Factura {
        let mut out = factura.clone();
        out.archivos = self
            .archivos
            .iter()
            .filter(|a| a.factura_id == factura.id)
            .cloned()
            .collect();
        out
    }
}

/// Transient record store for environments without a database.
///
/// Operations never suspend; each one mutates under a single lock
/// acquisition, which gives the same all-or-nothing visibility as the SQL
/// backend's transactions.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(
        &self,
        factura: NewFactura,
        archivos: Vec<NewArchivo>,
    ) -> RepartoResult<i64> {
        NewArchivo::validate_batch(&archivos)?;

        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_factura_id;
        inner.next_factura_id += 1;

        // stored without attachments; they live in their own collection
        inner
            .facturas
            .push(factura.into_factura(id, Utc::now(), Vec::new()));

        for archivo in archivos {
            let archivo_id = inner.next_archivo_id;
            inner.next_archivo_id += 1;
            inner.archivos.push(Archivo {
                id: archivo_id,
                factura_id: id,
                filename: archivo.filename,
                mimetype: archivo.mimetype,
                size: archivo.size,
            });
        }

        debug!(factura_id = id, "factura created");
        Ok(id)
    }

    async fn get(&self, id: i64) -> RepartoResult<Factura> {
        let inner = self.inner.lock().unwrap();
        inner
            .facturas
            .iter()
            .find(|f| f.id == id)
            .map(|f| inner.assemble(f))
            .ok_or_else(|| RepartoError::not_found(id))
    }

    async fn list(&self, filter: &FacturaFilter, page: Page) -> RepartoResult<Vec<Factura>> {
        let inner = self.inner.lock().unwrap();

        let mut matched: Vec<&Factura> = inner
            .facturas
            .iter()
            .filter(|f| filter.matches(f))
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(matched
            .into_iter()
            .skip(page.offset)
            .take(page.effective_limit())
            .map(|f| inner.assemble(f))
            .collect())
    }

    async fn update(&self, id: i64, patch: FacturaPatch) -> RepartoResult<Factura> {
        let mut inner = self.inner.lock().unwrap();

        let index = inner
            .facturas
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| RepartoError::not_found(id))?;

        let old = inner.facturas[index].clone();
        let new = patch.apply_to(&old)?;
        let changes = diff_facturas(&old, &new);

        if !changes.is_empty() {
            inner.facturas[index] = new.clone();
            let entry_id = inner.next_historial_id;
            inner.next_historial_id += 1;
            inner.historial.push(HistoryEntry {
                id: entry_id,
                factura_id: id,
                changes: changes.clone(),
                changed_at: Utc::now(),
            });
            debug!(factura_id = id, fields = changes.len(), "factura updated");
        }

        Ok(inner.assemble(&new))
    }

    async fn history(&self, id: i64) -> RepartoResult<Vec<HistoryEntry>> {
        let inner = self.inner.lock().unwrap();
        if !inner.facturas.iter().any(|f| f.id == id) {
            return Err(RepartoError::not_found(id));
        }

        let mut entries: Vec<HistoryEntry> = inner
            .historial
            .iter()
            .filter(|h| h.factura_id == id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.changed_at
                .cmp(&a.changed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
