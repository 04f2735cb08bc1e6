//! Listing filters for factura queries.
//!
//! One `FacturaFilter` value drives both backends: `matches` is the
//! in-memory predicate, and the SQL backend translates the same struct into
//! a parameterized WHERE fragment with identical selection semantics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Factura;

/// Hard cap on the number of rows a single `list` call may return.
pub const MAX_LIST_LIMIT: usize = 200;

const DEFAULT_LIST_LIMIT: usize = 100;

/// Optional, AND-combined listing filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacturaFilter {
    /// Exact customer number.
    pub cliente: Option<i64>,
    /// Exact delivery date. Independent of the range bounds; all present
    /// constraints apply conjunctively, even when jointly unsatisfiable.
    pub fecha: Option<NaiveDate>,
    /// Inclusive lower bound on `fecha`.
    pub desde: Option<NaiveDate>,
    /// Inclusive upper bound on `fecha`.
    pub hasta: Option<NaiveDate>,
    /// Exact tracking number, case-insensitive.
    pub guia: Option<String>,
    /// Free-text needle, matched case-insensitively as a substring of
    /// `guia`, `conductor_xp`, `camion`, `local`, `carga`, or
    /// `observaciones`.
    pub q: Option<String>,
}

impl FacturaFilter {
    pub fn with_cliente(mut self, cliente: i64) -> Self {
        self.cliente = Some(cliente);
        self
    }

    pub fn with_fecha(mut self, fecha: NaiveDate) -> Self {
        self.fecha = Some(fecha);
        self
    }

    pub fn with_rango(mut self, desde: NaiveDate, hasta: NaiveDate) -> Self {
        self.desde = Some(desde);
        self.hasta = Some(hasta);
        self
    }

    pub fn with_guia(mut self, guia: impl Into<String>) -> Self {
        self.guia = Some(guia.into());
        self
    }

    pub fn with_q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Whether no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.cliente.is_none()
            && self.fecha.is_none()
            && self.desde.is_none()
            && self.hasta.is_none()
            && self.guia.is_none()
            && self.q.is_none()
    }

    /// In-memory predicate. Absent filters impose no constraint; absent
    /// column values are normalized to the empty string before text
    /// matching, so a record with no `observaciones` never matches a
    /// non-empty `q` on that column.
    pub fn matches(&self, factura: &Factura) -> bool {
        if let Some(cliente) = self.cliente {
            if factura.cliente != cliente {
                return false;
            }
        }
        if let Some(fecha) = self.fecha {
            if factura.fecha != fecha {
                return false;
            }
        }
        if let Some(desde) = self.desde {
            if factura.fecha < desde {
                return false;
            }
        }
        if let Some(hasta) = self.hasta {
            if factura.fecha > hasta {
                return false;
            }
        }
        if let Some(guia) = &self.guia {
            let stored = factura.guia.as_deref().unwrap_or("");
            if !stored.eq_ignore_ascii_case(guia) {
                return false;
            }
        }
        if let Some(q) = &self.q {
            // ASCII-only case folding, matching SQLite's LOWER(), so both
            // backends select the same rows for the same needle.
            let needle = q.to_ascii_lowercase();
            let haystacks = [
                factura.guia.as_deref(),
                factura.conductor_xp.as_deref(),
                factura.camion.as_deref(),
                factura.local.as_deref(),
                factura.carga.as_deref(),
                factura.observaciones.as_deref(),
            ];
            let hit = haystacks
                .iter()
                .any(|col| col.unwrap_or("").to_ascii_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Pagination window for `list`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// The requested limit, clamped to `MAX_LIST_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit.min(MAX_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewFactura;
    use chrono::Utc;

    fn factura(cliente: i64, fecha: &str, guia: Option<&str>, camion: Option<&str>) -> Factura {
        NewFactura {
            cliente,
            dia: None,
            fecha: NaiveDate::parse_from_str(fecha, "%Y-%m-%d").unwrap(),
            conductor_xp: None,
            camion: camion.map(String::from),
            local: None,
            carga: None,
            observaciones: None,
            estado: None,
            vueltas: None,
            kg: None,
            guia: guia.map(String::from),
        }
        .into_factura(1, Utc::now(), Vec::new())
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = FacturaFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&factura(1, "2024-01-01", None, None)));
    }

    #[test]
    fn test_cliente_and_range_are_conjunctive() {
        let filter = FacturaFilter::default().with_cliente(3).with_rango(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );

        assert!(filter.matches(&factura(3, "2024-01-15", None, None)));
        assert!(!filter.matches(&factura(4, "2024-01-15", None, None)));
        assert!(!filter.matches(&factura(3, "2024-02-01", None, None)));
    }

    #[test]
    fn test_exact_fecha_and_range_may_be_unsatisfiable() {
        let filter = FacturaFilter::default()
            .with_fecha(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .with_rango(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            );

        assert!(!filter.matches(&factura(1, "2024-03-01", None, None)));
        assert!(!filter.matches(&factura(1, "2024-01-15", None, None)));
    }

    #[test]
    fn test_guia_exact_match_is_case_insensitive() {
        let filter = FacturaFilter::default().with_guia("a-2");
        assert!(filter.matches(&factura(1, "2024-01-01", Some("A-2"), None)));
        assert!(!filter.matches(&factura(1, "2024-01-01", Some("A-21"), None)));
        assert!(!filter.matches(&factura(1, "2024-01-01", None, None)));
    }

    #[test]
    fn test_q_searches_across_columns() {
        let filter = FacturaFilter::default().with_q("ab-12");
        assert!(filter.matches(&factura(1, "2024-01-01", None, Some("AB-1234"))));
        assert!(filter.matches(&factura(1, "2024-01-01", Some("xAB-12x"), None)));
        assert!(!filter.matches(&factura(1, "2024-01-01", None, None)));
    }

    #[test]
    fn test_effective_limit_is_clamped() {
        assert_eq!(Page::new(5000, 0).effective_limit(), MAX_LIST_LIMIT);
        assert_eq!(Page::new(10, 0).effective_limit(), 10);
        assert_eq!(Page::default().offset, 0);
    }
}
