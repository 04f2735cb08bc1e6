//! Input validation and coercion for factura writes.
//!
//! Values arrive from the HTTP boundary as loosely typed form/JSON input, so
//! numeric fields accept either JSON numbers or numeric strings. All
//! validation happens here, before a store is reached; a draft that fails to
//! validate never causes a write.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{RepartoError, RepartoResult};
use crate::types::{Archivo, Factura};

/// Untrusted creation input, as received from the HTTP boundary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FacturaDraft {
    pub cliente: Option<Value>,
    pub dia: Option<String>,
    pub fecha: Option<String>,
    pub conductor_xp: Option<String>,
    pub camion: Option<String>,
    pub local: Option<String>,
    pub carga: Option<String>,
    pub observaciones: Option<String>,
    pub estado: Option<String>,
    pub vueltas: Option<Value>,
    pub kg: Option<Value>,
    pub guia: Option<String>,
}

/// A validated factura, ready for a store to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFactura {
    pub cliente: i64,
    pub dia: Option<String>,
    pub fecha: NaiveDate,
    pub conductor_xp: Option<String>,
    pub camion: Option<String>,
    pub local: Option<String>,
    pub carga: Option<String>,
    pub observaciones: Option<String>,
    pub estado: Option<String>,
    pub vueltas: Option<u32>,
    pub kg: Option<f64>,
    pub guia: Option<String>,
}

/// Partial update input. Absent fields (and JSON `null`) retain the stored
/// value; an explicit empty string clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FacturaPatch {
    pub cliente: Option<Value>,
    pub dia: Option<String>,
    pub fecha: Option<String>,
    pub conductor_xp: Option<String>,
    pub camion: Option<String>,
    pub local: Option<String>,
    pub carga: Option<String>,
    pub observaciones: Option<String>,
    pub estado: Option<String>,
    pub vueltas: Option<Value>,
    pub kg: Option<Value>,
    pub guia: Option<String>,
}

impl FacturaDraft {
    /// Validate and coerce the draft into a `NewFactura`.
    pub fn validate(self) -> RepartoResult<NewFactura> {
        let cliente = match self.cliente.as_ref().map(coerce_cliente).transpose()? {
            Some(Some(c)) => c,
            _ => {
                return Err(RepartoError::validation_field(
                    "cliente",
                    "cliente is required",
                ))
            }
        };

        let fecha = match self.fecha.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => parse_fecha(s)?,
            _ => {
                return Err(RepartoError::validation_field(
                    "fecha",
                    "fecha is required",
                ))
            }
        };

        Ok(NewFactura {
            cliente,
            dia: self.dia.as_deref().and_then(clean_text),
            fecha,
            conductor_xp: self.conductor_xp.as_deref().and_then(clean_text),
            camion: self.camion.as_deref().and_then(clean_text),
            local: self.local.as_deref().and_then(clean_text),
            carga: self.carga.as_deref().and_then(clean_text),
            observaciones: self.observaciones.as_deref().and_then(clean_text),
            estado: self.estado.as_deref().and_then(clean_text),
            vueltas: self.vueltas.as_ref().map(|v| coerce_vueltas(v)).transpose()?.flatten(),
            kg: self.kg.as_ref().map(|v| coerce_kg(v)).transpose()?.flatten(),
            guia: self.guia.as_deref().and_then(clean_text),
        })
    }
}

impl NewFactura {
    /// Materialize the record with store-assigned identity fields.
    pub fn into_factura(
        self,
        id: i64,
        created_at: DateTime<Utc>,
        archivos: Vec<Archivo>,
    ) -> Factura {
        Factura {
            id,
            cliente: self.cliente,
            dia: self.dia,
            fecha: self.fecha,
            conductor_xp: self.conductor_xp,
            camion: self.camion,
            local: self.local,
            carga: self.carga,
            observaciones: self.observaciones,
            estado: self.estado,
            vueltas: self.vueltas,
            kg: self.kg,
            guia: self.guia,
            created_at,
            archivos,
        }
    }
}

impl FacturaPatch {
    /// Apply the patch to a stored factura, producing the post-update state.
    ///
    /// `id`, `created_at`, and the attachment list are carried over
    /// untouched. Required fields (`cliente`, `fecha`) treat an empty string
    /// the same as absent, so a cleared form input cannot blank them.
    pub fn apply_to(&self, current: &Factura) -> RepartoResult<Factura> {
        let mut next = current.clone();

        if let Some(value) = &self.cliente {
            if let Some(cliente) = coerce_cliente(value)? {
                next.cliente = cliente;
            }
        }
        if let Some(s) = self.fecha.as_deref() {
            let s = s.trim();
            if !s.is_empty() {
                next.fecha = parse_fecha(s)?;
            }
        }
        if let Some(s) = self.dia.as_deref() {
            next.dia = clean_text(s);
        }
        if let Some(s) = self.conductor_xp.as_deref() {
            next.conductor_xp = clean_text(s);
        }
        if let Some(s) = self.camion.as_deref() {
            next.camion = clean_text(s);
        }
        if let Some(s) = self.local.as_deref() {
            next.local = clean_text(s);
        }
        if let Some(s) = self.carga.as_deref() {
            next.carga = clean_text(s);
        }
        if let Some(s) = self.observaciones.as_deref() {
            next.observaciones = clean_text(s);
        }
        if let Some(s) = self.estado.as_deref() {
            next.estado = clean_text(s);
        }
        if let Some(value) = &self.vueltas {
            next.vueltas = coerce_vueltas(value)?;
        }
        if let Some(value) = &self.kg {
            next.kg = coerce_kg(value)?;
        }
        if let Some(s) = self.guia.as_deref() {
            next.guia = clean_text(s);
        }

        Ok(next)
    }
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_fecha(s: &str) -> RepartoResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        RepartoError::validation_field("fecha", format!("invalid fecha '{}', expected YYYY-MM-DD", s))
    })
}

/// Empty and whitespace-only strings are treated as "no value".
fn clean_text(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn coerce_cliente(value: &Value) -> RepartoResult<Option<i64>> {
    let cliente = match coerce_i64("cliente", value)? {
        Some(c) => c,
        None => return Ok(None),
    };
    if cliente <= 0 {
        return Err(RepartoError::validation_field(
            "cliente",
            format!("cliente must be a positive integer, got {}", cliente),
        ));
    }
    Ok(Some(cliente))
}

fn coerce_vueltas(value: &Value) -> RepartoResult<Option<u32>> {
    match value {
        Value::Number(n) => match n.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(v) => Ok(Some(v)),
            None => Err(invalid_number("vueltas", value)),
        },
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| invalid_number("vueltas", value)),
        _ => Err(invalid_number("vueltas", value)),
    }
}

fn coerce_kg(value: &Value) -> RepartoResult<Option<f64>> {
    let kg = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match kg {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(invalid_number("kg", value)),
    }
}

fn coerce_i64(field: &str, value: &Value) -> RepartoResult<Option<i64>> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(v) => Ok(Some(v)),
            None => Err(invalid_number(field, value)),
        },
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid_number(field, value)),
        _ => Err(invalid_number(field, value)),
    }
}

fn invalid_number(field: &str, value: &Value) -> RepartoError {
    RepartoError::validation_field(field, format!("invalid numeric value for {}: {}", field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_draft() -> FacturaDraft {
        FacturaDraft {
            cliente: Some(json!("12")),
            fecha: Some("2024-01-01".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_coerces_numeric_strings() {
        let mut draft = base_draft();
        draft.vueltas = Some(json!("3"));
        draft.kg = Some(json!("120.5"));

        let nueva = draft.validate().unwrap();
        assert_eq!(nueva.cliente, 12);
        assert_eq!(nueva.vueltas, Some(3));
        assert_eq!(nueva.kg, Some(120.5));
    }

    #[test]
    fn test_validate_accepts_json_numbers() {
        let mut draft = base_draft();
        draft.cliente = Some(json!(7));
        draft.vueltas = Some(json!(2));

        let nueva = draft.validate().unwrap();
        assert_eq!(nueva.cliente, 7);
        assert_eq!(nueva.vueltas, Some(2));
    }

    #[test]
    fn test_validate_requires_cliente() {
        let mut draft = base_draft();
        draft.cliente = None;
        assert_eq!(draft.validate().unwrap_err().field(), Some("cliente"));

        let mut draft = base_draft();
        draft.cliente = Some(json!(""));
        assert_eq!(draft.validate().unwrap_err().field(), Some("cliente"));
    }

    #[test]
    fn test_validate_rejects_non_numeric_cliente() {
        let mut draft = base_draft();
        draft.cliente = Some(json!("doce"));
        assert_eq!(draft.validate().unwrap_err().field(), Some("cliente"));
    }

    #[test]
    fn test_validate_rejects_bad_fecha() {
        let mut draft = base_draft();
        draft.fecha = Some("01/01/2024".to_string());
        assert_eq!(draft.validate().unwrap_err().field(), Some("fecha"));
    }

    #[test]
    fn test_validate_rejects_negative_vueltas() {
        let mut draft = base_draft();
        draft.vueltas = Some(json!(-1));
        assert_eq!(draft.validate().unwrap_err().field(), Some("vueltas"));
    }

    #[test]
    fn test_empty_strings_become_none() {
        let mut draft = base_draft();
        draft.guia = Some("  ".to_string());
        draft.kg = Some(json!(""));

        let nueva = draft.validate().unwrap();
        assert_eq!(nueva.guia, None);
        assert_eq!(nueva.kg, None);
    }

    #[test]
    fn test_patch_retains_absent_fields() {
        let factura = sample_factura();
        let patch = FacturaPatch {
            guia: Some("B-9".to_string()),
            ..Default::default()
        };

        let next = patch.apply_to(&factura).unwrap();
        assert_eq!(next.guia.as_deref(), Some("B-9"));
        assert_eq!(next.cliente, factura.cliente);
        assert_eq!(next.observaciones, factura.observaciones);
        assert_eq!(next.id, factura.id);
        assert_eq!(next.created_at, factura.created_at);
    }

    #[test]
    fn test_patch_empty_string_clears_optional_field() {
        let factura = sample_factura();
        let patch = FacturaPatch {
            observaciones: Some(String::new()),
            ..Default::default()
        };

        let next = patch.apply_to(&factura).unwrap();
        assert_eq!(next.observaciones, None);
    }

    #[test]
    fn test_patch_empty_string_keeps_required_field() {
        let factura = sample_factura();
        let patch = FacturaPatch {
            cliente: Some(json!("")),
            fecha: Some(String::new()),
            ..Default::default()
        };

        let next = patch.apply_to(&factura).unwrap();
        assert_eq!(next.cliente, factura.cliente);
        assert_eq!(next.fecha, factura.fecha);
    }

    #[test]
    fn test_patch_rejects_malformed_numeric() {
        let factura = sample_factura();
        let patch = FacturaPatch {
            kg: Some(json!("mucho")),
            ..Default::default()
        };
        assert_eq!(patch.apply_to(&factura).unwrap_err().field(), Some("kg"));
    }

    fn sample_factura() -> Factura {
        NewFactura {
            cliente: 12,
            dia: Some("lunes".to_string()),
            fecha: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            conductor_xp: None,
            camion: Some("AB-1234".to_string()),
            local: None,
            carga: None,
            observaciones: Some("frágil".to_string()),
            estado: None,
            vueltas: Some(1),
            kg: Some(80.0),
            guia: Some("A-1".to_string()),
        }
        .into_factura(1, Utc::now(), Vec::new())
    }
}
