//! Field-level change auditing.
//!
//! The audited set is an explicit list rather than a reflection over the
//! struct: adding a Factura field only becomes auditable (and only shows up
//! in history entries) through a conscious edit here and in `field_value`.

use serde_json::{json, Value};

use crate::types::{ChangeSet, Factura, FieldChange};

/// Every mutable business field of a factura. `id`, `created_at`, and the
/// attachment list are identity/ownership data, not auditable fields.
pub const AUDITED_FIELDS: [&str; 12] = [
    "cliente",
    "dia",
    "fecha",
    "conductor_xp",
    "camion",
    "local",
    "carga",
    "observaciones",
    "estado",
    "vueltas",
    "kg",
    "guia",
];

/// Compute the minimal field-level diff between two versions of a factura.
///
/// Absent values are rendered as JSON `null` on either side. An empty
/// result means the update was a no-op and no history entry may be written.
pub fn diff_facturas(old: &Factura, new: &Factura) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for field in AUDITED_FIELDS {
        let from = field_value(old, field);
        let to = field_value(new, field);
        if from != to {
            changes.insert(field.to_string(), FieldChange { from, to });
        }
    }
    changes
}

fn field_value(factura: &Factura, field: &str) -> Value {
    match field {
        "cliente" => json!(factura.cliente),
        "dia" => opt_text(&factura.dia),
        "fecha" => json!(factura.fecha.format("%Y-%m-%d").to_string()),
        "conductor_xp" => opt_text(&factura.conductor_xp),
        "camion" => opt_text(&factura.camion),
        "local" => opt_text(&factura.local),
        "carga" => opt_text(&factura.carga),
        "observaciones" => opt_text(&factura.observaciones),
        "estado" => opt_text(&factura.estado),
        "vueltas" => factura.vueltas.map_or(Value::Null, |v| json!(v)),
        "kg" => factura.kg.map_or(Value::Null, |v| json!(v)),
        "guia" => opt_text(&factura.guia),
        _ => Value::Null,
    }
}

fn opt_text(value: &Option<String>) -> Value {
    value.as_deref().map_or(Value::Null, |s| json!(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewFactura;
    use chrono::{NaiveDate, Utc};

    fn sample() -> Factura {
        NewFactura {
            cliente: 1,
            dia: None,
            fecha: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            conductor_xp: None,
            camion: None,
            local: None,
            carga: None,
            observaciones: None,
            estado: None,
            vueltas: None,
            kg: None,
            guia: Some("A-1".to_string()),
        }
        .into_factura(1, Utc::now(), Vec::new())
    }

    #[test]
    fn test_identical_facturas_produce_empty_diff() {
        let factura = sample();
        assert!(diff_facturas(&factura, &factura.clone()).is_empty());
    }

    #[test]
    fn test_diff_records_from_and_to() {
        let old = sample();
        let mut new = old.clone();
        new.guia = Some("A-2".to_string());
        new.kg = Some(42.5);

        let changes = diff_facturas(&old, &new);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes["guia"],
            FieldChange {
                from: json!("A-1"),
                to: json!("A-2"),
            }
        );
        assert_eq!(
            changes["kg"],
            FieldChange {
                from: Value::Null,
                to: json!(42.5),
            }
        );
    }

    #[test]
    fn test_diff_ignores_identity_fields() {
        let old = sample();
        let mut new = old.clone();
        new.id = 99;
        new.created_at = Utc::now() + chrono::Duration::days(1);

        assert!(diff_facturas(&old, &new).is_empty());
    }

    #[test]
    fn test_applying_diff_reproduces_post_state() {
        // diff soundness: pre-state + recorded transitions = post-state
        let old = sample();
        let mut new = old.clone();
        new.cliente = 8;
        new.observaciones = Some("carga húmeda".to_string());
        new.guia = None;

        let changes = diff_facturas(&old, &new);
        for field in AUDITED_FIELDS {
            let expected = field_value(&new, field);
            match changes.get(field) {
                Some(change) => {
                    assert_eq!(change.from, field_value(&old, field));
                    assert_eq!(change.to, expected);
                }
                None => assert_eq!(field_value(&old, field), expected),
            }
        }
    }
}
