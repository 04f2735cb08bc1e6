//! Audit-trail types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One field's transition inside an audit entry. `null` stands for an
/// absent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: serde_json::Value,
    pub to: serde_json::Value,
}

/// Field name → transition. Ordered so serialized entries are stable.
pub type ChangeSet = BTreeMap<String, FieldChange>;

/// An append-only record of one update's field-level changes. Never written
/// with an empty `changes` map; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub factura_id: i64,
    pub changes: ChangeSet,
    pub changed_at: DateTime<Utc>,
}
