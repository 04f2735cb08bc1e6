//! SQLite record store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use reparto_core::audit::diff_facturas;
use reparto_core::error::{RepartoError, RepartoResult};
use reparto_core::traits::RecordStore;
use reparto_core::types::{
    Archivo, ChangeSet, Factura, FacturaFilter, FacturaPatch, HistoryEntry, NewArchivo,
    NewFactura, Page,
};

const FECHA_FORMAT: &str = "%Y-%m-%d";

/// Durable record store over SQLite.
///
/// Multi-statement writes (create, update + history) run inside a
/// transaction; dropping an uncommitted transaction rolls it back, so a
/// failed create never leaves orphan attachments behind.
pub struct SqlStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlStore {
    /// Open (or create) the database at `db_path` and ensure the schema.
    pub fn new(db_path: impl AsRef<Path>) -> RepartoResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = if db_path.as_ref().to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            Connection::open(db_path.as_ref())
        }?;

        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_schema()?;

        Ok(store)
    }

    fn create_schema(&self) -> RepartoResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS facturas (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                cliente       INTEGER NOT NULL,
                dia           TEXT,
                fecha         TEXT NOT NULL,
                conductor_xp  TEXT,
                camion        TEXT,
                local         TEXT,
                carga         TEXT,
                observaciones TEXT,
                estado        TEXT,
                vueltas       INTEGER,
                kg            REAL,
                guia          TEXT,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS factura_archivos (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                factura_id INTEGER NOT NULL REFERENCES facturas(id) ON DELETE CASCADE,
                filename   TEXT NOT NULL,
                mimetype   TEXT NOT NULL,
                size       INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS factura_historial (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                factura_id INTEGER NOT NULL REFERENCES facturas(id) ON DELETE CASCADE,
                changes    TEXT NOT NULL,
                changed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_facturas_fecha ON facturas(fecha);
            CREATE INDEX IF NOT EXISTS idx_facturas_cliente ON facturas(cliente);
            CREATE INDEX IF NOT EXISTS idx_facturas_guia ON facturas(guia);
            CREATE INDEX IF NOT EXISTS idx_archivos_factura_id ON factura_archivos(factura_id);
            CREATE INDEX IF NOT EXISTS idx_historial_factura_id ON factura_historial(factura_id);
            "#,
        )?;
        Ok(())
    }

    /// Translate a filter into a WHERE fragment plus its parameters.
    ///
    /// Must select exactly the rows `FacturaFilter::matches` accepts: LOWER
    /// is ASCII-only like the in-memory fold, absent columns coalesce to the
    /// empty string, and LIKE metacharacters in `q` are escaped.
    fn build_where(filter: &FacturaFilter) -> (String, Vec<SqlValue>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(cliente) = filter.cliente {
            clauses.push("cliente = ?".to_string());
            values.push(SqlValue::Integer(cliente));
        }
        if let Some(fecha) = filter.fecha {
            clauses.push("fecha = ?".to_string());
            values.push(SqlValue::Text(fecha.format(FECHA_FORMAT).to_string()));
        }
        if let Some(desde) = filter.desde {
            clauses.push("fecha >= ?".to_string());
            values.push(SqlValue::Text(desde.format(FECHA_FORMAT).to_string()));
        }
        if let Some(hasta) = filter.hasta {
            clauses.push("fecha <= ?".to_string());
            values.push(SqlValue::Text(hasta.format(FECHA_FORMAT).to_string()));
        }
        if let Some(guia) = &filter.guia {
            clauses.push("LOWER(COALESCE(guia, '')) = LOWER(?)".to_string());
            values.push(SqlValue::Text(guia.clone()));
        }
        if let Some(q) = &filter.q {
            let pattern = format!("%{}%", escape_like(&q.to_ascii_lowercase()));
            let columns = [
                "guia",
                "conductor_xp",
                "camion",
                "local",
                "carga",
                "observaciones",
            ];
            let ors: Vec<String> = columns
                .iter()
                .map(|col| format!(r"LOWER(COALESCE({}, '')) LIKE ? ESCAPE '\'", col))
                .collect();
            clauses.push(format!("({})", ors.join(" OR ")));
            for _ in columns {
                values.push(SqlValue::Text(pattern.clone()));
            }
        }

        let fragment = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        (fragment, values)
    }

    fn fetch_factura(conn: &Connection, id: i64) -> RepartoResult<Option<Factura>> {
        let factura = conn
            .query_row(
                "SELECT id, cliente, dia, fecha, conductor_xp, camion, local, carga,
                        observaciones, estado, vueltas, kg, guia, created_at
                 FROM facturas WHERE id = ?1",
                [id],
                map_factura,
            )
            .optional()?;

        match factura {
            Some(mut factura) => {
                factura.archivos = Self::fetch_archivos(conn, id)?;
                Ok(Some(factura))
            }
            None => Ok(None),
        }
    }

    fn fetch_archivos(conn: &Connection, factura_id: i64) -> RepartoResult<Vec<Archivo>> {
        let mut stmt = conn.prepare(
            "SELECT id, factura_id, filename, mimetype, size
             FROM factura_archivos WHERE factura_id = ?1 ORDER BY id",
        )?;
        let archivos = stmt
            .query_map([factura_id], |row| {
                Ok(Archivo {
                    id: row.get(0)?,
                    factura_id: row.get(1)?,
                    filename: row.get(2)?,
                    mimetype: row.get(3)?,
                    size: row.get::<_, i64>(4)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(archivos)
    }

    fn factura_exists(conn: &Connection, id: i64) -> RepartoResult<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM facturas WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl RecordStore for SqlStore {
    async fn create(
        &self,
        factura: NewFactura,
        archivos: Vec<NewArchivo>,
    ) -> RepartoResult<i64> {
        NewArchivo::validate_batch(&archivos)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO facturas (cliente, dia, fecha, conductor_xp, camion, local, carga,
                                   observaciones, estado, vueltas, kg, guia, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                factura.cliente,
                factura.dia,
                factura.fecha.format(FECHA_FORMAT).to_string(),
                factura.conductor_xp,
                factura.camion,
                factura.local,
                factura.carga,
                factura.observaciones,
                factura.estado,
                factura.vueltas.map(i64::from),
                factura.kg,
                factura.guia,
                created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO factura_archivos (factura_id, filename, mimetype, size)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for archivo in &archivos {
                stmt.execute(params![
                    id,
                    archivo.filename,
                    archivo.mimetype,
                    archivo.size as i64
                ])?;
            }
        }

        tx.commit()?;
        debug!(factura_id = id, archivos = archivos.len(), "factura created");
        Ok(id)
    }

    async fn get(&self, id: i64) -> RepartoResult<Factura> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_factura(&conn, id)?.ok_or_else(|| RepartoError::not_found(id))
    }

    async fn list(&self, filter: &FacturaFilter, page: Page) -> RepartoResult<Vec<Factura>> {
        let conn = self.conn.lock().unwrap();
        let (fragment, mut values) = Self::build_where(filter);

        let sql = format!(
            "SELECT id, cliente, dia, fecha, conductor_xp, camion, local, carga,
                    observaciones, estado, vueltas, kg, guia, created_at
             FROM facturas{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            fragment
        );
        values.push(SqlValue::Integer(page.effective_limit() as i64));
        values.push(SqlValue::Integer(page.offset as i64));

        let mut stmt = conn.prepare(&sql)?;
        let mut facturas = stmt
            .query_map(params_from_iter(values), map_factura)?
            .collect::<Result<Vec<_>, _>>()?;

        for factura in &mut facturas {
            factura.archivos = Self::fetch_archivos(&conn, factura.id)?;
        }
        Ok(facturas)
    }

    async fn update(&self, id: i64, patch: FacturaPatch) -> RepartoResult<Factura> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let old =
            Self::fetch_factura(&tx, id)?.ok_or_else(|| RepartoError::not_found(id))?;
        let new = patch.apply_to(&old)?;
        let changes = diff_facturas(&old, &new);

        if !changes.is_empty() {
            tx.execute(
                "UPDATE facturas SET cliente = ?1, dia = ?2, fecha = ?3, conductor_xp = ?4,
                        camion = ?5, local = ?6, carga = ?7, observaciones = ?8, estado = ?9,
                        vueltas = ?10, kg = ?11, guia = ?12
                 WHERE id = ?13",
                params![
                    new.cliente,
                    new.dia,
                    new.fecha.format(FECHA_FORMAT).to_string(),
                    new.conductor_xp,
                    new.camion,
                    new.local,
                    new.carga,
                    new.observaciones,
                    new.estado,
                    new.vueltas.map(i64::from),
                    new.kg,
                    new.guia,
                    id,
                ],
            )?;
            tx.execute(
                "INSERT INTO factura_historial (factura_id, changes, changed_at)
                 VALUES (?1, ?2, ?3)",
                params![id, serde_json::to_string(&changes)?, Utc::now().to_rfc3339()],
            )?;
            debug!(factura_id = id, fields = changes.len(), "factura updated");
        }

        tx.commit()?;
        Ok(new)
    }

    async fn history(&self, id: i64) -> RepartoResult<Vec<HistoryEntry>> {
        let conn = self.conn.lock().unwrap();
        if !Self::factura_exists(&conn, id)? {
            return Err(RepartoError::not_found(id));
        }

        let mut stmt = conn.prepare(
            "SELECT id, factura_id, changes, changed_at
             FROM factura_historial WHERE factura_id = ?1
             ORDER BY changed_at DESC, id DESC",
        )?;
        let entries = stmt
            .query_map([id], |row| {
                let changes_raw: String = row.get(2)?;
                let changes: ChangeSet = serde_json::from_str(&changes_raw)
                    .map_err(|e| conversion_error(2, e))?;
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    factura_id: row.get(1)?,
                    changes,
                    changed_at: parse_timestamp(row.get::<_, String>(3)?, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn backend_name(&self) -> &'static str {
        "sql"
    }
}

fn map_factura(row: &rusqlite::Row<'_>) -> rusqlite::Result<Factura> {
    let fecha_raw: String = row.get(3)?;
    let fecha = NaiveDate::parse_from_str(&fecha_raw, FECHA_FORMAT)
        .map_err(|e| conversion_error(3, e))?;

    Ok(Factura {
        id: row.get(0)?,
        cliente: row.get(1)?,
        dia: row.get(2)?,
        fecha,
        conductor_xp: row.get(4)?,
        camion: row.get(5)?,
        local: row.get(6)?,
        carga: row.get(7)?,
        observaciones: row.get(8)?,
        estado: row.get(9)?,
        vueltas: row.get::<_, Option<i64>>(10)?.map(|v| v as u32),
        kg: row.get(11)?,
        guia: row.get(12)?,
        created_at: parse_timestamp(row.get::<_, String>(13)?, 13)?,
        archivos: Vec::new(),
    })
}

fn parse_timestamp(raw: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

/// Escape LIKE metacharacters so user input cannot widen a `q` match.
fn escape_like(s: &str) -> String {
    s.replace('\\', r"\\").replace('%', r"\%").replace('_', r"\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nueva(cliente: i64, fecha: &str, guia: Option<&str>) -> NewFactura {
        NewFactura {
            cliente,
            dia: None,
            fecha: NaiveDate::parse_from_str(fecha, FECHA_FORMAT).unwrap(),
            conductor_xp: None,
            camion: None,
            local: None,
            carga: None,
            observaciones: None,
            estado: None,
            vueltas: None,
            kg: None,
            guia: guia.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_with_archivos() {
        let store = SqlStore::new(":memory:").unwrap();
        let archivos = vec![
            NewArchivo::new("guia.pdf", "application/pdf", 1024),
            NewArchivo::new("foto.jpg", "image/jpeg", 2048),
        ];

        let id = store
            .create(nueva(1, "2024-01-01", Some("A-1")), archivos)
            .await
            .unwrap();
        assert_eq!(id, 1);

        let factura = store.get(id).await.unwrap();
        assert_eq!(factura.cliente, 1);
        assert_eq!(factura.guia.as_deref(), Some("A-1"));
        assert_eq!(factura.archivos.len(), 2);
        assert_eq!(factura.archivos[0].filename, "guia.pdf");
        assert_eq!(factura.archivos[1].size, 2048);
    }

    #[tokio::test]
    async fn test_ids_strictly_increase() {
        let store = SqlStore::new(":memory:").unwrap();
        let a = store
            .create(nueva(1, "2024-01-01", None), Vec::new())
            .await
            .unwrap();
        let b = store
            .create(nueva(2, "2024-01-02", None), Vec::new())
            .await
            .unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_over_limit_archivos_rejected_without_writes() {
        let store = SqlStore::new(":memory:").unwrap();
        let archivos: Vec<NewArchivo> = (0..6)
            .map(|i| NewArchivo::new(format!("f{}.pdf", i), "application/pdf", 10))
            .collect();

        let err = store
            .create(nueva(1, "2024-01-01", None), archivos)
            .await
            .unwrap_err();
        assert!(matches!(err, RepartoError::Validation { .. }));

        let listed = store
            .list(&FacturaFilter::default(), Page::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_update_writes_history_once() {
        let store = SqlStore::new(":memory:").unwrap();
        let id = store
            .create(nueva(1, "2024-01-01", Some("A-1")), Vec::new())
            .await
            .unwrap();

        let patch = FacturaPatch {
            guia: Some("A-2".to_string()),
            ..Default::default()
        };
        let updated = store.update(id, patch.clone()).await.unwrap();
        assert_eq!(updated.guia.as_deref(), Some("A-2"));

        // same values again: no-op, no second entry
        store.update(id, patch).await.unwrap();

        let history = store.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0].changes["guia"].from,
            json!("A-1")
        );
        assert_eq!(history[0].changes["guia"].to, json!("A-2"));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = SqlStore::new(":memory:").unwrap();
        let err = store
            .update(99, FacturaPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepartoError::NotFound { .. }));

        let err = store.history(99).await.unwrap_err();
        assert!(matches!(err, RepartoError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = SqlStore::new(":memory:").unwrap();
        store
            .create(nueva(1, "2024-01-01", Some("A-1")), Vec::new())
            .await
            .unwrap();
        store
            .create(nueva(2, "2024-01-15", Some("B-1")), Vec::new())
            .await
            .unwrap();
        store
            .create(nueva(1, "2024-02-01", None), Vec::new())
            .await
            .unwrap();

        let todos = store
            .list(&FacturaFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(todos.len(), 3);
        // newest first
        assert!(todos[0].id > todos[1].id);

        let cliente1 = store
            .list(&FacturaFilter::default().with_cliente(1), Page::default())
            .await
            .unwrap();
        assert_eq!(cliente1.len(), 2);

        let enero = store
            .list(
                &FacturaFilter::default().with_rango(
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                ),
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(enero.len(), 2);

        let por_guia = store
            .list(&FacturaFilter::default().with_guia("b-1"), Page::default())
            .await
            .unwrap();
        assert_eq!(por_guia.len(), 1);
        assert_eq!(por_guia[0].guia.as_deref(), Some("B-1"));
    }

    #[tokio::test]
    async fn test_q_like_metacharacters_are_literal() {
        let store = SqlStore::new(":memory:").unwrap();
        let mut con_pct = nueva(1, "2024-01-01", None);
        con_pct.observaciones = Some("descuento 10% aplicado".to_string());
        store.create(con_pct, Vec::new()).await.unwrap();

        let mut sin_pct = nueva(2, "2024-01-02", None);
        sin_pct.observaciones = Some("descuento 10 aplicado".to_string());
        store.create(sin_pct, Vec::new()).await.unwrap();

        let hits = store
            .list(&FacturaFilter::default().with_q("10%"), Page::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].cliente, 1);
    }
}
