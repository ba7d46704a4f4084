//! SQLite-backed billing warehouse.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use finops_rag::{RagError, Row, TableSource};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::{debug, info};

use crate::error::{Result, WarehouseError};
use crate::records::{BillingRecord, ResourceRecord};

const BILLING_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS billing (
    invoice_month TEXT NOT NULL,
    account_id TEXT NOT NULL,
    subscription TEXT NOT NULL,
    service TEXT NOT NULL,
    resource_group TEXT NOT NULL,
    resource_id TEXT NOT NULL,
    region TEXT NOT NULL,
    usage_qty REAL NOT NULL,
    unit_cost REAL NOT NULL,
    cost REAL NOT NULL
)";

const RESOURCES_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS resources (
    resource_id TEXT NOT NULL,
    owner TEXT,
    env TEXT NOT NULL,
    tags_json TEXT NOT NULL
)";

/// A single SQLite connection shared behind a mutex.
///
/// Every method is blocking; async callers should go through
/// `tokio::task::spawn_blocking`.
pub struct Warehouse {
    conn: Mutex<Connection>,
}

impl Warehouse {
    /// Open (or create) the warehouse file at `path`, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened warehouse");
        Self::with_connection(conn)
    }

    /// An empty warehouse that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(&format!("{BILLING_SCHEMA};\n{RESOURCES_SCHEMA};"))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| WarehouseError::Lock(e.to_string()))
    }

    /// Replace the `billing` table contents in one transaction.
    pub fn replace_billing(&self, records: &[BillingRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS billing;\n{BILLING_SCHEMA};"))?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO billing (invoice_month, account_id, subscription, service,
                    resource_group, resource_id, region, usage_qty, unit_cost, cost)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for r in records {
                stmt.execute(rusqlite::params![
                    r.invoice_month,
                    r.account_id,
                    r.subscription,
                    r.service,
                    r.resource_group,
                    r.resource_id,
                    r.region,
                    r.usage_qty,
                    r.unit_cost,
                    r.cost,
                ])?;
            }
        }
        tx.commit()?;
        info!(table = "billing", row_count = records.len(), "loaded table");
        Ok(records.len())
    }

    /// Replace the `resources` table contents in one transaction.
    pub fn replace_resources(&self, records: &[ResourceRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS resources;\n{RESOURCES_SCHEMA};"))?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO resources (resource_id, owner, env, tags_json)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for r in records {
                stmt.execute(rusqlite::params![r.resource_id, r.owner, r.env, r.tags_json])?;
            }
        }
        tx.commit()?;
        info!(table = "resources", row_count = records.len(), "loaded table");
        Ok(records.len())
    }

    /// Number of billing line-items.
    pub fn billing_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM billing", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    fn rows_of(&self, table: &str) -> Result<Option<Vec<Row>>> {
        let conn = self.conn()?;
        if !Self::table_exists(&conn, table)? {
            return Ok(None);
        }
        let mut stmt = conn.prepare(&format!("SELECT * FROM \"{table}\""))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut pairs = Vec::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                pairs.push((column.clone(), render_value(row.get_ref(i)?)));
            }
            out.push(pairs);
        }
        debug!(table, row_count = out.len(), "fetched rows");
        Ok(Some(out))
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl TableSource for Warehouse {
    fn fetch_rows(&self, table: &str) -> finops_rag::Result<Vec<Row>> {
        let unavailable = |message: String| RagError::SourceUnavailable {
            source_name: table.to_string(),
            message,
        };
        if !is_identifier(table) {
            return Err(unavailable("not a valid table name".to_string()));
        }
        match self.rows_of(table) {
            Ok(Some(rows)) => Ok(rows),
            Ok(None) => Err(unavailable("table does not exist".to_string())),
            Err(e) => Err(unavailable(e.to_string())),
        }
    }
}
