//! Idle-resource detection.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::month::InvoiceMonth;
use crate::store::Warehouse;

/// Usage below which a resource is considered idle.
pub const DEFAULT_IDLE_THRESHOLD: f64 = 5.0;

/// Maximum number of idle resources reported.
pub const IDLE_RESULT_LIMIT: usize = 200;

/// A resource whose summed usage stayed under the idle threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdleResource {
    pub resource_id: String,
    pub service: String,
    pub resource_group: String,
    pub usage_qty: f64,
    pub total_cost: f64,
    /// What shutting the resource off would save, to the cent.
    pub estimated_monthly_saving: f64,
}

impl Warehouse {
    /// Resources whose usage summed over `month` (or all months) is below
    /// `threshold`, most expensive first.
    pub fn find_idle_resources(
        &self,
        threshold: f64,
        month: Option<&InvoiceMonth>,
    ) -> Result<Vec<IdleResource>> {
        let conn = self.conn()?;
        let where_clause = if month.is_some() { "WHERE invoice_month = ?2" } else { "" };
        let sql = format!(
            "SELECT resource_id, service, resource_group,
                    SUM(usage_qty) AS usage_qty, SUM(cost) AS total_cost
             FROM billing
             {where_clause}
             GROUP BY resource_id, service, resource_group
             HAVING SUM(usage_qty) < ?1
             ORDER BY total_cost DESC
             LIMIT {IDLE_RESULT_LIMIT}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<IdleResource> {
            let total_cost: f64 = row.get(4)?;
            Ok(IdleResource {
                resource_id: row.get(0)?,
                service: row.get(1)?,
                resource_group: row.get(2)?,
                usage_qty: row.get(3)?,
                total_cost,
                estimated_monthly_saving: (total_cost * 100.0).round() / 100.0,
            })
        };
        let idle = match month {
            Some(month) => stmt
                .query_map(rusqlite::params![threshold, month.as_str()], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map(rusqlite::params![threshold], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        info!(
            threshold,
            month = ?month.map(InvoiceMonth::as_str),
            idle_count = idle.len(),
            "found idle resources"
        );
        Ok(idle)
    }
}
