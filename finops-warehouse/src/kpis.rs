//! Cost KPIs computed with SQL aggregates.
//!
//! All cost sums are rounded to cents by SQLite's `ROUND(.., 2)`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::month::InvoiceMonth;
use crate::store::Warehouse;

/// Number of months reported by [`Warehouse::six_month_trend`].
pub const TREND_MONTHS: usize = 6;

/// Total spend for one month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyTotal {
    /// Month in `YYYY-MM` form.
    pub invoice_month: String,
    /// Sum of line-item cost, rounded to cents.
    pub total_cost: f64,
}

/// Spend for one service within one resource group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceCost {
    /// Cloud service name, e.g. `Compute`.
    pub service: String,
    /// Resource group the cost was billed to.
    pub resource_group: String,
    /// Sum of line-item cost, rounded to cents.
    pub total_cost: f64,
}

/// Spend for one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceCost {
    pub resource_id: String,
    /// Sum of line-item cost, rounded to cents.
    pub total_cost: f64,
}

/// Spend for one resource group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceGroupCost {
    pub resource_group: String,
    /// Sum of line-item cost, rounded to cents.
    pub total_cost: f64,
}

/// A resource ranked by its spend in a month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostDriver {
    pub resource_id: String,
    /// Service the resource belongs to.
    pub service: String,
    /// Resource group the resource belongs to.
    pub resource_group: String,
    /// Sum of line-item cost, rounded to cents.
    pub total_cost: f64,
}

/// The dashboard headline: trend plus a breakdown of the latest month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiSnapshot {
    /// Up to [`TREND_MONTHS`] monthly totals, oldest first.
    pub six_month_trend: Vec<MonthlyTotal>,
    /// The five most expensive resources of the latest month.
    pub top_5_cost_drivers: Vec<CostDriver>,
    /// Per-service cost of the latest month, highest first.
    pub monthly_cost_by_service: Vec<ServiceCost>,
}

impl Warehouse {
    /// Total cost for the latest [`TREND_MONTHS`] months, oldest first.
    pub fn six_month_trend(&self) -> Result<Vec<MonthlyTotal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT invoice_month, ROUND(SUM(cost), 2) AS total_cost
             FROM billing
             GROUP BY invoice_month
             ORDER BY invoice_month DESC
             LIMIT ?1",
        )?;
        let mut trend = stmt
            .query_map([TREND_MONTHS as i64], |row| {
                Ok(MonthlyTotal { invoice_month: row.get(0)?, total_cost: row.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        trend.reverse();
        Ok(trend)
    }

    /// Cost per service and resource group for `month`, highest first.
    pub fn monthly_cost_by_service(&self, month: &InvoiceMonth) -> Result<Vec<ServiceCost>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT service, resource_group, ROUND(SUM(cost), 2) AS total_cost
             FROM billing
             WHERE invoice_month = ?1
             GROUP BY service, resource_group
             ORDER BY total_cost DESC",
        )?;
        let rows = stmt
            .query_map([month.as_str()], |row| {
                Ok(ServiceCost {
                    service: row.get(0)?,
                    resource_group: row.get(1)?,
                    total_cost: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Cost per resource for `month`, highest first.
    pub fn monthly_cost_by_resource(&self, month: &InvoiceMonth) -> Result<Vec<ResourceCost>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT resource_id, ROUND(SUM(cost), 2) AS total_cost
             FROM billing
             WHERE invoice_month = ?1
             GROUP BY resource_id
             ORDER BY total_cost DESC",
        )?;
        let rows = stmt
            .query_map([month.as_str()], |row| {
                Ok(ResourceCost { resource_id: row.get(0)?, total_cost: row.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Cost per resource group for `month`, highest first.
    pub fn monthly_cost_by_resource_group(
        &self,
        month: &InvoiceMonth,
    ) -> Result<Vec<ResourceGroupCost>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT resource_group, ROUND(SUM(cost), 2) AS total_cost
             FROM billing
             WHERE invoice_month = ?1
             GROUP BY resource_group
             ORDER BY total_cost DESC",
        )?;
        let rows = stmt
            .query_map([month.as_str()], |row| {
                Ok(ResourceGroupCost { resource_group: row.get(0)?, total_cost: row.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// The `n` most expensive resources in `month`.
    pub fn top_cost_drivers(&self, month: &InvoiceMonth, n: usize) -> Result<Vec<CostDriver>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT resource_id, service, resource_group, ROUND(SUM(cost), 2) AS total_cost
             FROM billing
             WHERE invoice_month = ?1
             GROUP BY resource_id, service, resource_group
             ORDER BY total_cost DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![month.as_str(), n as i64], |row| {
                Ok(CostDriver {
                    resource_id: row.get(0)?,
                    service: row.get(1)?,
                    resource_group: row.get(2)?,
                    total_cost: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Trend plus the top five drivers and per-service cost of the latest
    /// month. `None` when the warehouse holds no billing data.
    pub fn kpi_snapshot(&self) -> Result<Option<KpiSnapshot>> {
        let trend = self.six_month_trend()?;
        let Some(latest) = trend.last() else {
            return Ok(None);
        };
        let month: InvoiceMonth = latest.invoice_month.parse()?;
        debug!(month = %month, "building kpi snapshot");

        Ok(Some(KpiSnapshot {
            top_5_cost_drivers: self.top_cost_drivers(&month, 5)?,
            monthly_cost_by_service: self.monthly_cost_by_service(&month)?,
            six_month_trend: trend,
        }))
    }
}
