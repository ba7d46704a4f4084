//! Extract → check → transform → load.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::extract::{read_billing_csv, read_resources_csv};
use crate::quality::{QualityIssue, check_billing, check_resources};
use crate::records::{RawBillingRow, RawResourceRow};
use crate::store::Warehouse;
use crate::transform::{clean_billing, clean_resources};

/// What one ETL run read, found, and loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EtlReport {
    /// Rows parsed from the billing CSV.
    pub billing_rows_read: usize,
    /// Billing rows written after cleaning.
    pub billing_rows_loaded: usize,
    /// Issues the billing checks reported before cleaning.
    pub billing_issues: Vec<QualityIssue>,
    /// Rows parsed from the resources CSV.
    pub resource_rows_read: usize,
    /// Resource rows written after cleaning.
    pub resource_rows_loaded: usize,
    /// Issues the resource checks reported before cleaning.
    pub resource_issues: Vec<QualityIssue>,
}

/// Load both CSV exports into `warehouse`, replacing its tables.
///
/// Cleaning rules run only for a dataset whose quality checks reported
/// issues.
pub fn run_etl(
    billing_csv: impl AsRef<Path>,
    resources_csv: impl AsRef<Path>,
    warehouse: &Warehouse,
) -> Result<EtlReport> {
    let raw_billing = read_billing_csv(billing_csv)?;
    let raw_resources = read_resources_csv(resources_csv)?;

    let mut report = EtlReport {
        billing_rows_read: raw_billing.len(),
        resource_rows_read: raw_resources.len(),
        billing_issues: check_billing(&raw_billing),
        resource_issues: check_resources(&raw_resources),
        ..EtlReport::default()
    };

    let billing = if report.billing_issues.is_empty() {
        raw_billing.into_iter().filter_map(RawBillingRow::into_record).collect()
    } else {
        warn!(issues = ?report.billing_issues, "billing data quality issues");
        clean_billing(raw_billing)
    };

    let resources = if report.resource_issues.is_empty() {
        raw_resources.into_iter().filter_map(RawResourceRow::into_record).collect()
    } else {
        warn!(issues = ?report.resource_issues, "resource data quality issues");
        clean_resources(raw_resources)
    };

    report.billing_rows_loaded = warehouse.replace_billing(&billing)?;
    report.resource_rows_loaded = warehouse.replace_resources(&resources)?;

    info!(
        billing_rows = report.billing_rows_loaded,
        resource_rows = report.resource_rows_loaded,
        "etl complete"
    );
    Ok(report)
}
