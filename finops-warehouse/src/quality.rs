//! Data-quality checks on raw rows.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::{RawBillingRow, RawResourceRow};

/// A problem found in a raw dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    /// At least one required field is missing.
    NullValues,
    /// A resource id appears on more than one row.
    DuplicateResourceIds,
    /// At least one billing row has a cost below zero.
    NegativeCosts,
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NullValues => "NULL values found",
            Self::DuplicateResourceIds => "Duplicate resource IDs found",
            Self::NegativeCosts => "Negative costs detected",
        })
    }
}

fn has_duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = HashSet::new();
    ids.into_iter().any(|id| !seen.insert(id))
}

/// Check billing rows for nulls, repeated resource ids, and negative costs.
pub fn check_billing(rows: &[RawBillingRow]) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    if rows.iter().any(RawBillingRow::has_nulls) {
        issues.push(QualityIssue::NullValues);
    }
    if has_duplicates(rows.iter().filter_map(|r| r.resource_id.as_deref())) {
        issues.push(QualityIssue::DuplicateResourceIds);
    }
    if rows.iter().any(|r| r.cost.is_some_and(|c| c < 0.0)) {
        issues.push(QualityIssue::NegativeCosts);
    }
    issues
}

/// Check resource rows for nulls and repeated resource ids.
pub fn check_resources(rows: &[RawResourceRow]) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    if rows.iter().any(RawResourceRow::has_nulls) {
        issues.push(QualityIssue::NullValues);
    }
    if has_duplicates(rows.iter().filter_map(|r| r.resource_id.as_deref())) {
        issues.push(QualityIssue::DuplicateResourceIds);
    }
    issues
}
