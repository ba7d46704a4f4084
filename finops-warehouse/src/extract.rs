//! CSV extraction.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::Result;
use crate::records::{RawBillingRow, RawResourceRow};

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    info!(path = %path.display(), row_count = rows.len(), "read csv");
    Ok(rows)
}

/// Read a billing export. Empty cells become `None`.
pub fn read_billing_csv(path: impl AsRef<Path>) -> Result<Vec<RawBillingRow>> {
    read_csv(path.as_ref())
}

/// Read a resource metadata export. Empty cells become `None`.
pub fn read_resources_csv(path: impl AsRef<Path>) -> Result<Vec<RawResourceRow>> {
    read_csv(path.as_ref())
}
