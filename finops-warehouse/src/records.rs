//! Billing and resource records, raw and cleaned.

use serde::{Deserialize, Serialize};

/// One line-item of a cloud invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingRecord {
    pub invoice_month: String,
    pub account_id: String,
    pub subscription: String,
    pub service: String,
    pub resource_group: String,
    pub resource_id: String,
    pub region: String,
    pub usage_qty: f64,
    pub unit_cost: f64,
    pub cost: f64,
}

/// Ownership and tagging metadata for a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRecord {
    pub resource_id: String,
    /// Missing owner tags are common and kept as `None`.
    pub owner: Option<String>,
    pub env: String,
    pub tags_json: String,
}

/// A billing CSV row before cleaning; any field may be missing.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawBillingRow {
    pub invoice_month: Option<String>,
    pub account_id: Option<String>,
    pub subscription: Option<String>,
    pub service: Option<String>,
    pub resource_group: Option<String>,
    pub resource_id: Option<String>,
    pub region: Option<String>,
    pub usage_qty: Option<f64>,
    pub unit_cost: Option<f64>,
    pub cost: Option<f64>,
}

impl RawBillingRow {
    pub fn has_nulls(&self) -> bool {
        self.invoice_month.is_none()
            || self.account_id.is_none()
            || self.subscription.is_none()
            || self.service.is_none()
            || self.resource_group.is_none()
            || self.resource_id.is_none()
            || self.region.is_none()
            || self.usage_qty.is_none()
            || self.unit_cost.is_none()
            || self.cost.is_none()
    }

    /// Convert to a [`BillingRecord`], or `None` if any field is missing.
    pub fn into_record(self) -> Option<BillingRecord> {
        Some(BillingRecord {
            invoice_month: self.invoice_month?,
            account_id: self.account_id?,
            subscription: self.subscription?,
            service: self.service?,
            resource_group: self.resource_group?,
            resource_id: self.resource_id?,
            region: self.region?,
            usage_qty: self.usage_qty?,
            unit_cost: self.unit_cost?,
            cost: self.cost?,
        })
    }
}

/// A resources CSV row before cleaning.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawResourceRow {
    pub resource_id: Option<String>,
    pub owner: Option<String>,
    pub env: Option<String>,
    pub tags_json: Option<String>,
}

impl RawResourceRow {
    /// `owner` is optional and never counts as a null.
    pub fn has_nulls(&self) -> bool {
        self.resource_id.is_none() || self.env.is_none() || self.tags_json.is_none()
    }

    pub fn into_record(self) -> Option<ResourceRecord> {
        Some(ResourceRecord {
            resource_id: self.resource_id?,
            owner: self.owner,
            env: self.env?,
            tags_json: self.tags_json?,
        })
    }
}
