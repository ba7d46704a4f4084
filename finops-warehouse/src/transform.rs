//! Cleaning rules applied when quality checks report issues.

use std::collections::HashSet;

use crate::records::{BillingRecord, RawBillingRow, RawResourceRow, ResourceRecord};

/// Drop incomplete rows, clamp negative costs to zero, and keep the first
/// row for each `(resource_id, invoice_month)`.
pub fn clean_billing(rows: Vec<RawBillingRow>) -> Vec<BillingRecord> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter_map(RawBillingRow::into_record)
        .map(|mut record| {
            if record.cost < 0.0 {
                record.cost = 0.0;
            }
            record
        })
        .filter(|record| seen.insert((record.resource_id.clone(), record.invoice_month.clone())))
        .collect()
}

/// Drop incomplete rows and keep the first row for each `resource_id`.
pub fn clean_resources(rows: Vec<RawResourceRow>) -> Vec<ResourceRecord> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter_map(RawResourceRow::into_record)
        .filter(|record| seen.insert(record.resource_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(resource_id: &str, month: &str, cost: f64) -> RawBillingRow {
        RawBillingRow {
            invoice_month: Some(month.into()),
            account_id: Some("acc-1".into()),
            subscription: Some("sub-1".into()),
            service: Some("Storage".into()),
            resource_group: Some("rg-1".into()),
            resource_id: Some(resource_id.into()),
            region: Some("eastus".into()),
            usage_qty: Some(3.0),
            unit_cost: Some(0.5),
            cost: Some(cost),
        }
    }

    #[test]
    fn billing_rules() {
        let mut incomplete = row("res-9", "2025-01", 1.0);
        incomplete.usage_qty = None;
        let cleaned = clean_billing(vec![
            row("res-1", "2025-01", -2.0),
            row("res-1", "2025-01", 7.0),
            row("res-1", "2025-02", 7.0),
            incomplete,
        ]);

        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].cost, 0.0);
        assert_eq!(cleaned[1].invoice_month, "2025-02");
    }

    #[test]
    fn resources_keep_first_and_optional_owner() {
        let cleaned = clean_resources(vec![
            RawResourceRow {
                resource_id: Some("res-1".into()),
                owner: None,
                env: Some("dev".into()),
                tags_json: Some("{}".into()),
            },
            RawResourceRow {
                resource_id: Some("res-1".into()),
                owner: Some("Bob".into()),
                env: Some("prod".into()),
                tags_json: Some("{}".into()),
            },
            RawResourceRow { resource_id: Some("res-2".into()), ..Default::default() },
        ]);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].env, "dev");
        assert_eq!(cleaned[0].owner, None);
    }
}
