//! Deterministic synthetic billing data.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::Result;
use crate::month::InvoiceMonth;
use crate::records::{BillingRecord, ResourceRecord};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MONTHS: usize = 6;
pub const DEFAULT_RESOURCES_PER_MONTH: usize = 200;

pub const BILLING_FILE: &str = "billing.csv";
pub const RESOURCES_FILE: &str = "resources.csv";

const FIRST_MONTH: (u16, u8) = (2025, 1);
const SERVICES: [&str; 6] =
    ["Virtual Machines", "Storage", "SQL Database", "App Service", "Kubernetes", "Networking"];
const REGIONS: [&str; 5] = ["eastus", "westus", "centralus", "northeurope", "southeastasia"];
const OWNERS: [Option<&str>; 6] =
    [Some("Alice"), Some("Bob"), Some("Charlie"), Some("Diana"), Some("Eve"), None];
const ENVS: [&str; 3] = ["dev", "test", "prod"];
const USAGE_SCALE: f64 = 50.0;

/// Generated billing and resource rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub billing: Vec<BillingRecord>,
    pub resources: Vec<ResourceRecord>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
    // slices above are non-empty constants
    items.choose(rng).unwrap_or(&items[0])
}

/// Generate `months` months starting January 2025, each with
/// `resources_per_month` fresh resources. The same seed always yields the
/// same data.
pub fn generate_sample(seed: u64, months: usize, resources_per_month: usize) -> SampleData {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut billing = Vec::with_capacity(months * resources_per_month);
    let mut resources = Vec::with_capacity(months * resources_per_month);
    let mut counter = 1usize;

    let (year, month) = FIRST_MONTH;
    let mut current = InvoiceMonth::from_parts(year, month).ok();

    for _ in 0..months {
        let Some(invoice_month) = current.take() else { break };
        for _ in 0..resources_per_month {
            let resource_id = format!("res-{counter}");
            counter += 1;

            // exponential usage via inverse transform sampling
            let usage_qty = round2(-USAGE_SCALE * (1.0 - rng.r#gen::<f64>()).ln());
            let unit_cost = round2(rng.gen_range(0.1..2.0));

            billing.push(BillingRecord {
                invoice_month: invoice_month.to_string(),
                account_id: format!("acc-{}", rng.gen_range(1000..=9999)),
                subscription: format!("sub-{}", rng.gen_range(1..=5)),
                service: pick(&mut rng, &SERVICES).to_string(),
                resource_group: format!("rg-{}", rng.gen_range(1..=10)),
                resource_id: resource_id.clone(),
                region: pick(&mut rng, &REGIONS).to_string(),
                usage_qty,
                unit_cost,
                cost: round2(usage_qty * unit_cost),
            });

            resources.push(ResourceRecord {
                resource_id,
                owner: pick(&mut rng, &OWNERS).map(str::to_string),
                env: pick(&mut rng, &ENVS).to_string(),
                tags_json: serde_json::json!({
                    "project": format!("proj-{}", rng.gen_range(1..=5))
                })
                .to_string(),
            });
        }
        current = Some(invoice_month.next());
    }

    SampleData { billing, resources }
}

/// Write `data` as `billing.csv` and `resources.csv` under `dir`.
pub fn write_sample_csvs(dir: impl AsRef<Path>, data: &SampleData) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let billing_path = dir.join(BILLING_FILE);
    let mut writer = csv::Writer::from_path(&billing_path)?;
    for record in &data.billing {
        writer.serialize(record)?;
    }
    writer.flush()?;

    let resources_path = dir.join(RESOURCES_FILE);
    let mut writer = csv::Writer::from_path(&resources_path)?;
    for record in &data.resources {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(
        billing = %billing_path.display(),
        resources = %resources_path.display(),
        billing_rows = data.billing.len(),
        "wrote sample data"
    );
    Ok((billing_path, resources_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_data() {
        assert_eq!(generate_sample(7, 2, 10), generate_sample(7, 2, 10));
        assert_ne!(generate_sample(7, 2, 10), generate_sample(8, 2, 10));
    }

    #[test]
    fn shape_matches_parameters() {
        let data = generate_sample(DEFAULT_SEED, DEFAULT_MONTHS, 5);
        assert_eq!(data.billing.len(), 30);
        assert_eq!(data.resources.len(), 30);
        assert_eq!(data.billing[0].invoice_month, "2025-01");
        assert_eq!(data.billing[29].invoice_month, "2025-06");
        assert_eq!(data.billing[29].resource_id, "res-30");
        for record in &data.billing {
            assert!(record.usage_qty >= 0.0);
            assert!((0.1..=2.0).contains(&record.unit_cost));
            assert!(SERVICES.contains(&record.service.as_str()));
        }
    }
}
