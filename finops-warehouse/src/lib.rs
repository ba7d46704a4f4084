//! Cloud billing warehouse for FinOps analytics.
//!
//! This crate provides:
//! - CSV extraction with null-aware raw rows
//! - Data-quality checks and cleaning rules
//! - A SQLite warehouse ([`Warehouse`]) that also serves rows to the RAG loader
//! - Cost KPIs and idle-resource recommendations
//! - Deterministic sample data generation

mod error;
mod etl;
mod extract;
mod kpis;
mod month;
mod quality;
mod recommendations;
mod records;
mod sample;
mod store;
mod transform;

pub use error::{Result, WarehouseError};
pub use etl::{EtlReport, run_etl};
pub use extract::{read_billing_csv, read_resources_csv};
pub use kpis::{
    CostDriver, KpiSnapshot, MonthlyTotal, ResourceCost, ResourceGroupCost, ServiceCost,
    TREND_MONTHS,
};
pub use month::InvoiceMonth;
pub use quality::{QualityIssue, check_billing, check_resources};
pub use recommendations::{DEFAULT_IDLE_THRESHOLD, IDLE_RESULT_LIMIT, IdleResource};
pub use records::{BillingRecord, RawBillingRow, RawResourceRow, ResourceRecord};
pub use sample::{
    BILLING_FILE, DEFAULT_MONTHS, DEFAULT_RESOURCES_PER_MONTH, DEFAULT_SEED, RESOURCES_FILE,
    SampleData, generate_sample, write_sample_csvs,
};
pub use store::Warehouse;
pub use transform::{clean_billing, clean_resources};
