//! HTTP API over the FinOps warehouse and RAG pipeline.
//!
//! Endpoints:
//! - `GET /health` liveness
//! - `GET /kpis` cost trend, top drivers and per-service costs
//! - `POST /ask` grounded question answering
//! - `GET /recommendations?month=YYYY-MM` idle resources for a month

pub mod protocol;
pub mod server;

pub use server::{AppState, ServerConfig, app_router, run_server};
