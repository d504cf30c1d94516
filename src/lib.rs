//! Credit Monitoring Dashboard API Library
//!
//! Loads or generates a table of debtors per session, validates CNPJs before
//! new rows are appended, computes portfolio risk metrics and chart data, and
//! exports the current table as a spreadsheet or a paginated text report.
//!
//! # Modules
//!
//! - `tax_id`: CNPJ normalization, check digits and validation.
//! - `metrics`: Portfolio metrics (total volume, delinquency, concentration).
//! - `charts`: Chart summaries over the debtor table.
//! - `models`: Debtor record, enums and HTTP payloads.
//! - `br_format`: Brazilian number parsing and display formatting.
//! - `ingest`: Spreadsheet (CSV) ingestion.
//! - `export`: Spreadsheet and report exports.
//! - `fixtures`: Seeded demo portfolio.
//! - `session`: Per-session debtor tables.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `routes`: Router assembly and middleware.

pub mod br_format;
pub mod charts;
pub mod config;
pub mod errors;
pub mod export;
pub mod fixtures;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod session;
pub mod tax_id;
