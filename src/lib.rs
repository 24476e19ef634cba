//! `cost-ledger` library crate.
//!
//! The binary (`cost-ledger`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable against in-memory engines and ledgers
//! - remote adapters (BigQuery, Sheets) stay swappable behind traits
//! - a scheduler can embed `app::run_once` directly

pub mod app;
pub mod bigquery;
pub mod cli;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod logging;
pub mod poller;
pub mod query;
pub mod report;

#[cfg(test)]
pub(crate) mod testutil;
