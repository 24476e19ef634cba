//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the query description handed to the engine (`QuerySpec`, `ParamValue`)
//! - job state and results coming back (`JobHandle`, `ResultSet`)
//! - ledger cells and matches (`CellValue`, `LedgerRow`, `LedgerOutcome`)
//! - the computed figure (`CostAmount`)

pub mod types;

pub use types::*;
