//! Net amount extraction from a query result.
//!
//! The aggregate query yields zero or one row with a single field. Only that
//! field is read; anything past it is ignored.

use crate::domain::ResultSet;
use crate::error::PipelineError;

/// Read the net amount from the first field of the first row.
///
/// No rows, or a null field, mean nothing was billed today and yield `0.0`.
pub fn extract_net_amount(result: &ResultSet) -> Result<f64, PipelineError> {
    let raw = match result.first_field() {
        Some(Some(raw)) => raw,
        _ => return Ok(0.0),
    };

    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| PipelineError::Parse { raw: raw.clone() })?;
    if !value.is_finite() {
        return Err(PipelineError::Parse { raw: raw.clone() });
    }
    Ok(value)
}
