//! Net to gross conversion with a fixed multiplier.

use crate::domain::CostAmount;

/// Apply `factor` to `net`. No rounding; formatting is left to the report.
pub fn convert(net: f64, factor: f64) -> CostAmount {
    CostAmount {
        net,
        gross: net * factor,
    }
}
