//! Daily cost query construction.
//!
//! The project id always travels as a bound `@projectId` parameter. The table
//! reference is an identifier and cannot be bound, so it is checked against an
//! allow-list before it is spliced into the SQL text.

use std::sync::LazyLock;

use chrono_tz::Tz;
use regex::Regex;

use crate::domain::{ParamValue, QueryParameter, QuerySpec};
use crate::error::PipelineError;

/// Token left in the table reference by unconfigured deployments.
pub const TABLE_PLACEHOLDER: &str = "XXXXXX";

pub const PROJECT_PARAM: &str = "projectId";

/// `project.dataset.table`; hyphens are legal in project and table names only.
static TABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*\.[A-Za-z0-9_]+\.[A-Za-z0-9_-]+$")
        .expect("table reference pattern is valid")
});

/// Check a table reference before it is interpolated into SQL.
pub fn validate_table_reference(table_reference: &str) -> Result<(), PipelineError> {
    if table_reference.contains(TABLE_PLACEHOLDER) {
        return Err(PipelineError::configuration(format!(
            "table name still contains the '{TABLE_PLACEHOLDER}' placeholder; set COST_LEDGER_TABLE"
        )));
    }
    if !TABLE_REFERENCE.is_match(table_reference) {
        return Err(PipelineError::configuration(format!(
            "table reference '{table_reference}' is not of the form project.dataset.table"
        )));
    }
    Ok(())
}

/// Build the query summing today's net cost (cost plus credits) for one project.
///
/// "Today" is evaluated by the engine in `timezone`, and usage rows are bucketed
/// by their start time converted to the same zone.
pub fn build_daily_cost_query(
    project_id: &str,
    table_reference: &str,
    timezone: Tz,
) -> Result<QuerySpec, PipelineError> {
    validate_table_reference(table_reference)?;

    let tz = timezone.name();
    let sql = format!(
        "SELECT\n  \
           SUM(cost) + SUM(IFNULL((SELECT SUM(c.amount) FROM UNNEST(credits) c), 0)) AS cost_net\n\
         FROM `{table_reference}`\n\
         WHERE\n  \
           project.id = @{PROJECT_PARAM}\n  \
           AND DATE(usage_start_time, \"{tz}\") = CURRENT_DATE(\"{tz}\")"
    );

    Ok(QuerySpec::new(
        sql,
        vec![QueryParameter {
            name: PROJECT_PARAM.to_string(),
            value: ParamValue::String(project_id.to_string()),
        }],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "acme-prod.billing_data.gcp_billing_export_v1_0A1B2C_3D4E5F";

    #[test]
    fn project_id_is_bound_not_interpolated() {
        let spec = build_daily_cost_query("acme'; DROP TABLE x; --", TABLE, chrono_tz::Europe::Warsaw).unwrap();
        assert!(!spec.sql().contains("DROP TABLE"));
        assert!(spec.sql().contains("project.id = @projectId"));
        assert_eq!(
            spec.parameter(PROJECT_PARAM),
            Some(&ParamValue::String("acme'; DROP TABLE x; --".to_string()))
        );
    }

    #[test]
    fn query_uses_the_configured_timezone_on_both_sides() {
        let spec = build_daily_cost_query("acme-prod", TABLE, chrono_tz::America::Chicago).unwrap();
        assert!(spec.sql().contains("DATE(usage_start_time, \"America/Chicago\")"));
        assert!(spec.sql().contains("CURRENT_DATE(\"America/Chicago\")"));
        assert!(spec.sql().contains(&format!("FROM `{TABLE}`")));
        assert!(spec.sql().contains("UNNEST(credits)"));
    }

    #[test]
    fn placeholder_table_is_a_configuration_error() {
        let err = build_daily_cost_query(
            "acme-prod",
            "acme-prod.billing_data.gcp_billing_export_v1_XXXXXX_XXXXXX_XXXXXX",
            chrono_tz::Europe::Warsaw,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(ref m) if m.contains("placeholder")));
    }

    #[test]
    fn table_reference_allow_list() {
        assert!(validate_table_reference(TABLE).is_ok());
        assert!(validate_table_reference("proj.dataset.table-2024").is_ok());
        for bad in [
            "dataset.table",
            "proj.data set.table",
            "proj.dataset.table`; DELETE",
            "proj.dataset.table\nUNION",
            "",
        ] {
            assert!(validate_table_reference(bad).is_err(), "accepted {bad:?}");
        }
    }
}
