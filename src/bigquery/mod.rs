//! BigQuery v2 REST adapter for the query engine.
//!
//! `jobs.query` submits and may return results inline when the job is fast;
//! otherwise `jobs.getQueryResults` is polled with the returned job reference.

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{JobHandle, JobOutcome, QuerySpec, ResultSet, Row};
use crate::error::PipelineError;
use crate::poller::QueryEngine;

const BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2/projects";

/// How long each request may block server-side waiting for completion.
const SERVER_WAIT_MS: u64 = 10_000;

pub struct BigQueryClient {
    client: Client,
    project_id: String,
    access_token: String,
}

impl BigQueryClient {
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            project_id: project_id.into(),
            access_token: access_token.into(),
        }
    }

    fn read_response(&self, resp: Response, job_id: Option<&str>) -> Result<JobHandle, PipelineError> {
        let status = resp.status();
        if status.is_success() {
            let body: QueryResponse = resp
                .json()
                .map_err(|e| PipelineError::transport("bigquery", format!("failed to parse response: {e}")))?;
            return Ok(handle_from_response(body, &self.project_id));
        }

        let text = resp.text().unwrap_or_default();
        handle_from_error(status, &text, job_id, &self.project_id)
    }
}

impl QueryEngine for BigQueryClient {
    fn submit(&self, spec: &QuerySpec) -> Result<JobHandle, PipelineError> {
        let url = format!("{BASE_URL}/{}/queries", self.project_id);
        let request = QueryRequest::from_spec(spec);

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .map_err(|e| PipelineError::transport("bigquery", e))?;

        self.read_response(resp, None)
    }

    fn poll(&self, handle: &JobHandle) -> Result<JobHandle, PipelineError> {
        let url = format!("{BASE_URL}/{}/queries/{}", handle.project_ref, handle.job_id);
        let mut req = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("timeoutMs", SERVER_WAIT_MS.to_string())]);
        if let Some(location) = &handle.location {
            req = req.query(&[("location", location)]);
        }

        let resp = req.send().map_err(|e| PipelineError::transport("bigquery", e))?;
        let mut next = self.read_response(resp, Some(handle.job_id.as_str()))?;
        if next.location.is_none() {
            next.location = handle.location.clone();
        }
        Ok(next)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    query: String,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<WireParameter>,
    timeout_ms: u64,
}

impl QueryRequest {
    fn from_spec(spec: &QuerySpec) -> Self {
        Self {
            query: spec.sql().to_string(),
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: spec
                .parameters()
                .iter()
                .map(|p| WireParameter {
                    name: p.name.clone(),
                    parameter_type: WireType {
                        kind: p.value.type_name(),
                    },
                    parameter_value: WireValue {
                        value: p.value.wire_value(),
                    },
                })
                .collect(),
            timeout_ms: SERVER_WAIT_MS,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireParameter {
    name: String,
    parameter_type: WireType,
    parameter_value: WireValue,
}

#[derive(Debug, Serialize)]
struct WireType {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct WireValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    job_reference: JobReference,
    #[serde(default)]
    job_complete: bool,
    rows: Option<Vec<WireRow>>,
    #[serde(default)]
    errors: Vec<WireError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRow {
    #[serde(default)]
    f: Vec<WireCell>,
}

#[derive(Debug, Deserialize)]
struct WireCell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    reason: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn handle_from_response(body: QueryResponse, fallback_project: &str) -> JobHandle {
    let project_ref = if body.job_reference.project_id.is_empty() {
        fallback_project.to_string()
    } else {
        body.job_reference.project_id
    };

    let outcome = if !body.job_complete {
        None
    } else if body.rows.is_none() && !body.errors.is_empty() {
        let message = body
            .errors
            .iter()
            .map(|e| match &e.reason {
                Some(reason) => format!("{reason}: {}", e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");
        Some(JobOutcome::Failed(message))
    } else {
        let rows = body
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.f.into_iter().map(|cell| scalar(cell.v)).collect::<Row>())
            .collect();
        Some(JobOutcome::Rows(ResultSet::new(rows)))
    };

    JobHandle {
        job_id: body.job_reference.job_id,
        project_ref,
        location: body.job_reference.location,
        complete: body.job_complete,
        outcome,
    }
}

/// Classify a non-success response.
///
/// A 4xx carrying a structured error body means the engine rejected or failed
/// the job itself. 401 and 429 are about the caller, not the query, so they stay
/// transport errors along with 5xx and anything whose body is not an error
/// envelope.
fn handle_from_error(
    status: StatusCode,
    body: &str,
    job_id: Option<&str>,
    project: &str,
) -> Result<JobHandle, PipelineError> {
    let job_level = status.is_client_error()
        && status != StatusCode::UNAUTHORIZED
        && status != StatusCode::TOO_MANY_REQUESTS;
    if job_level {
        if let Ok(err) = serde_json::from_str::<ErrorEnvelope>(body) {
            return Ok(JobHandle::finished(
                job_id.unwrap_or("<not started>"),
                project,
                JobOutcome::Failed(err.error.message),
            ));
        }
    }
    Err(PipelineError::transport(
        "bigquery",
        format!("status {status}: {}", body.trim()),
    ))
}

fn scalar(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamValue;

    fn parse(json: &str) -> JobHandle {
        handle_from_response(serde_json::from_str(json).unwrap(), "acme-prod")
    }

    #[test]
    fn request_binds_parameters_by_name() {
        let spec = QuerySpec::new(
            "SELECT 1 WHERE project.id = @projectId",
            vec![crate::domain::QueryParameter {
                name: "projectId".into(),
                value: ParamValue::String("acme-prod".into()),
            }],
        );
        let json = serde_json::to_value(QueryRequest::from_spec(&spec)).unwrap();
        assert_eq!(json["useLegacySql"], false);
        assert_eq!(json["parameterMode"], "NAMED");
        assert_eq!(json["queryParameters"][0]["name"], "projectId");
        assert_eq!(json["queryParameters"][0]["parameterType"]["type"], "STRING");
        assert_eq!(json["queryParameters"][0]["parameterValue"]["value"], "acme-prod");
    }

    #[test]
    fn pending_response_has_no_outcome() {
        let handle = parse(
            r#"{"jobReference":{"projectId":"acme-prod","jobId":"job_abc","location":"EU"},"jobComplete":false}"#,
        );
        assert!(!handle.complete);
        assert_eq!(handle.job_id, "job_abc");
        assert_eq!(handle.location.as_deref(), Some("EU"));
        assert!(handle.outcome.is_none());
    }

    #[test]
    fn complete_response_carries_rows() {
        let handle = parse(
            r#"{"jobReference":{"projectId":"acme-prod","jobId":"job_abc"},"jobComplete":true,
                "totalRows":"1","rows":[{"f":[{"v":"100.00"}]}]}"#,
        );
        assert!(handle.complete);
        assert_eq!(
            handle.outcome,
            Some(JobOutcome::Rows(ResultSet::new(vec![vec![Some("100.00".into())]])))
        );
    }

    #[test]
    fn null_aggregate_stays_null() {
        let handle = parse(
            r#"{"jobReference":{"projectId":"p","jobId":"j"},"jobComplete":true,"rows":[{"f":[{"v":null}]}]}"#,
        );
        assert_eq!(
            handle.outcome,
            Some(JobOutcome::Rows(ResultSet::new(vec![vec![None]])))
        );
    }

    #[test]
    fn complete_with_errors_and_no_rows_is_a_failure() {
        let handle = parse(
            r#"{"jobReference":{"projectId":"p","jobId":"j"},"jobComplete":true,
                "errors":[{"reason":"accessDenied","message":"Access Denied: Table"}]}"#,
        );
        assert_eq!(
            handle.outcome,
            Some(JobOutcome::Failed("accessDenied: Access Denied: Table".into()))
        );
    }

    const ERROR_BODY: &str =
        r#"{"error":{"code":400,"message":"Syntax error: Unexpected keyword","status":"INVALID_ARGUMENT"}}"#;

    #[test]
    fn rejected_query_becomes_a_failed_job() {
        let handle = handle_from_error(StatusCode::BAD_REQUEST, ERROR_BODY, None, "acme-prod").unwrap();
        assert!(handle.complete);
        assert_eq!(handle.job_id, "<not started>");
        assert_eq!(
            handle.outcome,
            Some(JobOutcome::Failed("Syntax error: Unexpected keyword".into()))
        );

        let handle = handle_from_error(StatusCode::NOT_FOUND, ERROR_BODY, Some("job_abc"), "acme-prod").unwrap();
        assert_eq!(handle.job_id, "job_abc");
    }

    #[test]
    fn auth_throttling_and_server_errors_stay_transport_errors() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let err = handle_from_error(status, ERROR_BODY, Some("job_abc"), "acme-prod").unwrap_err();
            let transport = matches!(
                err,
                PipelineError::Transport { service: "bigquery", ref message } if message.contains(status.as_str())
            );
            assert!(transport, "{status}: {err:?}");
        }
    }

    #[test]
    fn client_error_without_error_envelope_is_a_transport_error() {
        let err = handle_from_error(StatusCode::BAD_REQUEST, "<html>Bad Request</html>", None, "acme-prod")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transport { ref message, .. } if message.contains("Bad Request")));
    }
}
