//! REST API request and response types.
//!
//! Every response carries a fresh `jobId` and a `status`:
//! `"ready"`, `"warning"` (the transform left derived values empty) or
//! `"error"`.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{LoadError, PipelineError, QueryError, ServerError, ServerResult, StorageError};
use crate::pipeline::{LoadOutput, RunOutput, TransformOutput};
use crate::store::{Aggregates, QueryOutcome, QuerySpec};

pub const STATUS_READY: &str = "ready";
pub const STATUS_WARNING: &str = "warning";
pub const STATUS_ERROR: &str = "error";

/// Body of every `POST /api/*` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Container holding the input, `output.csv` and `sales.db`.
    pub bucketname: String,
    /// Raw extract to transform.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub aggregations: Vec<String>,
}

impl InvocationRequest {
    pub fn require_filename(&self) -> ServerResult<&str> {
        match self.filename.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ServerError::BadRequest("filename is required".to_string())),
        }
    }

    pub fn require_bucket(&self) -> ServerResult<&str> {
        if self.bucketname.is_empty() {
            return Err(ServerError::BadRequest("bucketname is required".to_string()));
        }
        Ok(&self.bucketname)
    }

    pub fn query_spec(&self) -> QuerySpec {
        QuerySpec {
            filters: self.filters.clone(),
            aggregations: self.aggregations.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    pub job_id: String,
    pub status: String,
    #[serde(flatten)]
    pub transform: TransformOutput,
}

impl From<TransformOutput> for TransformResponse {
    fn from(transform: TransformOutput) -> Self {
        let status = if transform.issues.is_empty() {
            STATUS_READY
        } else {
            STATUS_WARNING
        };
        Self {
            job_id: new_job_id(),
            status: status.to_string(),
            transform,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub job_id: String,
    pub status: String,
    #[serde(flatten)]
    pub load: LoadOutput,
}

impl From<LoadOutput> for LoadResponse {
    fn from(load: LoadOutput) -> Self {
        Self {
            job_id: new_job_id(),
            status: STATUS_READY.to_string(),
            load,
        }
    }
}

/// Aggregation results. `error` is set when the query failed, in which
/// case `values` holds what was read before the failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub job_id: String,
    pub status: String,
    pub values: Aggregates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&QueryOutcome> for QueryResponse {
    fn from(outcome: &QueryOutcome) -> Self {
        Self {
            job_id: new_job_id(),
            status: if outcome.is_ok() { STATUS_READY } else { STATUS_ERROR }.to_string(),
            values: outcome.values.clone(),
            error: outcome.error.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub job_id: String,
    pub status: String,
    pub transform: TransformOutput,
    pub load: LoadOutput,
    pub query: QueryResponse,
}

impl From<RunOutput> for PipelineResponse {
    fn from(run: RunOutput) -> Self {
        let query = QueryResponse::from(&run.query);
        let status = if !run.query.is_ok() {
            STATUS_ERROR
        } else if !run.transform.issues.is_empty() {
            STATUS_WARNING
        } else {
            STATUS_READY
        };
        Self {
            job_id: query.job_id.clone(),
            status: status.to_string(),
            transform: run.transform,
            load: run.load,
            query,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": new_job_id(),
        "status": STATUS_ERROR,
        "error": error,
    })
}

/// Error response for a failed query, keeping the values read before the failure.
pub fn error_response_with_values(error: &str, values: &Aggregates) -> Value {
    let mut body = error_response(error);
    body["values"] = json!(values);
    body
}

fn new_job_id() -> String {
    Uuid::new_v4().to_string()
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pipeline(err) => pipeline_status(err),
        }
    }
}

fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
        PipelineError::Storage(StorageError::InvalidName(_)) => StatusCode::BAD_REQUEST,
        PipelineError::Read(_) | PipelineError::Transform(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Load(LoadError::DuplicateOrder { .. }) => StatusCode::CONFLICT,
        PipelineError::Load(LoadError::RowShape { .. } | LoadError::HeaderMismatch { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::Query(err) => query_status(err),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn query_status(err: &QueryError) -> StatusCode {
    match err {
        QueryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}
