//! HTTP server for the salesdb pipeline.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                               |
//! |--------|-------------------|-------------------------------------------|
//! | GET    | `/health`         | Health check                              |
//! | POST   | `/api/transform`  | Transform `filename` into `output.csv`    |
//! | POST   | `/api/load`       | Load `output.csv` into `sales.db`         |
//! | POST   | `/api/query`      | Aggregate over `sales.db`                 |
//! | POST   | `/api/pipeline`   | Transform, load and query in one call     |
//! | GET    | `/api/logs`       | SSE stream for real-time logs             |

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{
    error_response, error_response_with_values, query_status, InvocationRequest, LoadResponse,
    PipelineResponse, QueryResponse, TransformResponse,
};
use crate::config::EngineConfig;
use crate::error::{ServerError, ServerResult};
use crate::pipeline::{load_object, query_object, transform_load_query, transform_object};
use crate::storage::ObjectStore;

type ApiError = (StatusCode, Json<Value>);

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/transform", post(transform))
        .route("/api/load", post(load))
        .route("/api/query", post(query))
        .route("/api/pipeline", post(pipeline))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("salesdb server running on http://localhost:{}", port);
    println!("   POST /api/transform  - Transform an extract");
    println!("   POST /api/load       - Load output.csv into the store");
    println!("   POST /api/query      - Aggregate over the store");
    println!("   POST /api/pipeline   - All three in one call");
    println!("   GET  /api/logs       - SSE log stream");
    println!("   GET  /health         - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "salesdb",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "transform": "POST /api/transform",
            "load": "POST /api/load",
            "query": "POST /api/query",
            "pipeline": "POST /api/pipeline",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn transform(
    State(state): State<AppState>,
    Json(request): Json<InvocationRequest>,
) -> Result<Json<TransformResponse>, ApiError> {
    let bucket = request.require_bucket().map_err(reject)?.to_string();
    let filename = request.require_filename().map_err(reject)?.to_string();

    let output = run_blocking(move || {
        transform_object(state.store.as_ref(), &state.config, &bucket, &filename).map_err(ServerError::from)
    })
    .await?;

    Ok(Json(output.into()))
}

async fn load(
    State(state): State<AppState>,
    Json(request): Json<InvocationRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    let bucket = request.require_bucket().map_err(reject)?.to_string();

    let output = run_blocking(move || {
        load_object(state.store.as_ref(), &state.config, &bucket).map_err(ServerError::from)
    })
    .await?;

    Ok(Json(output.into()))
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<InvocationRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let bucket = request.require_bucket().map_err(reject)?.to_string();
    let spec = request.query_spec();

    let outcome = run_blocking(move || {
        query_object(state.store.as_ref(), &state.config, &bucket, &spec).map_err(ServerError::from)
    })
    .await?;

    match &outcome.error {
        None => Ok(Json(QueryResponse::from(&outcome))),
        Some(err) => Err((
            query_status(err),
            Json(error_response_with_values(&err.to_string(), &outcome.values)),
        )),
    }
}

async fn pipeline(
    State(state): State<AppState>,
    Json(request): Json<InvocationRequest>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let bucket = request.require_bucket().map_err(reject)?.to_string();
    let filename = request.require_filename().map_err(reject)?.to_string();
    let spec = request.query_spec();

    let run = run_blocking(move || {
        transform_load_query(state.store.as_ref(), &state.config, &bucket, &filename, &spec)
            .map_err(ServerError::from)
    })
    .await?;

    Ok(Json(run.into()))
}

/// Run a synchronous pipeline handler off the async runtime.
async fn run_blocking<T, F>(job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| reject(ServerError::Internal(err.to_string())))?
        .map_err(reject)
}

fn reject(err: ServerError) -> ApiError {
    log_error(err.to_string());
    (err.status_code(), Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;

    const INPUT: &[u8] = b"Region,Country,Item Type,Sales Channel,Order Priority,Order Date,Order ID,Ship Date,Units Sold,Unit Price,Unit Cost,Total Revenue,Total Cost,Total Profit\n\
US,US,Cereal,Online,H,1/1/2020,1,1/2/2020,10,2,1,20,10,10\n\
US,US,Cereal,Online,L,1/1/2020,2,1/3/2020,20,2,1,40,20,20\n";

    fn state(work: &tempfile::TempDir) -> AppState {
        let store = MemoryObjectStore::new();
        store.put("sales", "input.csv", INPUT).unwrap();
        AppState::new(
            Arc::new(store),
            EngineConfig::default().with_work_dir(work.path()),
        )
    }

    fn request(filename: Option<&str>, filters: &[(&str, &str)], aggregations: &[&str]) -> InvocationRequest {
        InvocationRequest {
            bucketname: "sales".to_string(),
            filename: filename.map(String::from),
            filters: filters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            aggregations: aggregations.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_pipeline_handler() {
        let work = tempfile::tempdir().unwrap();
        let body = request(Some("input.csv"), &[("Region", "US")], &["SUM(UnitsSold)"]);

        let Json(response) = pipeline(State(state(&work)), Json(body)).await.unwrap();

        assert_eq!(response.status, "ready");
        assert_eq!(response.load.total_orders, 2);
        assert_eq!(response.query.values["SUM(UnitsSold)"], 30.0);
    }

    #[tokio::test]
    async fn test_transform_requires_filename() {
        let work = tempfile::tempdir().unwrap();

        let (status, Json(body)) = transform(State(state(&work)), Json(request(None, &[], &[])))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_query_before_load_is_not_found() {
        let work = tempfile::tempdir().unwrap();
        let body = request(None, &[("Region", "US")], &["COUNT(*)"]);

        let (status, _) = query(State(state(&work)), Json(body)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_query_error_status() {
        let work = tempfile::tempdir().unwrap();
        let app = state(&work);
        transform(State(app.clone()), Json(request(Some("input.csv"), &[], &[])))
            .await
            .unwrap();
        load(State(app.clone()), Json(request(None, &[], &[]))).await.unwrap();

        let (status, Json(body)) = query(State(app), Json(request(None, &[], &["COUNT(*)"])))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["values"].as_object().unwrap().is_empty());
    }
}
