//! # salesdb - sales-order transform, load and query engine
//!
//! salesdb takes raw sales-order extracts (comma-delimited, header first),
//! derives processing time and gross margin, normalizes priority codes,
//! drops repeated orders, loads the result into a single-file SQLite store
//! and answers filtered aggregation queries over it.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐    ┌────────────┐    ┌─────────────┐    ┌────────────┐    ┌────────────┐
//! │ input.csv  │───▶│  Tabular   │───▶│  Transform  │───▶│   Loader   │───▶│   Query    │
//! │ (objects)  │    │  (reader)  │    │ (4 steps)   │    │ (SQLite tx)│    │ (bound SQL)│
//! └────────────┘    └────────────┘    └──────┬──────┘    └─────┬──────┘    └────────────┘
//!                                            ▼                 ▼
//!                                       output.csv          sales.db
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salesdb::{transform_load_query, EngineConfig, FsObjectStore, QuerySpec};
//!
//! let config = EngineConfig::from_env()?;
//! let store = FsObjectStore::with_root(&config.object_root);
//! let spec = QuerySpec::new().filter("Region", "Europe").aggregate("SUM(UnitsSold)");
//! let run = transform_load_query(&store, &config, "sales", "input.csv", &spec)?;
//! println!("{:?}", run.query.into_result()?);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Dataset, column names, order records
//! - [`tabular`] - Delimited text reader and writer
//! - [`transform`] - Derived columns and deduplication
//! - [`store`] - SQLite order store: loader and query engine
//! - [`storage`] - Object store collaborator
//! - [`pipeline`] - Invocation handlers over the object store
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server and log stream

// Core modules
pub mod error;
pub mod models;

// Text in and out
pub mod tabular;

// Transformation
pub mod transform;

// Order store
pub mod store;

// Object store and handlers
pub mod pipeline;
pub mod storage;

pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, LoadError, PipelineError, QueryError, ReadError, ServerError, StorageError,
    TransformError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{columns, Dataset, OrderPriority, OrderRecord, Row, ORDERS_COLUMNS};

// =============================================================================
// Re-exports - Tabular
// =============================================================================

pub use tabular::{
    decode_content, detect_encoding, parse_bytes, parse_str, read_dataset, read_dataset_file,
    to_csv_bytes, to_csv_string, write_dataset, write_dataset_file,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    dedupe_by, gross_margin, index_of, normalize_priority, processing_time, transform_dataset,
    ColumnIndex, GrossMargin, TransformIssue, TransformReport,
};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{
    build_query, execute, load_dataset, Aggregates, LoadSummary, QueryOutcome, QuerySpec, Store,
    DEFAULT_BATCH_SIZE,
};

// =============================================================================
// Re-exports - Object store and pipeline
// =============================================================================

pub use storage::{FsObjectStore, MemoryObjectStore, ObjectStore, PutReceipt};

pub use pipeline::{
    load_object, query_object, transform_load_query, transform_object, LoadOutput, RunOutput,
    TransformOutput,
};

pub use config::EngineConfig;

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::server::AppState;
pub use api::types::{error_response, InvocationRequest, QueryResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
