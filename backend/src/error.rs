//! Error types for the salesdb pipeline.
//!
//! One error type per layer:
//!
//! - [`ReadError`] - Tabular reading errors
//! - [`TransformError`] - Transform stage errors
//! - [`LoadError`] - Batch loader errors
//! - [`QueryError`] - Query engine errors
//! - [`StorageError`] - Object store errors
//! - [`ConfigError`] - Environment configuration errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Tabular Reading Errors
// =============================================================================

/// Errors while reading delimited text into a dataset.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Failed to read the input stream.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited text could not be split into records.
    #[error("Invalid delimited text: {0}")]
    Parse(#[from] csv::Error),
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors during the transform stage.
///
/// Per-field parse failures are not errors: they are reported as
/// [`crate::transform::TransformIssue`]s and the row is kept.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The dataset has no header row.
    #[error("Dataset is empty, no header row")]
    EmptyDataset,

    /// A column the stage depends on is absent from the header.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A data row is too short for a column the stage reads.
    #[error("Row {row} has {found} fields, column '{column}' needs at least {needed}")]
    ShortRow {
        row: usize,
        column: String,
        needed: usize,
        found: usize,
    },
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors from the batch loader.
///
/// Any of these leaves the load transaction uncommitted.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A data row does not have one field per Orders column.
    #[error("Row {row} has {found} fields, Orders expects {expected}")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The header does not map onto the Orders columns, position by position.
    #[error("Header column {position} is '{found}', Orders expects '{expected}'")]
    HeaderMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    /// The OrderID is already present in the store (or repeated in the batch).
    #[error("Duplicate OrderID '{order_id}' at row {row}")]
    DuplicateOrder { row: usize, order_id: String },

    /// Batch size must be positive.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

// =============================================================================
// Query Errors
// =============================================================================

/// Errors from the query engine.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No aggregation expression was requested.
    #[error("At least one aggregation is required")]
    NoAggregations,

    /// No filter was requested.
    #[error("At least one filter is required")]
    NoFilters,

    /// A filter names a column that is not part of the Orders schema.
    #[error("Unknown filter column: {0}")]
    UnknownColumn(String),

    /// Statement preparation or execution failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

// =============================================================================
// Object Store Errors
// =============================================================================

/// Errors from the object store collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object at (container, key).
    #[error("Object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    /// Container or key is not a plain object name.
    #[error("Invalid object name: {0}")]
    InvalidName(String),

    /// IO error.
    #[error("Object store IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("Invalid value for {key}: '{value}' ({message})")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by the handlers in [`crate::pipeline`].
/// It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading error.
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// Transform error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Load error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Query error.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Object store error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Local store file could not be written or removed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for reading operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for object store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
