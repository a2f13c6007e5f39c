//! Invocation handlers: object store in, object store out.
//!
//! ```text
//! transform_object      get(key) ──▶ read ──▶ transform ──▶ write ──▶ put(output.csv)
//! load_object           get(output.csv) ──▶ read ──▶ load into snapshot ──▶ put(sales.db)
//! query_object          get(sales.db) ──▶ query
//! transform_load_query  all of the above in one invocation
//! ```
//!
//! The store snapshot is copied to a local file unique to the invocation,
//! worked on there, and the file is removed when the handler returns.
//!
//! # Example
//!
//! ```rust,ignore
//! use salesdb::{query_object, EngineConfig, FsObjectStore, QuerySpec};
//!
//! let config = EngineConfig::from_env()?;
//! let store = FsObjectStore::with_root(&config.object_root);
//! let spec = QuerySpec::new().filter("Region", "Europe").aggregate("SUM(UnitsSold)");
//! let values = query_object(&store, &config, "sales", &spec)?.into_result()?;
//! ```

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::logs::{log_info_indent, log_stage, LogLevel};
use crate::config::EngineConfig;
use crate::error::{LoadError, PipelineResult, QueryError};
use crate::models::Dataset;
use crate::storage::{ObjectStore, PutReceipt};
use crate::store::{LoadSummary, QueryOutcome, QuerySpec, Store};
use crate::tabular::{parse_bytes, to_csv_bytes};
use crate::transform::{transform_dataset, TransformIssue, TransformReport};

const TRANSFORM: &str = "transform";
const LOAD: &str = "load";
const QUERY: &str = "query";

/// Issues listed individually in the log before summarizing the rest.
const LOGGED_ISSUES: usize = 5;

/// Result of [`transform_object`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub input_key: String,
    pub rows_read: usize,
    pub rows_written: usize,
    pub duplicates_removed: usize,
    pub issues: Vec<TransformIssue>,
    pub output: PutReceipt,
}

/// Result of [`load_object`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutput {
    pub source_key: String,
    #[serde(flatten)]
    pub summary: LoadSummary,
    /// Orders in the snapshot after the load.
    pub total_orders: i64,
    pub snapshot: PutReceipt,
}

/// Result of [`transform_load_query`].
#[derive(Debug)]
pub struct RunOutput {
    pub transform: TransformOutput,
    pub load: LoadOutput,
    pub query: QueryOutcome,
}

// =============================================================================
// Handlers
// =============================================================================

/// Transform `container/key` and publish the result as `container/<output_key>`.
pub fn transform_object(
    store: &dyn ObjectStore,
    config: &EngineConfig,
    container: &str,
    key: &str,
) -> PipelineResult<TransformOutput> {
    let (dataset, output) = transform_stage(store, config, container, key)?;
    log_stage(
        LogLevel::Success,
        TRANSFORM,
        format!("{} orders ready for loading", dataset.data_len()),
    );
    Ok(output)
}

/// Load `container/<output_key>` into the `container/<database_key>` snapshot.
///
/// An existing snapshot is extended. Orders it already holds make the load
/// fail with a duplicate-order error and the snapshot is left as it was.
pub fn load_object(store: &dyn ObjectStore, config: &EngineConfig, container: &str) -> PipelineResult<LoadOutput> {
    log_stage(
        LogLevel::Info,
        LOAD,
        format!("Fetching {}/{}", container, config.output_key),
    );
    let bytes = store.get(container, &config.output_key)?;
    let dataset = parse_bytes(&bytes)?;

    let local = LocalStoreFile::materialize(store, config, container)?;
    let mut db = Store::open(local.path()).map_err(LoadError::from)?;
    let summary = load_stage(&mut db, &dataset, config)?;
    let total_orders = db.count_orders().map_err(LoadError::from)?;
    db.close().map_err(LoadError::from)?;

    let snapshot = local.publish(store, config, container)?;
    Ok(LoadOutput {
        source_key: config.output_key.clone(),
        summary,
        total_orders,
        snapshot,
    })
}

/// Run `spec` against the `container/<database_key>` snapshot.
///
/// A missing snapshot or an unusable local copy is an `Err`. Failures of
/// the query itself come back inside the [`QueryOutcome`] with whatever
/// values were read before them.
pub fn query_object(
    store: &dyn ObjectStore,
    config: &EngineConfig,
    container: &str,
    spec: &QuerySpec,
) -> PipelineResult<QueryOutcome> {
    log_stage(
        LogLevel::Info,
        QUERY,
        format!("Fetching {}/{}", container, config.database_key),
    );
    let snapshot = store.get(container, &config.database_key)?;

    let local = LocalStoreFile::create(&config.work_dir)?;
    fs::write(local.path(), snapshot)?;
    let db = Store::open(local.path()).map_err(QueryError::from)?;

    Ok(query_stage(&db, spec))
}

/// Transform, load and query in one invocation.
///
/// The transformed dataset is loaded directly and the query runs against
/// the freshly loaded store. The query outcome is returned even when the
/// query fails, since transform and load already succeeded.
pub fn transform_load_query(
    store: &dyn ObjectStore,
    config: &EngineConfig,
    container: &str,
    key: &str,
    spec: &QuerySpec,
) -> PipelineResult<RunOutput> {
    let (dataset, transform) = transform_stage(store, config, container, key)?;

    let local = LocalStoreFile::materialize(store, config, container)?;
    let mut db = Store::open(local.path()).map_err(LoadError::from)?;
    let summary = load_stage(&mut db, &dataset, config)?;
    let total_orders = db.count_orders().map_err(LoadError::from)?;

    let query = query_stage(&db, spec);
    db.close().map_err(LoadError::from)?;

    let snapshot = local.publish(store, config, container)?;
    Ok(RunOutput {
        transform,
        load: LoadOutput {
            source_key: config.output_key.clone(),
            summary,
            total_orders,
            snapshot,
        },
        query,
    })
}

// =============================================================================
// Stages
// =============================================================================

fn transform_stage(
    store: &dyn ObjectStore,
    config: &EngineConfig,
    container: &str,
    key: &str,
) -> PipelineResult<(Dataset, TransformOutput)> {
    log_stage(LogLevel::Info, TRANSFORM, format!("Fetching {}/{}", container, key));
    let bytes = store.get(container, key)?;
    let input = parse_bytes(&bytes)?;
    let rows_read = input.data_len();
    log_stage(
        LogLevel::Success,
        TRANSFORM,
        format!("Read {} rows ({} bytes)", rows_read, bytes.len()),
    );

    let report = transform_dataset(input)?;
    log_report(&report);

    let TransformReport {
        dataset,
        issues,
        duplicates_removed,
    } = report;

    let output = store.put(container, &config.output_key, &to_csv_bytes(&dataset))?;
    log_stage(
        LogLevel::Success,
        TRANSFORM,
        format!("Wrote {}/{} ({} bytes)", output.container, output.key, output.size),
    );

    let summary = TransformOutput {
        input_key: key.to_string(),
        rows_read,
        rows_written: dataset.data_len(),
        duplicates_removed,
        issues,
        output,
    };
    Ok((dataset, summary))
}

fn log_report(report: &TransformReport) {
    log_stage(LogLevel::Info, TRANSFORM, report.summary());

    if report.issues.is_empty() {
        return;
    }
    log_stage(
        LogLevel::Warning,
        TRANSFORM,
        format!("{} derived values left empty", report.issues.len()),
    );
    for issue in report.issues.iter().take(LOGGED_ISSUES) {
        log_info_indent(
            format!("row {}: {}: {}", issue.row, issue.column, issue.message),
            1,
        );
    }
    if report.issues.len() > LOGGED_ISSUES {
        log_info_indent(
            format!("... and {} more", report.issues.len() - LOGGED_ISSUES),
            1,
        );
    }
}

fn load_stage(db: &mut Store, dataset: &Dataset, config: &EngineConfig) -> PipelineResult<LoadSummary> {
    log_stage(
        LogLevel::Info,
        LOAD,
        format!(
            "Loading {} orders in batches of {}",
            dataset.data_len(),
            config.batch_size
        ),
    );

    let result = db.load_with(dataset, config.batch_size, |progress| {
        log_info_indent(
            format!("batch {}: {} rows", progress.batches, progress.rows_inserted),
            1,
        );
    });

    match result {
        Ok(summary) => {
            log_stage(
                LogLevel::Success,
                LOAD,
                format!("Committed {} orders", summary.rows_inserted),
            );
            Ok(summary)
        }
        Err(err) => {
            log_stage(LogLevel::Error, LOAD, format!("Rolled back: {}", err));
            Err(err.into())
        }
    }
}

fn query_stage(db: &Store, spec: &QuerySpec) -> QueryOutcome {
    log_stage(
        LogLevel::Info,
        QUERY,
        format!(
            "{} where {:?}",
            spec.aggregations.join(", "),
            spec.filters
        ),
    );

    let outcome = db.query(spec);
    match &outcome.error {
        None => log_stage(
            LogLevel::Success,
            QUERY,
            format!("{} values", outcome.values.len()),
        ),
        Some(err) => log_stage(LogLevel::Error, QUERY, err.to_string()),
    }
    outcome
}

// =============================================================================
// Local store file
// =============================================================================

/// A store file owned by one invocation, removed on drop.
struct LocalStoreFile {
    path: PathBuf,
}

impl LocalStoreFile {
    fn create(work_dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(work_dir)?;
        let path = work_dir.join(format!("salesdb-{}.db", uuid::Uuid::new_v4().simple()));
        Ok(Self { path })
    }

    /// Local copy of the container's snapshot, or a fresh path if it has none.
    fn materialize(store: &dyn ObjectStore, config: &EngineConfig, container: &str) -> PipelineResult<Self> {
        let local = Self::create(&config.work_dir)?;
        match store.get_optional(container, &config.database_key)? {
            Some(snapshot) => {
                log_stage(
                    LogLevel::Info,
                    LOAD,
                    format!("Extending existing snapshot ({} bytes)", snapshot.len()),
                );
                fs::write(local.path(), snapshot)?;
            }
            None => log_stage(LogLevel::Info, LOAD, "No snapshot yet, starting a new store"),
        }
        Ok(local)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn publish(&self, store: &dyn ObjectStore, config: &EngineConfig, container: &str) -> PipelineResult<PutReceipt> {
        let bytes = fs::read(&self.path)?;
        let receipt = store.put(container, &config.database_key, &bytes)?;
        log_stage(
            LogLevel::Success,
            LOAD,
            format!("Uploaded {}/{} ({} bytes)", receipt.container, receipt.key, receipt.size),
        );
        Ok(receipt)
    }
}

impl Drop for LocalStoreFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
