//! Transformation module.
//!
//! This module turns a raw sales extract into the rows that get loaded:
//! - Columns: header name lookup
//! - Derive: processing time, gross margin, priority words
//! - Dedupe: keep-first filtering by key column
//! - Stage: the fixed four-step sequence

pub mod columns;
pub mod dedupe;
pub mod derive;
pub mod stage;

pub use columns::{index_of, ColumnIndex};
pub use dedupe::dedupe_by;
pub use derive::{gross_margin, normalize_priority, processing_time, DeriveError, GrossMargin};
pub use stage::{transform_dataset, TransformIssue, TransformReport};
