//! Engine configuration from `SALESDB_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::storage::DEFAULT_OBJECT_ROOT;
use crate::store::DEFAULT_BATCH_SIZE;

pub const ENV_OBJECT_ROOT: &str = "SALESDB_OBJECT_ROOT";
pub const ENV_WORK_DIR: &str = "SALESDB_WORK_DIR";
pub const ENV_BATCH_SIZE: &str = "SALESDB_BATCH_SIZE";
pub const ENV_OUTPUT_KEY: &str = "SALESDB_OUTPUT_KEY";
pub const ENV_DATABASE_KEY: &str = "SALESDB_DATABASE_KEY";

/// Key the transformed CSV is published under.
pub const DEFAULT_OUTPUT_KEY: &str = "output.csv";
/// Key the store snapshot is published under.
pub const DEFAULT_DATABASE_KEY: &str = "sales.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Root directory of the filesystem object store
    pub object_root: PathBuf,
    /// Where per-invocation store files are materialized
    pub work_dir: PathBuf,
    /// Rows per load batch
    pub batch_size: usize,
    pub output_key: String,
    pub database_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            object_root: PathBuf::from(DEFAULT_OBJECT_ROOT),
            work_dir: env::temp_dir(),
            batch_size: DEFAULT_BATCH_SIZE,
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
            database_key: DEFAULT_DATABASE_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(root) = non_empty(&lookup, ENV_OBJECT_ROOT) {
            config.object_root = PathBuf::from(root);
        }
        if let Some(dir) = non_empty(&lookup, ENV_WORK_DIR) {
            config.work_dir = PathBuf::from(dir);
        }
        if let Some(raw) = non_empty(&lookup, ENV_BATCH_SIZE) {
            config.batch_size = parse_batch_size(&raw)?;
        }
        if let Some(key) = non_empty(&lookup, ENV_OUTPUT_KEY) {
            config.output_key = key;
        }
        if let Some(key) = non_empty(&lookup, ENV_DATABASE_KEY) {
            config.database_key = key;
        }

        Ok(config)
    }

    pub fn with_object_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.object_root = root.into();
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_batch_size(raw: &str) -> Result<usize, ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidValue {
        key: ENV_BATCH_SIZE.to_string(),
        value: raw.to_string(),
        message: message.to_string(),
    };

    match raw.parse::<usize>() {
        Ok(0) => Err(invalid("must be greater than zero")),
        Ok(size) => Ok(size),
        Err(err) => Err(invalid(&err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.object_root, PathBuf::from(".salesdb/objects"));
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.output_key, "output.csv");
        assert_eq!(config.database_key, "sales.db");
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_OBJECT_ROOT, "/data/objects"),
            (ENV_WORK_DIR, "/scratch"),
            (ENV_BATCH_SIZE, " 250 "),
            (ENV_DATABASE_KEY, "orders.db"),
        ]))
        .unwrap();

        assert_eq!(config.object_root, PathBuf::from("/data/objects"));
        assert_eq!(config.work_dir, PathBuf::from("/scratch"));
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.output_key, "output.csv");
        assert_eq!(config.database_key, "orders.db");
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[(ENV_OUTPUT_KEY, "  ")])).unwrap();
        assert_eq!(config.output_key, "output.csv");
    }

    #[test]
    fn test_invalid_batch_size() {
        for bad in ["0", "-5", "lots"] {
            let err = EngineConfig::from_lookup(lookup(&[(ENV_BATCH_SIZE, bad)])).unwrap_err();
            let ConfigError::InvalidValue { key, value, .. } = err;
            assert_eq!(key, ENV_BATCH_SIZE);
            assert_eq!(value, bad);
        }
    }
}
