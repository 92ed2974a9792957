// src/config.rs

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs,
    ops::Range,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{EstatError, Result};

/// Environment variable consulted when no application id is passed explicitly.
pub const APP_ID_ENV: &str = "ESTATJP_APPID";

pub const DEFAULT_API_VERSION: &str = "2.1";

/// Positional slice over the time axis, in source order.
///
/// Negative indices count from the end (`-1` is the last period). The end is
/// exclusive unless `inclusive` is set, so `{start: -3, end: -1, inclusive: true}`
/// selects the last three periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub inclusive: bool,
}

impl TimeRange {
    /// `[start, end)`.
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            inclusive: false,
        }
    }

    /// `[start, end]`.
    pub fn inclusive(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            inclusive: true,
        }
    }

    /// Concrete positions selected from an axis of `len` entries.
    /// A start outside the axis selects nothing; the end is clamped.
    pub fn resolve(&self, len: usize) -> Range<usize> {
        let len = len as i64;
        let from_end = |i: i64| if i < 0 { i + len } else { i };

        let start = from_end(self.start);
        if start < 0 || start > len {
            return 0..0;
        }
        let mut end = from_end(self.end);
        if self.inclusive {
            end += 1;
        }
        let end = end.clamp(start, len);
        start as usize..end as usize
    }
}

/// Knobs for reshaping one payload into a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Area levels dropped outright. Level 1 is the national aggregate.
    pub skip_levels: BTreeSet<i32>,
    /// Keep only hierarchy leaves.
    pub skip_parent_area: bool,
    /// Keep only top-level areas.
    pub skip_child_area: bool,
    /// Drop time/category columns that are missing for any retained area.
    pub skip_incomplete_columns: bool,
    pub time_range: Option<TimeRange>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            skip_levels: BTreeSet::from([1]),
            skip_parent_area: true,
            skip_child_area: false,
            skip_incomplete_columns: true,
            time_range: None,
        }
    }
}

/// Top-level configuration, usually loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_id: Option<String>,
    pub cache_dir: PathBuf,
    pub api_version: String,
    pub options: PipelineOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: None,
            cache_dir: PathBuf::from("cache"),
            api_version: DEFAULT_API_VERSION.to_string(),
            options: PipelineOptions::default(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| EstatError::Config(e.to_string()))
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

/// Pick the application id: explicit value first, then the environment.
/// Empty strings count as absent.
pub fn resolve_app_id(explicit: Option<&str>, from_env: Option<String>) -> Result<String> {
    explicit
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| from_env.filter(|s| !s.trim().is_empty()))
        .ok_or(EstatError::MissingCredential)
}

/// [`resolve_app_id`] against the live process environment.
pub fn app_id_from_env(explicit: Option<&str>) -> Result<String> {
    resolve_app_id(explicit, std::env::var(APP_ID_ENV).ok())
}
