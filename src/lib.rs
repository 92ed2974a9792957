//! Turn e-Stat `getStatsData` payloads into dense per-area tables.

pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod process;

pub use config::{Config, PipelineOptions, TimeRange};
pub use error::{EstatError, Result};
pub use fetch::{EstatClient, Metadata, Query};
pub use process::{Record, StatsTable};
