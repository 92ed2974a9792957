// src/process/mod.rs
//! Reshape a sparse e-Stat payload into a dense area × (time, category) table.
//!
//! ```text
//!  bytes ──▶ payload::extract ──▶ hierarchy::filter_areas
//!                                   │
//!        IndexedTable::build ◀──────┘
//!                │
//!                ▼
//!   completeness::mark_incomplete ──▶ header::build_header ──▶ Records
//! ```

pub mod completeness;
pub mod header;
pub mod hierarchy;
pub mod index;
pub mod payload;
pub mod records;
pub mod types;

use tracing::{info, warn};

use crate::config::PipelineOptions;
use crate::error::Result;

pub use index::IndexedTable;
pub use payload::Observation;
pub use records::Records;
pub use types::{AxisEntry, AxisTable, Code, Record};

/// One fully reshaped query result.
#[derive(Debug, Clone)]
pub struct StatsTable {
    times: AxisTable,
    categories: AxisTable,
    areas: AxisTable,
    indexed: IndexedTable,
    schema: Vec<String>,
}

impl StatsTable {
    /// Run the whole pipeline over raw payload bytes.
    #[tracing::instrument(level = "debug", skip(bytes, opts), fields(bytes = bytes.len()))]
    pub fn from_slice(bytes: &[u8], opts: &PipelineOptions) -> Result<Self> {
        let payload::Extracted {
            mut time,
            mut category,
            mut area,
            observations,
        } = payload::extract(bytes)?;

        if let Some(range) = opts.time_range {
            let keep = range.resolve(time.len());
            time.retain_positions(|idx| keep.contains(&idx));
            if time.is_empty() {
                warn!(?range, "time range selected no periods");
            }
        }

        let indexed = IndexedTable::build(&observations, &time);
        if indexed.is_empty() {
            warn!("no observations fall on the selected periods");
        }
        hierarchy::filter_areas(&mut area, opts);
        if opts.skip_incomplete_columns {
            completeness::mark_incomplete(&area, &mut time, &mut category, &indexed);
        }
        let schema = header::build_header(&time, &category);

        info!(
            areas = area.retained().count(),
            columns = schema.len(),
            cells = indexed.len(),
            "built table"
        );

        Ok(Self {
            times: time,
            categories: category,
            areas: area,
            indexed,
            schema,
        })
    }

    /// Column labels, positionally matching every [`Record::values`].
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn times(&self) -> &AxisTable {
        &self.times
    }

    pub fn categories(&self) -> &AxisTable {
        &self.categories
    }

    pub fn areas(&self) -> &AxisTable {
        &self.areas
    }

    pub fn indexed(&self) -> &IndexedTable {
        &self.indexed
    }

    /// The (time, category) pair behind each schema label, in schema order.
    pub fn columns(&self) -> impl Iterator<Item = (&AxisEntry, &AxisEntry)> {
        header::column_pairs(&self.times, &self.categories)
    }

    /// A fresh lazy pass over the rows.
    pub fn records(&self) -> Records<'_> {
        Records::new(
            &self.areas,
            &self.times,
            &self.categories,
            &self.indexed,
            self.schema.len(),
        )
    }
}
