// src/process/index.rs

use std::collections::HashMap;
use tracing::debug;

use super::payload::Observation;
use super::types::{AxisTable, Code};

type CategoryValues = HashMap<Code, f64>;

/// Sparse lookup `time → area → category → value`. Built once, read-only after.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedTable {
    cells: HashMap<Code, HashMap<Code, CategoryValues>>,
}

impl IndexedTable {
    /// Fold observations whose time code is in `times`. Unknown time codes are
    /// dropped; a repeated (time, area, category) key keeps the later value.
    pub fn build(observations: &[Observation], times: &AxisTable) -> Self {
        let mut cells: HashMap<Code, HashMap<Code, CategoryValues>> = times
            .codes()
            .map(|t| (t.to_string(), HashMap::new()))
            .collect();

        let mut dropped = 0usize;
        for obs in observations {
            let Some(by_area) = cells.get_mut(&obs.time) else {
                dropped += 1;
                continue;
            };
            by_area
                .entry(obs.area.clone())
                .or_default()
                .insert(obs.category.clone(), obs.value);
        }

        debug!(
            indexed = observations.len() - dropped,
            dropped, "indexed observations"
        );
        Self { cells }
    }

    /// Whether `area` has any cell at all under `time`.
    pub fn has_area(&self, time: &str, area: &str) -> bool {
        self.cells
            .get(time)
            .map_or(false, |by_area| by_area.contains_key(area))
    }

    pub fn get(&self, time: &str, area: &str, category: &str) -> Option<f64> {
        self.cells.get(time)?.get(area)?.get(category).copied()
    }

    /// Number of stored cells.
    pub fn len(&self) -> usize {
        self.cells
            .values()
            .flat_map(|by_area| by_area.values())
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
