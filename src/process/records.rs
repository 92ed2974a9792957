// src/process/records.rs

use std::slice;
use tracing::debug;

use super::index::IndexedTable;
use super::types::{AxisEntry, AxisTable, Record};

/// Lazy row producer: one [`Record`] per retained area, in table order.
///
/// Rows with any missing cell are dropped. Restart by asking the table for a
/// fresh iterator.
pub struct Records<'a> {
    areas: slice::Iter<'a, AxisEntry>,
    times: &'a AxisTable,
    categories: &'a AxisTable,
    indexed: &'a IndexedTable,
    width: usize,
}

impl<'a> Records<'a> {
    pub(crate) fn new(
        areas: &'a AxisTable,
        times: &'a AxisTable,
        categories: &'a AxisTable,
        indexed: &'a IndexedTable,
        width: usize,
    ) -> Self {
        Self {
            areas: areas.as_slice().iter(),
            times,
            categories,
            indexed,
            width,
        }
    }

}

/// Every cell of `area`'s row, or `None` at the first gap.
fn assemble(
    times: &AxisTable,
    categories: &AxisTable,
    indexed: &IndexedTable,
    area: &AxisEntry,
    width: usize,
) -> Option<Vec<f64>> {
    let mut values = Vec::with_capacity(width);
    for t in times.retained() {
        for c in categories.retained() {
            values.push(indexed.get(&t.code, &area.code, &c.code)?);
        }
    }
    Some(values)
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        for area in self.areas.by_ref() {
            if area.skip() {
                continue;
            }
            match assemble(self.times, self.categories, self.indexed, area, self.width) {
                Some(values) => {
                    return Some(Record {
                        id: area.code.clone(),
                        name: area.name.clone(),
                        values,
                    })
                }
                None => debug!(area = %area.code, "dropping row with missing cells"),
            }
        }
        None
    }
}
