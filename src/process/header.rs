// src/process/header.rs

use super::types::{AxisEntry, AxisTable};

/// Every retained (time, category) pair, time-major, category-minor.
pub fn column_pairs<'a>(
    times: &'a AxisTable,
    categories: &'a AxisTable,
) -> impl Iterator<Item = (&'a AxisEntry, &'a AxisEntry)> + 'a {
    times
        .retained()
        .flat_map(move |t| categories.retained().map(move |c| (t, c)))
}

/// Column labels `"<time>_<category>"` for every retained pair.
pub fn build_header(times: &AxisTable, categories: &AxisTable) -> Vec<String> {
    column_pairs(times, categories)
        .map(|(t, c)| format!("{}_{}", t.name, c.name))
        .collect()
}
