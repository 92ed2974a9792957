// src/process/completeness.rs

use tracing::debug;

use super::index::IndexedTable;
use super::types::AxisTable;

/// Flag time and category entries that are not populated for every retained area.
///
/// For each retained area and each time entry: no cell at all for that
/// (time, area) flags the time and moves on without looking at categories;
/// otherwise every category absent under that (time, area) is flagged.
/// Flags accumulate, so the worst-covered area decides which columns go.
pub fn mark_incomplete(
    areas: &AxisTable,
    times: &mut AxisTable,
    categories: &mut AxisTable,
    indexed: &IndexedTable,
) {
    for area in areas.retained() {
        for time in times.iter_mut() {
            if !indexed.has_area(&time.code, &area.code) {
                time.mark_skipped();
                continue;
            }
            for cat in categories.iter_mut() {
                if indexed.get(&time.code, &area.code, &cat.code).is_none() {
                    cat.mark_skipped();
                }
            }
        }
    }

    debug!(
        times_kept = times.retained().count(),
        categories_kept = categories.retained().count(),
        "completeness filter"
    );
}
