// src/process/hierarchy.rs

use std::collections::HashSet;
use tracing::debug;

use super::types::{AxisTable, Code};
use crate::config::PipelineOptions;

/// Flag areas that should not become rows.
///
/// 1. any area whose level is in `skip_levels`;
/// 2. with `skip_parent_area`, any retained area that is the parent of
///    another retained area (leaves survive);
/// 3. with `skip_child_area`, any retained area whose parent is retained
///    (top-level areas survive).
///
/// Steps 2 and 3 each resolve parents against the set retained when the step
/// starts, so the order in which areas are visited never matters.
pub fn filter_areas(areas: &mut AxisTable, opts: &PipelineOptions) {
    for area in areas.iter_mut() {
        if opts.skip_levels.contains(&area.level) {
            area.mark_skipped();
        }
    }
    debug!(retained = areas.retained().count(), "after level filter");

    if opts.skip_parent_area {
        let view: &AxisTable = areas;
        let parents: Vec<Code> = view
            .retained()
            .filter_map(|a| retained_parent(view, &a.code, a.parent_code.as_deref()))
            .collect();
        for code in &parents {
            if let Some(parent) = areas.get_mut(code) {
                parent.mark_has_children();
            }
        }
        for area in areas.iter_mut() {
            if area.has_children() {
                area.mark_skipped();
            }
        }
        debug!(retained = areas.retained().count(), "after parent filter");
    }

    if opts.skip_child_area {
        let view: &AxisTable = areas;
        let children: HashSet<Code> = view
            .retained()
            .filter(|a| retained_parent(view, &a.code, a.parent_code.as_deref()).is_some())
            .map(|a| a.code.clone())
            .collect();
        for area in areas.iter_mut() {
            if children.contains(&area.code) {
                area.mark_skipped();
            }
        }
        debug!(retained = areas.retained().count(), "after child filter");
    }
}

fn retained_parent(areas: &AxisTable, code: &str, parent: Option<&str>) -> Option<Code> {
    parent
        .filter(|p| *p != code && areas.is_retained(p))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::types::AxisEntry;
    use std::collections::BTreeSet;

    /// 全国 > 北海道 > 札幌市 > {中央区, 北区}, 北海道 > 函館市
    fn hokkaido() -> AxisTable {
        vec![
            AxisEntry::new("00000", "全国").with_level(1),
            AxisEntry::new("01000", "北海道").with_level(2).with_parent("00000"),
            AxisEntry::new("01100", "札幌市").with_level(3).with_parent("01000"),
            AxisEntry::new("01101", "札幌市 中央区").with_level(4).with_parent("01100"),
            AxisEntry::new("01102", "札幌市 北区").with_level(4).with_parent("01100"),
            AxisEntry::new("01202", "函館市").with_level(3).with_parent("01000"),
        ]
        .into_iter()
        .collect()
    }

    fn retained(areas: &AxisTable) -> Vec<&str> {
        areas.retained().map(|a| a.code.as_str()).collect()
    }

    fn opts(parent: bool, child: bool) -> PipelineOptions {
        PipelineOptions {
            skip_parent_area: parent,
            skip_child_area: child,
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn level_filter_only() {
        let mut areas = hokkaido();
        filter_areas(&mut areas, &opts(false, false));
        assert_eq!(
            retained(&areas),
            vec!["01000", "01100", "01101", "01102", "01202"]
        );
    }

    #[test]
    fn parent_filter_keeps_leaves() {
        let mut areas = hokkaido();
        filter_areas(&mut areas, &opts(true, false));
        assert_eq!(retained(&areas), vec!["01101", "01102", "01202"]);
        assert!(areas.get("01100").unwrap().has_children());
        assert!(areas.get("01000").unwrap().has_children());
        // level-skipped areas are never considered as parents
        assert!(!areas.get("00000").unwrap().has_children());
    }

    #[test]
    fn child_filter_keeps_top_level() {
        let mut areas = hokkaido();
        filter_areas(&mut areas, &opts(false, true));
        assert_eq!(retained(&areas), vec!["01000"]);
    }

    #[test]
    fn child_filter_resolves_against_snapshot() {
        // the grandchildren's parent is itself a child; it is still retained
        // when the step starts, so the grandchildren go too
        let mut areas = hokkaido();
        filter_areas(
            &mut areas,
            &PipelineOptions {
                skip_levels: BTreeSet::new(),
                skip_parent_area: false,
                skip_child_area: true,
                ..PipelineOptions::default()
            },
        );
        assert_eq!(retained(&areas), vec!["00000"]);
    }

    #[test]
    fn both_filters_combined() {
        let mut areas = hokkaido();
        filter_areas(&mut areas, &opts(true, true));
        // after the parent step only leaves remain and none of their parents
        // are retained, so the child step removes nothing further
        assert_eq!(retained(&areas), vec!["01101", "01102", "01202"]);
    }

    #[test]
    fn self_parent_is_ignored() {
        let mut areas: AxisTable = vec![
            AxisEntry::new("A", "A").with_level(2).with_parent("A"),
            AxisEntry::new("B", "B").with_level(2).with_parent("missing"),
        ]
        .into_iter()
        .collect();
        filter_areas(&mut areas, &opts(true, true));
        assert_eq!(retained(&areas), vec!["A", "B"]);
    }

    #[test]
    fn skipped_flags_never_clear() {
        let mut areas = hokkaido();
        filter_areas(&mut areas, &opts(true, false));
        let skipped: Vec<String> = areas
            .iter()
            .filter(|a| a.skip())
            .map(|a| a.code.clone())
            .collect();
        filter_areas(&mut areas, &opts(false, false));
        for code in skipped {
            assert!(areas.get(&code).unwrap().skip(), "{} was un-skipped", code);
        }
    }
}
