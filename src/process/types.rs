// src/process/types.rs

use serde::Serialize;
use std::collections::HashMap;

/// Opaque identifier, unique within one axis.
pub type Code = String;

/// One entry of the time, category or area axis.
///
/// `skip` and `has_children` only ever go from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisEntry {
    pub code: Code,
    pub name: String,
    pub level: i32,
    pub parent_code: Option<Code>,
    pub unit: Option<String>,
    skip: bool,
    has_children: bool,
}

impl AxisEntry {
    pub fn new(code: impl Into<Code>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            level: 0,
            parent_code: None,
            unit: None,
            skip: false,
            has_children: false,
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<Code>) -> Self {
        self.parent_code = Some(parent.into());
        self
    }

    pub fn with_unit(mut self, unit: Option<String>) -> Self {
        self.unit = unit.filter(|u| !u.is_empty());
        self
    }

    pub fn skip(&self) -> bool {
        self.skip
    }

    pub fn has_children(&self) -> bool {
        self.has_children
    }

    pub fn mark_skipped(&mut self) {
        self.skip = true;
    }

    pub fn mark_has_children(&mut self) {
        self.has_children = true;
    }
}

/// Ordered code → entry map. Order is the order entries appeared in the
/// payload; filtering removes entries or sets flags but never reorders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisTable {
    entries: Vec<AxisEntry>,
    positions: HashMap<Code, usize>,
}

impl AxisTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A repeated code keeps its first position.
    pub fn insert(&mut self, entry: AxisEntry) {
        match self.positions.get(&entry.code) {
            Some(&idx) => self.entries[idx] = entry,
            None => {
                self.positions.insert(entry.code.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&AxisEntry> {
        self.positions.get(code).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut AxisEntry> {
        match self.positions.get(code) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AxisEntry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[AxisEntry] {
        &self.entries
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AxisEntry> {
        self.entries.iter_mut()
    }

    /// Entries not flagged `skip`, in table order.
    pub fn retained(&self) -> impl Iterator<Item = &AxisEntry> {
        self.entries.iter().filter(|e| !e.skip())
    }

    /// Whether `code` names an entry that is still retained.
    pub fn is_retained(&self, code: &str) -> bool {
        self.get(code).map_or(false, |e| !e.skip())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.code.as_str())
    }

    /// Keep only entries whose position satisfies `keep`.
    pub fn retain_positions<F: Fn(usize) -> bool>(&mut self, keep: F) {
        let entries = std::mem::take(&mut self.entries);
        self.positions.clear();
        for (idx, entry) in entries.into_iter().enumerate() {
            if keep(idx) {
                self.positions.insert(entry.code.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

impl FromIterator<AxisEntry> for AxisTable {
    fn from_iter<I: IntoIterator<Item = AxisEntry>>(iter: I) -> Self {
        let mut table = AxisTable::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}

/// One output row. `values` lines up positionally with the table's schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: Code,
    pub name: String,
    pub values: Vec<f64>,
}
