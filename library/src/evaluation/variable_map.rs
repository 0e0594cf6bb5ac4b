//! Maps field sources to the procedure variables built for them.

use std::collections::HashMap;

use uuid::Uuid;

use crate::field::Field;
use crate::procedure::VariableId;

/// Field source id → variables holding its outputs, in insertion order.
///
/// Each source is added at most once per procedure build; that is what makes shared
/// sub-expressions compute once.
#[derive(Default, Debug)]
pub struct UniqueVariableMap {
    index: HashMap<Uuid, usize>,
    entries: Vec<(Uuid, Vec<VariableId>)>,
}

impl UniqueVariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, source_id: Uuid) -> bool {
        self.index.contains_key(&source_id)
    }

    /// Record the variables of a source. Returns false if the source was already present.
    pub fn add(&mut self, source_id: Uuid, variables: Vec<VariableId>) -> bool {
        if self.contains(source_id) {
            return false;
        }
        self.index.insert(source_id, self.entries.len());
        self.entries.push((source_id, variables));
        true
    }

    pub fn lookup(&self, source_id: Uuid) -> Option<&[VariableId]> {
        self.index
            .get(&source_id)
            .map(|&i| self.entries[i].1.as_slice())
    }

    /// Variable holding the value of `field`.
    pub fn variable_for(&self, field: &Field) -> Option<VariableId> {
        self.lookup(field.source_id())?
            .get(field.output_index())
            .copied()
    }

    /// Every recorded variable, sources in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.entries
            .iter()
            .flat_map(|(_, variables)| variables.iter().copied())
    }

    /// Number of sources recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
