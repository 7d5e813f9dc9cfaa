//! Bounded multi-selection of schools.

use spr_api::model::SchoolId;

/// What a [`EntitySelector::toggle`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// The selection was already at its limit; nothing changed.
    Full,
}

/// Up to `max` selected schools, kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySelector {
    max: usize,
    selected: Vec<SchoolId>,
}

impl EntitySelector {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            selected: Vec::with_capacity(max),
        }
    }

    /// Deselect `id` if selected, otherwise select it when there is room.
    pub fn toggle(&mut self, id: SchoolId) -> ToggleOutcome {
        if let Some(pos) = self.position(id) {
            self.selected.remove(pos);
            return ToggleOutcome::Removed;
        }
        if self.is_full() {
            return ToggleOutcome::Full;
        }
        self.selected.push(id);
        ToggleOutcome::Added
    }

    pub fn selected(&self) -> &[SchoolId] {
        &self.selected
    }

    pub fn contains(&self, id: SchoolId) -> bool {
        self.selected.contains(&id)
    }

    /// Display position of `id`, stable while it stays selected.
    pub fn position(&self, id: SchoolId) -> Option<usize> {
        self.selected.iter().position(|s| *s == id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.selected.len() >= self.max
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
