use super::NavError;
use crate::ids::ElementId;
use crate::parsers::CodeBase;
use crate::symbols::Location;
use tracing::debug;

/// A visited place: where the caret was and on which screen row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailEntry {
    pub location: Location,
    pub caret_line: usize,
}

/// LIFO history of visited locations
#[derive(Debug, Clone, Default)]
pub struct NavigationTrail {
    entries: Vec<TrailEntry>,
}

impl NavigationTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push unless the top already holds the same offset. Returns whether it was pushed.
    pub fn push(&mut self, location: Location, caret_line: usize) -> bool {
        if self.entries.last().is_some_and(|top| top.location == location) {
            return false;
        }
        self.entries.push(TrailEntry {
            location,
            caret_line,
        });
        true
    }

    pub fn pop(&mut self) -> Option<TrailEntry> {
        self.entries.pop()
    }

    pub fn peek(&self) -> Option<&TrailEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailEntry> {
        self.entries.iter()
    }
}

/// Moves between locations in a code base, recording where it came from.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    trail: NavigationTrail,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trail(&self) -> &NavigationTrail {
        &self.trail
    }

    pub fn trail_mut(&mut self) -> &mut NavigationTrail {
        &mut self.trail
    }

    fn bound_element(code: &CodeBase, location: &Location) -> Result<ElementId, NavError> {
        match location.element {
            Some(element) if code.is_current(location) => Ok(element),
            _ => Err(NavError::LocationUnavailable {
                offset: location.file_offset,
            }),
        }
    }

    /// Record `current`, fold the section around it and reveal `target`.
    /// Returns the target's absolute offset.
    pub fn goto(
        &mut self,
        code: &mut CodeBase,
        current: TrailEntry,
        target: Location,
    ) -> Result<usize, NavError> {
        let element = Self::bound_element(code, &target)?;
        self.trail.push(current.location, current.caret_line);
        if let Some(here) = current.location.element {
            code.tree_mut().collapse(here);
        }
        code.tree_mut().reveal(element);
        debug!(
            from = current.location.file_offset,
            to = target.file_offset,
            depth = self.trail.len(),
            "goto"
        );
        Ok(target.file_offset)
    }

    /// Return to the most recent trail entry, folding the current place.
    ///
    /// An entry whose location no longer binds stays on the trail.
    pub fn back(&mut self, code: &mut CodeBase, current: Location) -> Result<TrailEntry, NavError> {
        let entry = *self.trail.peek().ok_or(NavError::EmptyTrail)?;
        let element = Self::bound_element(code, &entry.location)?;
        self.trail.pop();
        if let Some(here) = current.element {
            code.tree_mut().collapse(here);
        }
        code.tree_mut().reveal(element);
        debug!(to = entry.location.file_offset, depth = self.trail.len(), "back");
        Ok(entry)
    }
}
