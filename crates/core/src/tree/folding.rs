use super::CodeTree;
use crate::ids::ElementId;
use crate::models::LineKind;

impl CodeTree {
    /// The section an element belongs to: itself if it is one, else its parent.
    pub fn section_of(&self, id: ElementId) -> ElementId {
        if self.is_leaf(id) {
            self.parent(id).unwrap_or_else(|| self.root())
        } else {
            id
        }
    }

    pub fn has_sub_blocks(&self, id: ElementId) -> bool {
        self.children(id)
            .iter()
            .any(|&child| self.kind(child) == Some(LineKind::SubBlock))
    }

    fn is_fold_boundary(&self, id: ElementId) -> bool {
        id == self.root() || self.kind(id).is_some_and(|kind| kind.is_structural())
    }

    /// Fold the section holding `id`.
    ///
    /// Only that section folds, except that a request travelling up from a
    /// nested section folds the enclosing block when the block has no
    /// sub-blocks. Returns whether anything changed.
    pub fn collapse(&mut self, id: ElementId) -> bool {
        let section = self.section_of(id);
        if section == self.root() {
            return false;
        }
        if self.kind(section) == Some(LineKind::Block) && self.has_sub_blocks(section) {
            return false;
        }
        let mut changed = !self.is_folded(section);
        self.set_folded(section, true);
        if self.is_fold_boundary(section) {
            return changed;
        }

        for ancestor in self.ancestors(section) {
            match self.kind(ancestor) {
                Some(LineKind::Block) => {
                    if !self.has_sub_blocks(ancestor) && !self.is_folded(ancestor) {
                        self.set_folded(ancestor, true);
                        changed = true;
                    }
                    break;
                }
                Some(LineKind::SubBlock | LineKind::CodeBase) | None => break,
                _ => {}
            }
        }
        changed
    }

    /// Unfold the section holding `id` and every ancestor up to the nearest
    /// block, sub-block or root.
    pub fn expand(&mut self, id: ElementId) {
        let section = self.section_of(id);
        self.set_folded(section, false);
        if self.is_fold_boundary(section) {
            return;
        }
        for ancestor in self.ancestors(section) {
            self.set_folded(ancestor, false);
            if self.is_fold_boundary(ancestor) {
                break;
            }
        }
    }

    /// Unfold every folded ancestor so `id` becomes directly addressable.
    pub fn reveal(&mut self, id: ElementId) {
        for ancestor in self.ancestors(id) {
            if self.is_folded(ancestor) {
                self.set_folded(ancestor, false);
            }
        }
    }

    pub fn expand_all(&mut self) {
        for id in self.ids().collect::<Vec<_>>() {
            self.set_folded(id, false);
        }
    }
}
