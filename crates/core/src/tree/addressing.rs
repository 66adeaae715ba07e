//! Fold-aware addressing.
//!
//! A walk counts one step per *unit*: a leaf whose ancestors are all
//! unfolded, or a folded section whose ancestors are all unfolded. Units
//! hidden inside a folded section are never visited.

use super::{CodeTree, ElementBody};
use crate::ids::ElementId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn of(steps: isize) -> Self {
        if steps < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}

/// Result of [`CodeTree::get_element_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Landing {
    pub element: ElementId,
    /// `file_offset(element) - base`, except when the walk ran off an end:
    /// then `base + delta` is line 0 or the last line of the file.
    pub delta: isize,
    /// The walk ran off either end of the file, or `base` was past the end.
    pub clamped: bool,
}

impl CodeTree {
    /// The unit that stands for `id`: its outermost folded ancestor, or `id` itself.
    pub fn addressable(&self, id: ElementId) -> ElementId {
        let root = self.root();
        self.ancestors(id)
            .into_iter()
            .filter(|&a| a != root && self.is_folded(a))
            .last()
            .unwrap_or(id)
    }

    /// Descend into `id` until reaching a unit, from the front or the back.
    pub fn first_unit(&self, id: ElementId, direction: Direction) -> ElementId {
        let mut cur = id;
        loop {
            let Some(section) = self.section(cur) else {
                return cur;
            };
            if section.is_folded() && cur != self.root() {
                return cur;
            }
            let next = match direction {
                Direction::Forward => section.children().first(),
                Direction::Backward => section.children().last(),
            };
            match next {
                Some(&child) => cur = child,
                None => return cur,
            }
        }
    }

    /// Whether `id` is currently a visible unit.
    pub fn is_unit(&self, id: ElementId) -> bool {
        self.addressable(id) == id && self.first_unit(id, Direction::Forward) == id
    }

    /// The adjacent unit in `direction`, or `None` at either end of the file.
    pub fn get_next_element(&self, from: ElementId, direction: Direction) -> Option<ElementId> {
        let mut cur = self.first_unit(self.addressable(from), direction);
        loop {
            let node = self.get(cur)?;
            let parent = node.parent()?;
            let siblings = self.children(parent);
            let idx = node.index_in_parent();
            let sibling = match direction {
                Direction::Forward => siblings.get(idx + 1),
                Direction::Backward => idx.checked_sub(1).and_then(|i| siblings.get(i)),
            };
            if let Some(&sibling) = sibling {
                return Some(self.first_unit(sibling, direction));
            }
            cur = parent;
        }
    }

    /// The unit covering line `offset` under the current fold state.
    pub fn unit_at(&self, offset: usize) -> Option<ElementId> {
        let mut cur = self.root();
        let mut start = 0;
        loop {
            let section = match self.get(cur)?.body() {
                ElementBody::Leaf(_) => return Some(cur),
                ElementBody::Section(section) => section,
            };
            if section.is_folded() && cur != self.root() {
                return Some(cur);
            }
            let mut next = None;
            for &child in section.children() {
                let len = self.length(child);
                if offset < start + len {
                    next = Some(child);
                    break;
                }
                start += len;
            }
            cur = next?;
        }
    }

    /// Walk `steps` units from line `base` and report where the walk landed.
    ///
    /// `base` past the end is clamped to the last line. A walk that runs
    /// off either end stops on the boundary unit and reports the first or
    /// last line of the file. Returns `None` only for an empty tree.
    pub fn get_element_at(&self, base: usize, steps: isize) -> Option<Landing> {
        let total = self.length(self.root());
        if total == 0 {
            return None;
        }
        let mut clamped = base >= total;
        let mut cur = self.unit_at(base.min(total - 1))?;

        let direction = Direction::of(steps);
        let mut ran_off = false;
        for _ in 0..steps.unsigned_abs() {
            match self.get_next_element(cur, direction) {
                Some(next) => cur = next,
                None => {
                    ran_off = true;
                    break;
                }
            }
        }

        let landed = match (ran_off, direction) {
            (true, Direction::Forward) => total - 1,
            (true, Direction::Backward) => 0,
            (false, _) => self.file_offset(cur),
        };
        clamped |= ran_off;
        Some(Landing {
            element: cur,
            delta: landed as isize - base as isize,
            clamped,
        })
    }

    /// Every visible unit in source order.
    pub fn visible_units(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        if self.children(self.root()).is_empty() {
            return out;
        }
        let mut cur = Some(self.first_unit(self.root(), Direction::Forward));
        while let Some(id) = cur {
            out.push(id);
            cur = self.get_next_element(id, Direction::Forward);
        }
        out
    }

    /// Text of each visible unit; folded sections show their summary.
    pub fn visible_lines(&self) -> Vec<String> {
        self.visible_units()
            .into_iter()
            .filter_map(|id| self.text(id).map(ToString::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineKind;
    use crate::text::TextLine;
    use crate::tree::tests::small_tree;

    #[test]
    fn test_folded_section_is_one_step() {
        let (tree, f) = small_tree();
        let first = tree.children(tree.root())[0];
        assert_eq!(tree.get_next_element(first, Direction::Forward), Some(f));
        let landing = tree.get_element_at(0, 2).unwrap();
        assert_eq!(tree.text(landing.element).unwrap().as_str(), "b");
        assert_eq!(landing.delta, 4);
        assert!(!landing.clamped);
    }

    #[test]
    fn test_unfolded_section_counts_lines() {
        let (mut tree, f) = small_tree();
        tree.set_folded(f, false);
        let landing = tree.get_element_at(0, 2).unwrap();
        assert_eq!(tree.text(landing.element).unwrap().as_str(), "x;");
        assert_eq!(landing.delta, 2);
        assert_eq!(tree.visible_units().len(), 5);
    }

    #[test]
    fn test_offset_identity_for_units() {
        let (mut tree, f) = small_tree();
        for folded in [true, false] {
            tree.set_folded(f, folded);
            for unit in tree.visible_units() {
                let landing = tree.get_element_at(tree.file_offset(unit), 0).unwrap();
                assert_eq!(landing.element, unit);
                assert_eq!(landing.delta, 0);
            }
        }
    }

    #[test]
    fn test_inside_folded_lands_on_section() {
        let (tree, f) = small_tree();
        let landing = tree.get_element_at(2, 0).unwrap();
        assert_eq!(landing.element, f);
        assert_eq!(landing.delta, -1);
    }

    #[test]
    fn test_clamps_at_both_ends() {
        let (tree, _) = small_tree();
        let landing = tree.get_element_at(0, -3).unwrap();
        assert_eq!(landing.element, tree.children(tree.root())[0]);
        assert!(landing.clamped);

        let landing = tree.get_element_at(4, 10).unwrap();
        assert_eq!(tree.text(landing.element).unwrap().as_str(), "b");
        assert!(landing.clamped);

        let landing = tree.get_element_at(99, 0).unwrap();
        assert_eq!(tree.text(landing.element).unwrap().as_str(), "b");
        assert!(landing.clamped);
    }

    #[test]
    fn test_run_off_reports_file_boundaries() {
        let mut tree = CodeTree::new();
        let root = tree.root();
        tree.push_leaf(root, LineKind::Code, "a").unwrap();
        let head = TextLine::new("void g() {");
        let g = tree
            .push_section(root, LineKind::FunctionDef, &head, true)
            .unwrap();
        tree.push_leaf(g, LineKind::Code, head).unwrap();
        tree.push_leaf(g, LineKind::Code, "y;").unwrap();
        tree.push_leaf(g, LineKind::Code, "}").unwrap();

        // the last unit is a folded section starting on line 1
        let landing = tree.get_element_at(0, 100).unwrap();
        assert_eq!(landing.element, g);
        assert!(landing.clamped);
        assert_eq!(landing.delta, 3);

        let landing = tree.get_element_at(2, -100).unwrap();
        assert_eq!(tree.text(landing.element).unwrap().as_str(), "a");
        assert!(landing.clamped);
        assert_eq!(landing.delta, -2);

        // an in-range walk still reports the unit start
        let landing = tree.get_element_at(0, 1).unwrap();
        assert_eq!(landing.element, g);
        assert_eq!(landing.delta, 1);
        assert!(!landing.clamped);
    }

    #[test]
    fn test_empty_tree_has_no_landing() {
        let tree = CodeTree::new();
        assert_eq!(tree.get_element_at(0, 0), None);
        assert!(tree.visible_units().is_empty());
    }

    #[test]
    fn test_backward_enters_unfolded_from_the_end() {
        let (mut tree, f) = small_tree();
        tree.set_folded(f, false);
        let last = *tree.children(tree.root()).last().unwrap();
        let prev = tree.get_next_element(last, Direction::Backward).unwrap();
        assert_eq!(tree.text(prev).unwrap().as_str(), "}");
    }

    #[test]
    fn test_nested_fold_hides_inner_units() {
        let mut tree = CodeTree::new();
        let root = tree.root();
        let head = TextLine::new("class A {");
        let class = tree.push_section(root, LineKind::Class, &head, true).unwrap();
        tree.push_leaf(class, LineKind::Code, head).unwrap();
        let inner_head = TextLine::new("void f() {");
        let inner = tree
            .push_section(class, LineKind::ClassMethodDef, &inner_head, false)
            .unwrap();
        tree.push_leaf(inner, LineKind::Code, inner_head).unwrap();
        tree.push_leaf(inner, LineKind::Code, "}").unwrap();
        tree.push_leaf(class, LineKind::Code, "};").unwrap();

        assert_eq!(tree.visible_units(), vec![class]);
        let leaf = tree.leaf_at(2).unwrap();
        assert_eq!(tree.addressable(leaf), class);
        assert_eq!(tree.visible_lines(), vec!["class A {...}"]);
    }
}
