//! The code element tree.
//!
//! Elements live in an arena owned by [`CodeTree`] and refer to each other by
//! [`ElementId`]. A section owns its children (they are only reachable through
//! it); the `parent` handle on every element is a back-link used for lookup
//! and offset computation.
//!
//! A section's length is the number of source lines below it, whatever its
//! fold state. Folding only changes how many steps a walk needs to cross it
//! (see [`addressing`](self::addressing)).

mod addressing;
mod folding;

pub use addressing::{Direction, Landing};

use crate::ids::ElementId;
use crate::models::LineKind;
use crate::symbols::{TypeRef, VarSet};
use crate::text::TextLine;

#[derive(Debug, Clone)]
pub struct CodeElement {
    kind: LineKind,
    parent: Option<ElementId>,
    index_in_parent: usize,
    body: ElementBody,
}

#[derive(Debug, Clone)]
pub enum ElementBody {
    /// One literal source line
    Leaf(TextLine),
    Section(CodeSection),
}

#[derive(Debug, Clone, Default)]
pub struct CodeSection {
    children: Vec<ElementId>,
    /// Single line shown while folded
    summary: TextLine,
    folded: bool,
    /// Struct or class whose body this section is
    symbol_link: Option<TypeRef>,
    /// Variables declared directly in this section
    vars: VarSet,
    length: usize,
}

impl CodeSection {
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn summary(&self) -> &TextLine {
        &self.summary
    }

    pub fn is_folded(&self) -> bool {
        self.folded
    }

    pub fn symbol_link(&self) -> Option<TypeRef> {
        self.symbol_link
    }

    pub fn vars(&self) -> &VarSet {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl CodeElement {
    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn index_in_parent(&self) -> usize {
        self.index_in_parent
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.body, ElementBody::Leaf(_))
    }

    pub fn body(&self) -> &ElementBody {
        &self.body
    }

    pub fn section(&self) -> Option<&CodeSection> {
        match &self.body {
            ElementBody::Section(section) => Some(section),
            ElementBody::Leaf(_) => None,
        }
    }

    /// Literal line for a leaf, summary line for a section
    pub fn text(&self) -> &TextLine {
        match &self.body {
            ElementBody::Leaf(line) => line,
            ElementBody::Section(section) => &section.summary,
        }
    }

    pub fn len(&self) -> usize {
        match &self.body {
            ElementBody::Leaf(_) => 1,
            ElementBody::Section(section) => section.length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the fold summary for a section from its first source line.
pub fn summarize(first_line: &TextLine) -> TextLine {
    let mut summary = first_line.clone();
    let trimmed_end = summary.as_str().trim_end().len();
    summary.cut_range(trimmed_end, summary.len());
    if summary.ends_with("{") {
        summary.push_str("...}");
    } else {
        summary.push_str(" {...}");
    }
    summary
}

/// Arena holding every element of one parsed file. Index 0 is the root.
#[derive(Debug, Clone)]
pub struct CodeTree {
    nodes: Vec<CodeElement>,
}

impl Default for CodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeTree {
    /// Create a tree holding only an empty `CodeBase` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![CodeElement {
                kind: LineKind::CodeBase,
                parent: None,
                index_in_parent: 0,
                body: ElementBody::Section(CodeSection::default()),
            }],
        }
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn element_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: ElementId) -> Option<&CodeElement> {
        self.nodes.get(id.index())
    }

    pub fn contains(&self, id: ElementId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> {
        (0..self.nodes.len()).map(ElementId::from_index)
    }

    pub fn kind(&self, id: ElementId) -> Option<LineKind> {
        self.get(id).map(CodeElement::kind)
    }

    pub fn is_leaf(&self, id: ElementId) -> bool {
        self.get(id).is_some_and(CodeElement::is_leaf)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(CodeElement::parent)
    }

    pub fn section(&self, id: ElementId) -> Option<&CodeSection> {
        self.get(id).and_then(CodeElement::section)
    }

    fn section_mut(&mut self, id: ElementId) -> Option<&mut CodeSection> {
        match self.nodes.get_mut(id.index()).map(|node| &mut node.body) {
            Some(ElementBody::Section(section)) => Some(section),
            _ => None,
        }
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.section(id).map(CodeSection::children).unwrap_or(&[])
    }

    pub fn text(&self, id: ElementId) -> Option<&TextLine> {
        self.get(id).map(CodeElement::text)
    }

    /// Logical line count, independent of folding
    pub fn length(&self, id: ElementId) -> usize {
        self.get(id).map_or(0, CodeElement::len)
    }

    pub fn is_folded(&self, id: ElementId) -> bool {
        self.section(id).is_some_and(CodeSection::is_folded)
    }

    /// Fold or unfold one section. The root never folds.
    pub fn set_folded(&mut self, id: ElementId, folded: bool) -> bool {
        if id == self.root() {
            return false;
        }
        match self.section_mut(id) {
            Some(section) => {
                section.folded = folded;
                true
            }
            None => false,
        }
    }

    pub fn symbol_link(&self, id: ElementId) -> Option<TypeRef> {
        self.section(id).and_then(CodeSection::symbol_link)
    }

    pub fn set_symbol_link(&mut self, id: ElementId, link: Option<TypeRef>) {
        if let Some(section) = self.section_mut(id) {
            section.symbol_link = link;
        }
    }

    pub fn vars(&self, id: ElementId) -> Option<&VarSet> {
        self.section(id).map(CodeSection::vars)
    }

    pub fn vars_mut(&mut self, id: ElementId) -> Option<&mut VarSet> {
        self.section_mut(id).map(|section| &mut section.vars)
    }

    /// Ancestors from the parent upwards, ending at the root
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    fn attach(&mut self, parent: ElementId, kind: LineKind, body: ElementBody) -> Option<ElementId> {
        let id = ElementId::from_index(self.nodes.len());
        let added = match &body {
            ElementBody::Leaf(_) => 1,
            ElementBody::Section(section) => section.length,
        };
        let index_in_parent = {
            let section = self.section_mut(parent)?;
            section.children.push(id);
            section.children.len() - 1
        };
        self.nodes.push(CodeElement {
            kind,
            parent: Some(parent),
            index_in_parent,
            body,
        });

        if added > 0 {
            let mut cur = Some(parent);
            while let Some(p) = cur {
                if let Some(section) = self.section_mut(p) {
                    section.length += added;
                }
                cur = self.parent(p);
            }
        }
        Some(id)
    }

    /// Append a single-line element to `parent`.
    pub fn push_leaf(
        &mut self,
        parent: ElementId,
        kind: LineKind,
        line: impl Into<TextLine>,
    ) -> Option<ElementId> {
        self.attach(parent, kind, ElementBody::Leaf(line.into()))
    }

    /// Append an empty section to `parent`; its summary is built from `first_line`.
    pub fn push_section(
        &mut self,
        parent: ElementId,
        kind: LineKind,
        first_line: &TextLine,
        folded: bool,
    ) -> Option<ElementId> {
        let section = CodeSection {
            summary: summarize(first_line),
            folded,
            ..CodeSection::default()
        };
        self.attach(parent, kind, ElementBody::Section(section))
    }

    /// Append a section with an explicit summary line (snapshot loading).
    pub(crate) fn push_section_raw(
        &mut self,
        parent: ElementId,
        kind: LineKind,
        summary: TextLine,
        folded: bool,
    ) -> Option<ElementId> {
        let section = CodeSection {
            summary,
            folded,
            ..CodeSection::default()
        };
        self.attach(parent, kind, ElementBody::Section(section))
    }

    /// Absolute line offset at which `id` starts.
    pub fn file_offset(&self, id: ElementId) -> usize {
        let mut offset = 0;
        let mut cur = id;
        while let Some(node) = self.get(cur) {
            let Some(parent) = node.parent else { break };
            offset += self.children(parent)[..node.index_in_parent]
                .iter()
                .map(|&sib| self.length(sib))
                .sum::<usize>();
            cur = parent;
        }
        offset
    }

    /// The leaf holding line `offset`, regardless of fold state.
    pub fn leaf_at(&self, offset: usize) -> Option<ElementId> {
        let mut cur = self.root();
        let mut start = 0;
        loop {
            let section = match self.get(cur)?.body() {
                ElementBody::Leaf(_) => return Some(cur),
                ElementBody::Section(section) => section,
            };
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

    /// All leaves below `id` in source order.
    pub fn leaves(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out);
        out
    }

    fn collect_leaves(&self, id: ElementId, out: &mut Vec<ElementId>) {
        match self.get(id).map(CodeElement::body) {
            Some(ElementBody::Leaf(_)) => out.push(id),
            Some(ElementBody::Section(section)) => {
                for &child in section.children() {
                    self.collect_leaves(child, out);
                }
            }
            None => {}
        }
    }

    /// Every source line in order, as text.
    pub fn source_lines(&self) -> Vec<String> {
        self.leaves(self.root())
            .into_iter()
            .filter_map(|id| self.text(id).map(ToString::to_string))
            .collect()
    }

    /// Check that every section's length equals the sum of its children.
    pub fn check_lengths(&self) -> Result<(), ElementId> {
        for id in self.ids() {
            if let Some(section) = self.section(id) {
                let sum: usize = section.children().iter().map(|&c| self.length(c)).sum();
                if sum != section.len() {
                    return Err(id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// root
    /// ├─ "a"
    /// ├─ fn (folded) ["int f() {", "x;", "}"]
    /// └─ "b"
    pub(crate) fn small_tree() -> (CodeTree, ElementId) {
        let mut tree = CodeTree::new();
        let root = tree.root();
        tree.push_leaf(root, LineKind::Code, "a").unwrap();
        let head = TextLine::new("int f() {");
        let f = tree
            .push_section(root, LineKind::FunctionDef, &head, true)
            .unwrap();
        tree.push_leaf(f, LineKind::Code, head).unwrap();
        tree.push_leaf(f, LineKind::Code, "x;").unwrap();
        tree.push_leaf(f, LineKind::Code, "}").unwrap();
        tree.push_leaf(root, LineKind::Code, "b").unwrap();
        (tree, f)
    }

    #[test]
    fn test_lengths_and_offsets() {
        let (tree, f) = small_tree();
        assert_eq!(tree.length(tree.root()), 5);
        assert_eq!(tree.length(f), 3);
        assert_eq!(tree.file_offset(f), 1);
        let last = *tree.children(tree.root()).last().unwrap();
        assert_eq!(tree.file_offset(last), 4);
        assert!(tree.check_lengths().is_ok());
    }

    #[test]
    fn test_summary_suffixes() {
        assert_eq!(summarize(&TextLine::new("int f() {  ")).as_str(), "int f() {...}");
        assert_eq!(summarize(&TextLine::new("class Foo")).as_str(), "class Foo {...}");
    }

    #[test]
    fn test_leaf_at_ignores_folds() {
        let (tree, f) = small_tree();
        let leaf = tree.leaf_at(2).unwrap();
        assert_eq!(tree.parent(leaf), Some(f));
        assert_eq!(tree.text(leaf).unwrap().as_str(), "x;");
        assert_eq!(tree.leaf_at(5), None);
    }

    #[test]
    fn test_root_never_folds() {
        let (mut tree, f) = small_tree();
        let root = tree.root();
        assert!(!tree.set_folded(root, true));
        assert!(!tree.is_folded(root));
        assert!(tree.set_folded(f, false));
        assert!(!tree.is_folded(f));
    }

    #[test]
    fn test_source_lines_in_order() {
        let (tree, _) = small_tree();
        assert_eq!(
            tree.source_lines(),
            vec!["a", "int f() {", "x;", "}", "b"]
        );
    }
}
