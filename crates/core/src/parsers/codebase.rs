use super::ParseDiagnostic;
use crate::ids::ElementId;
use crate::models::Dialect;
use crate::symbols::{Location, SymbolTable};
use crate::tree::CodeTree;

/// One parsed file: its element tree and the symbols declared in it.
#[derive(Debug, Clone, Default)]
pub struct CodeBase {
    pub(crate) tree: CodeTree,
    pub(crate) symbols: SymbolTable,
    pub(crate) dialect: Dialect,
    pub(crate) block_count: usize,
    pub(crate) diagnostics: Vec<ParseDiagnostic>,
}

impl CodeBase {
    pub fn new(tree: CodeTree, symbols: SymbolTable, dialect: Dialect) -> Self {
        Self {
            tree,
            symbols,
            dialect,
            ..Default::default()
        }
    }

    pub fn tree(&self) -> &CodeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut CodeTree {
        &mut self.tree
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Blocks found in a structured file; 0 when flat
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    pub fn line_count(&self) -> usize {
        self.tree.length(self.tree.root())
    }

    /// Bind an offset to the leaf holding that line.
    pub fn locate(&self, file_offset: usize) -> Option<Location> {
        self.tree
            .leaf_at(file_offset)
            .map(|leaf| Location::new(leaf, file_offset))
    }

    /// Whether `location` still points at the leaf for its offset.
    pub fn is_current(&self, location: &Location) -> bool {
        match location.element {
            Some(element) => self.tree.leaf_at(location.file_offset) == Some(element),
            None => false,
        }
    }

    pub fn element_line(&self, element: ElementId) -> Option<&str> {
        self.tree.text(element).map(|t| t.as_str())
    }
}
