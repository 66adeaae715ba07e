//! An editing session over one parsed file: the code base, its navigation
//! trail and a cursor, driven the way an editor view drives them.

use crate::config::ParseConfig;
use crate::ids::ElementId;
use crate::navigation::{
    resolve, resolve_word, word_under_caret, CaretWord, NavError, Navigator, TrailEntry,
};
use crate::parsers::{CodeBase, CppParser, ParserError};
use crate::symbols::Location;
use crate::tree::Landing;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Cursor position. `offset` is an absolute source line, `caret_line` the
/// row of that line among the visible units, `column` a character index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cursor {
    pub offset: usize,
    pub caret_line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct Session {
    code: CodeBase,
    navigator: Navigator,
    cursor: Cursor,
}

impl Session {
    pub fn new(code: CodeBase) -> Self {
        Self {
            code,
            navigator: Navigator::new(),
            cursor: Cursor::default(),
        }
    }

    pub fn from_source(source: &str, config: ParseConfig) -> Result<Self, ParserError> {
        let parser = CppParser::new(config)?;
        Ok(Self::new(parser.parse_source(source)))
    }

    pub fn open(path: &Path, config: ParseConfig) -> Result<Self, ParserError> {
        let parser = CppParser::new(config)?;
        Ok(Self::new(parser.parse_file(path)?))
    }

    pub fn code(&self) -> &CodeBase {
        &self.code
    }

    pub fn code_mut(&mut self) -> &mut CodeBase {
        &mut self.code
    }

    pub fn into_code(self) -> CodeBase {
        self.code
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Place the cursor on `offset` (clamped to the file) at `column`.
    pub fn set_cursor(&mut self, offset: usize, column: usize) {
        let last = self.code.line_count().saturating_sub(1);
        self.cursor.offset = offset.min(last);
        self.cursor.column = column;
        self.cursor.caret_line = self.visible_row(self.cursor.offset);
    }

    pub fn visible_lines(&self) -> Vec<String> {
        self.code.tree().visible_lines()
    }

    /// The visible unit under the cursor.
    pub fn current_unit(&self) -> Option<ElementId> {
        self.code.tree().unit_at(self.cursor.offset)
    }

    fn visible_row(&self, offset: usize) -> usize {
        let tree = self.code.tree();
        let Some(unit) = tree.unit_at(offset) else {
            return 0;
        };
        tree.visible_units()
            .iter()
            .position(|&id| id == unit)
            .unwrap_or(0)
    }

    /// Snap the cursor to the start of the unit now covering it.
    fn settle(&mut self) {
        if let Some(unit) = self.current_unit() {
            self.cursor.offset = self.code.tree().file_offset(unit);
        }
        self.cursor.caret_line = self.visible_row(self.cursor.offset);
    }

    /// Move `steps` visible units; negative moves up. The cursor lands on
    /// the first line of the unit reached.
    pub fn move_by(&mut self, steps: isize) -> Option<Landing> {
        let landing = self.code.tree().get_element_at(self.cursor.offset, steps)?;
        self.cursor.offset = self.code.tree().file_offset(landing.element);
        self.cursor.caret_line = self.visible_row(self.cursor.offset);
        Some(landing)
    }

    /// Fold the section under the cursor. Returns whether anything folded.
    pub fn collapse(&mut self) -> bool {
        let Some(unit) = self.current_unit() else {
            return false;
        };
        let changed = self.code.tree_mut().collapse(unit);
        self.settle();
        changed
    }

    pub fn expand(&mut self) {
        if let Some(unit) = self.current_unit() {
            self.code.tree_mut().expand(unit);
            self.settle();
        }
    }

    pub fn expand_all(&mut self) {
        self.code.tree_mut().expand_all();
        self.settle();
    }

    /// Declaration of the identifier under the cursor.
    pub fn resolve_at_cursor(&self) -> Option<Location> {
        let leaf = self.code.tree().leaf_at(self.cursor.offset)?;
        resolve(&self.code, leaf, self.cursor.column)
    }

    /// Where `name` is declared. Accepts `Type::member` as well as type,
    /// function and global names.
    pub fn symbol_location(&self, name: &str) -> Option<Location> {
        let word = CaretWord {
            word: name.to_string(),
            after_new: false,
        };
        resolve_word(&self.code, self.code.tree().root(), &word)
    }

    fn here(&self) -> TrailEntry {
        TrailEntry {
            location: self
                .code
                .locate(self.cursor.offset)
                .unwrap_or(Location::unbound(self.cursor.offset)),
            caret_line: self.cursor.caret_line,
        }
    }

    /// Jump to `target`, recording the current position on the trail.
    pub fn goto_location(&mut self, target: Location) -> Result<usize, NavError> {
        let here = self.here();
        let offset = self.navigator.goto(&mut self.code, here, target)?;
        self.cursor.offset = offset;
        self.cursor.column = 0;
        self.cursor.caret_line = self.visible_row(offset);
        Ok(offset)
    }

    pub fn goto_symbol(&mut self, name: &str) -> Result<usize, NavError> {
        let target = self
            .symbol_location(name)
            .ok_or_else(|| NavError::UnknownSymbol(name.to_string()))?;
        self.goto_location(target)
    }

    /// Jump to the declaration of the identifier under the cursor.
    pub fn goto_definition(&mut self) -> Result<usize, NavError> {
        match self.resolve_at_cursor() {
            Some(target) => self.goto_location(target),
            None => {
                let word = self
                    .code
                    .tree()
                    .leaf_at(self.cursor.offset)
                    .and_then(|leaf| self.code.element_line(leaf))
                    .and_then(|line| word_under_caret(line, self.cursor.column))
                    .map(|w| w.word)
                    .unwrap_or_default();
                debug!(word = %word, "nothing to go to");
                Err(NavError::UnknownSymbol(word))
            }
        }
    }

    /// Return to the previous trail entry, restoring its caret row.
    pub fn back(&mut self) -> Result<usize, NavError> {
        let here = self.here().location;
        let entry = self.navigator.back(&mut self.code, here)?;
        self.cursor.offset = entry.location.file_offset;
        self.cursor.caret_line = entry.caret_line;
        self.cursor.column = 0;
        Ok(entry.location.file_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
int helper(int v) {
  return v;
}
int main() {
  int r = helper(2);
  return r;
}
";

    fn session() -> Session {
        Session::from_source(SOURCE, ParseConfig::default()).unwrap()
    }

    #[test]
    fn test_functions_start_folded() {
        let s = session();
        assert_eq!(
            s.visible_lines(),
            vec!["int helper(int v) {...}", "int main() {...}"]
        );
    }

    #[test]
    fn test_move_by_clamps() {
        let mut s = session();
        let landing = s.move_by(1).unwrap();
        assert!(!landing.clamped);
        assert_eq!(s.cursor().offset, 3);
        assert_eq!(s.cursor().caret_line, 1);

        let landing = s.move_by(5).unwrap();
        assert!(landing.clamped);
        assert_eq!(s.cursor().offset, 3);

        s.move_by(-9);
        assert_eq!(s.cursor().offset, 0);
    }

    #[test]
    fn test_expand_then_collapse() {
        let mut s = session();
        s.set_cursor(3, 0);
        s.expand();
        assert_eq!(s.visible_lines().len(), 5);
        s.move_by(2);
        assert_eq!(s.cursor().offset, 5);

        assert!(s.collapse());
        assert_eq!(s.cursor().offset, 3);
        assert_eq!(s.visible_lines().len(), 2);
    }

    #[test]
    fn test_goto_definition_and_back() {
        let mut s = session();
        s.set_cursor(3, 0);
        s.expand();
        s.set_cursor(4, "  int r = ".len());
        assert_eq!(s.cursor().caret_line, 2);
        assert_eq!(s.resolve_at_cursor().map(|l| l.file_offset), Some(0));

        assert_eq!(s.goto_definition(), Ok(0));
        assert_eq!(s.cursor().offset, 0);
        assert_eq!(
            s.visible_lines(),
            vec!["int helper(int v) {", "  return v;", "}", "int main() {...}"]
        );

        assert_eq!(s.back(), Ok(4));
        assert_eq!(s.cursor().caret_line, 2);
        assert_eq!(s.visible_lines()[0], "int helper(int v) {...}");
        assert_eq!(s.back(), Err(NavError::EmptyTrail));
    }

    #[test]
    fn test_goto_symbol() {
        let mut s = session();
        assert_eq!(s.symbol_location("main").map(|l| l.file_offset), Some(3));
        assert_eq!(s.goto_symbol("main"), Ok(3));
        assert_eq!(
            s.goto_symbol("missing"),
            Err(NavError::UnknownSymbol("missing".into()))
        );
        assert_eq!(s.navigator().trail().len(), 1);
    }

    #[test]
    fn test_goto_definition_on_unknown_word() {
        let mut s = session();
        s.set_cursor(1, 2);
        assert_eq!(
            s.goto_definition(),
            Err(NavError::UnknownSymbol("return".into()))
        );
    }
}
