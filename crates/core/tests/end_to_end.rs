use foldnav_core::{
    persist, resolve, CppParser, Dialect, LineKind, NavError, ParseConfig, ParseDiagnostic,
    Session,
};
use tempfile::TempDir;

const WIDGET: &str = "\
/*@
 Widget module
*/
//@block types
class Widget {
public:
  Widget();
  int size();
  int width;
};
//@block impl
//@sub ctor
Widget::Widget() {
  width = 0;
}
//@sub methods
int Widget::size() {
  return width;
}
//@block main
int main() {
  Widget *w = new Widget();
  return w->size();
}
//@block a
//@block b
//@block c
";

fn parser() -> CppParser {
    CppParser::new(ParseConfig::default()).unwrap()
}

fn column_of(line: &str, needle: &str) -> usize {
    line.find(needle).unwrap()
}

#[test]
fn test_dialect_file_structure() {
    let code = parser().parse_source(WIDGET);
    assert_eq!(code.dialect(), Dialect::Structured);
    assert_eq!(code.block_count(), 6);
    assert!(code.diagnostics().is_empty(), "{:?}", code.diagnostics());

    let tree = code.tree();
    let top = tree.children(tree.root());
    assert_eq!(top.len(), 7);
    assert_eq!(tree.kind(top[0]), Some(LineKind::Preamble));
    assert_eq!(tree.length(tree.root()), 27);
    assert!(tree.check_lengths().is_ok());

    // the block holding sub-blocks stays open, everything else starts folded
    let visible = tree.visible_lines();
    assert_eq!(visible.len(), 9);
    assert_eq!(visible[0], "/*@ {...}");
    assert_eq!(visible[1], "//@block types {...}");
    assert_eq!(visible[2], "//@block impl");
    assert_eq!(visible[3], "//@sub ctor {...}");
    assert_eq!(visible[5], "//@block main {...}");
}

#[test]
fn test_wrong_block_count_is_flat() {
    let five = WIDGET.replace("//@block c\n", "");
    let code = parser().parse_source(&five);
    assert_eq!(code.dialect(), Dialect::Flat);
    assert!(code
        .diagnostics()
        .contains(&ParseDiagnostic::BlockCount { expected: 6, found: 5 }));
    // still navigable
    assert!(code.symbols().classes.get("Widget").is_some());
}

#[test]
fn test_addressing_and_fold_invariants() {
    let mut code = parser().parse_source(WIDGET);
    let total = code.line_count();

    let sections: Vec<_> = code
        .tree()
        .ids()
        .filter(|&id| !code.tree().is_leaf(id))
        .collect();
    for &id in &sections {
        code.tree_mut().collapse(id);
        assert!(code.tree().check_lengths().is_ok());
        assert_eq!(code.line_count(), total);
    }
    let folded_source = code.tree().source_lines();

    code.tree_mut().expand_all();
    assert_eq!(code.tree().source_lines(), folded_source);
    assert_eq!(code.tree().visible_lines().len(), total);

    let tree = code.tree();
    for leaf in tree.leaves(tree.root()) {
        let offset = tree.file_offset(leaf);
        let landing = tree.get_element_at(offset, 0).unwrap();
        assert_eq!(landing.element, leaf);
        assert_eq!(landing.delta, 0);
    }

    let end = tree.get_element_at(0, 1000).unwrap();
    assert!(end.clamped);
    assert_eq!(end.delta, total as isize - 1);
}

#[test]
fn test_collapse_expand_asymmetry() {
    let mut code = parser().parse_source(WIDGET);
    let leaf = code.tree().leaf_at(22).unwrap();
    code.tree_mut().reveal(leaf);
    assert!(code.tree().is_unit(leaf));

    // folding the function also folds its block, which has no sub-blocks
    code.tree_mut().collapse(leaf);
    assert!(code
        .tree()
        .visible_lines()
        .contains(&"//@block main {...}".to_string()));

    // expanding the function reopens the block as well
    let function = code.tree().parent(leaf).unwrap();
    code.tree_mut().expand(function);
    let visible = code.tree().visible_lines();
    assert!(visible.contains(&"int main() {".to_string()));
    assert!(visible.contains(&"  return w->size();".to_string()));
}

#[test]
fn test_resolve_goto_and_back() {
    let code = parser().parse_source(WIDGET);

    let call = "  return w->size();";
    let leaf = code.tree().leaf_at(22).unwrap();
    let found = resolve(&code, leaf, column_of(call, "size")).unwrap();
    assert_eq!(found.file_offset, 16);
    let found = resolve(&code, leaf, column_of(call, "w->")).unwrap();
    assert_eq!(found.file_offset, 21);

    let ctor_line = "  Widget *w = new Widget();";
    let leaf = code.tree().leaf_at(21).unwrap();
    let found = resolve(&code, leaf, column_of(ctor_line, "Widget()")).unwrap();
    assert_eq!(found.file_offset, 12);

    let mut session = Session::new(code);
    session.set_cursor(22, column_of(call, "size"));
    assert_eq!(session.goto_definition(), Ok(16));
    let visible = session.visible_lines();
    assert!(visible.contains(&"int Widget::size() {".to_string()));
    assert!(visible.contains(&"  return width;".to_string()));

    assert_eq!(session.back(), Ok(22));
    assert!(session
        .visible_lines()
        .contains(&"  return w->size();".to_string()));
    assert_eq!(session.back(), Err(NavError::EmptyTrail));
}

#[test]
fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("widget.fnav");

    let code = parser().parse_source(WIDGET);
    persist::save(&code, &path).unwrap();
    let loaded = persist::load(&path).unwrap();

    assert_eq!(loaded.dialect(), Dialect::Structured);
    assert_eq!(loaded.block_count(), 6);
    assert_eq!(loaded.tree().visible_lines(), code.tree().visible_lines());
    assert_eq!(loaded.symbols().entries(), code.symbols().entries());

    let mut session = Session::new(loaded);
    assert_eq!(session.goto_symbol("Widget::size"), Ok(16));
    assert_eq!(session.goto_symbol("main"), Ok(20));
    assert_eq!(session.back(), Ok(16));
}
