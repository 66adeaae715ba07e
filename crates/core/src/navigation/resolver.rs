use crate::ids::ElementId;
use crate::parsers::CodeBase;
use crate::symbols::{base_type_name, Location, Members, SymbolTable, TypeRef, Variable};
use crate::text::{split_first_deref, WORD_DELIMITERS};
use tracing::trace;

/// Deepest member chain followed before giving up
pub const MAX_CHAIN_DEPTH: usize = 16;

/// The identifier (or member chain) under the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretWord {
    /// Chain text up to and including the segment holding the caret
    pub word: String,
    /// The word directly follows the `new` keyword
    pub after_new: bool,
}

/// Extract the word under `column` (a character index) of `line`.
pub fn word_under_caret(line: &str, column: usize) -> Option<CaretWord> {
    let chars: Vec<char> = line.chars().collect();
    let is_delim = |c: char| WORD_DELIMITERS.contains(&c) || c == '\t';
    if column >= chars.len() || is_delim(chars[column]) {
        return None;
    }

    let mut start = column;
    while start > 0 && !is_delim(chars[start - 1]) {
        start -= 1;
    }
    let mut end = column;
    while end < chars.len() && !is_delim(chars[end]) {
        end += 1;
    }

    // cut after the chain segment holding the caret
    let mut cut = end;
    let mut idx = column;
    while idx < end {
        match chars[idx] {
            '.' | '[' => {
                cut = idx;
                break;
            }
            '-' if chars.get(idx + 1) == Some(&'>') => {
                cut = idx;
                break;
            }
            _ => idx += 1,
        }
    }

    let word: String = chars[start..cut].iter().collect();
    let word = word.trim_start_matches(['*', '&', '!']).to_string();
    if word.is_empty() {
        return None;
    }

    let before: String = chars[..start].iter().collect();
    let before = before.trim_end();
    let after_new = before
        .strip_suffix("new")
        .is_some_and(|rest| rest.chars().last().map_or(true, |c| !(c.is_alphanumeric() || c == '_')));

    Some(CaretWord { word, after_new })
}

/// Resolve the identifier under (`caret`, `column`) to its declaration.
pub fn resolve(code: &CodeBase, caret: ElementId, column: usize) -> Option<Location> {
    let line = code.tree().text(caret)?;
    let word = word_under_caret(line.as_str(), column)?;
    resolve_word(code, caret, &word)
}

/// Resolve an already extracted caret word as seen from element `caret`.
pub fn resolve_word(code: &CodeBase, caret: ElementId, caret_word: &CaretWord) -> Option<Location> {
    let symbols = code.symbols();
    let word = caret_word.word.as_str();
    trace!(word, "resolve");

    if let Some(found) = symbols.structs.get(word) {
        return found.location;
    }
    if let Some(class) = symbols.classes.get(word) {
        if caret_word.after_new {
            if let Some(ctor) = class.constructor.as_ref().and_then(|c| c.location) {
                return Some(ctor);
            }
        }
        return class.location;
    }

    if let Some((type_name, member)) = word.split_once("::") {
        let ty = symbols.lookup_type(type_name)?;
        return member_location(symbols, ty, member);
    }

    let scope = LocalScope::new(code, caret);
    let unqualified = word.strip_prefix("this->").unwrap_or(word);
    if split_first_deref(unqualified).is_none() {
        if let Some(found) = scope
            .owner
            .and_then(|ty| symbols.members(ty))
            .and_then(|m| m.functions.get(unqualified))
        {
            return found.location;
        }
    }

    let chained = if word.starts_with("this->") {
        scope
            .owner
            .and_then(|ty| resolve_chain(symbols, Scope::Members(ty), unqualified, 0))
    } else {
        resolve_chain(symbols, Scope::Local(&scope), word, 0)
    };
    if chained.is_some() {
        return chained;
    }

    symbols.functions.get(word).and_then(|f| f.location)
}

fn member_location(symbols: &SymbolTable, ty: TypeRef, member: &str) -> Option<Location> {
    if let TypeRef::Class(id) = ty {
        let class = symbols.class_by_id(id)?;
        for special in [&class.constructor, &class.destructor].into_iter().flatten() {
            if special.name == member {
                return special.location;
            }
        }
    }
    let members = symbols.members(ty)?;
    members
        .variables
        .get(member)
        .and_then(|v| v.location)
        .or_else(|| members.functions.get(member).and_then(|f| f.location))
}

/// Variables visible from the caret, innermost first.
struct LocalScope<'a> {
    code: &'a CodeBase,
    /// Sections from the caret's own up to the enclosing function
    sections: Vec<ElementId>,
    /// Struct or class owning the enclosing method or body
    owner: Option<TypeRef>,
}

impl<'a> LocalScope<'a> {
    fn new(code: &'a CodeBase, caret: ElementId) -> Self {
        let tree = code.tree();
        let first = tree.section_of(caret);
        let mut sections = Vec::new();
        let mut owner = None;
        let mut in_function = true;

        for section in std::iter::once(first).chain(tree.ancestors(first)) {
            if owner.is_none() {
                owner = tree.symbol_link(section);
            }
            if in_function {
                sections.push(section);
                if tree.kind(section).is_some_and(|k| k.is_function()) {
                    in_function = false;
                }
            }
        }
        Self {
            code,
            sections,
            owner,
        }
    }

    fn variable(&self, name: &str) -> Option<&'a Variable> {
        let tree = self.code.tree();
        let symbols = self.code.symbols();
        self.sections
            .iter()
            .find_map(|&s| tree.vars(s).and_then(|vars| vars.get(name)))
            .or_else(|| {
                self.owner
                    .and_then(|ty| symbols.members(ty))
                    .and_then(|m| m.variables.get(name))
            })
            .or_else(|| symbols.globals.get(name))
    }
}

#[derive(Clone, Copy)]
enum Scope<'s, 'a> {
    Local(&'s LocalScope<'a>),
    Members(TypeRef),
}

/// Identifier at the front of a chain segment: `items` in `items[i]`, `get` in `get()`.
fn segment_name(segment: &str) -> &str {
    let segment = segment.trim();
    let end = segment
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(segment.len());
    &segment[..end]
}

/// Resolve `a->b.c` left to right, typing each step through the symbol table.
fn resolve_chain(
    symbols: &SymbolTable,
    scope: Scope<'_, '_>,
    chain: &str,
    depth: usize,
) -> Option<Location> {
    if depth > MAX_CHAIN_DEPTH {
        trace!(chain, "chain too deep");
        return None;
    }
    let (head, rest) = match split_first_deref(chain) {
        Some((head, rest)) => (segment_name(head), Some(rest)),
        None => (segment_name(chain), None),
    };
    if head.is_empty() {
        return None;
    }

    let members: Option<&Members> = match scope {
        Scope::Members(ty) => symbols.members(ty),
        Scope::Local(_) => None,
    };
    let variable = match scope {
        Scope::Local(local) => local.variable(head),
        Scope::Members(_) => members.and_then(|m| m.variables.get(head)),
    };

    let Some(rest) = rest else {
        if let Some(var) = variable {
            return var.location;
        }
        return members
            .and_then(|m| m.functions.get(head))
            .and_then(|f| f.location);
    };

    let type_name = match variable {
        Some(var) => var.type_name.as_str(),
        // a call in the middle of a chain types through its return value
        None => members
            .and_then(|m| m.functions.get(head))
            .map(|f| f.return_type.as_str())?,
    };
    let ty = symbols.lookup_type(base_type_name(type_name))?;
    resolve_chain(symbols, Scope::Members(ty), rest, depth + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseConfig;
    use crate::parsers::CppParser;

    const SOURCE: &str = "\
struct Node {
  Node *next;
  int value;
};
class Foo {
public:
  Foo();
  int bar();
  Node *head;
  int count;
  void touch() {
    bar();
    this->count = 1;
  }
};
Foo::Foo() {
}
int Foo::bar() {
  return count;
}
int tally;
int compute(int n) {
  Foo f;
  Foo *p = new Foo();
  f.bar();
  p->bar();
  p->head->next->value = n;
  tally = Foo::bar;
  return compute(n);
}
";

    fn code() -> CodeBase {
        CppParser::new(ParseConfig::default())
            .unwrap()
            .parse_source(SOURCE)
    }

    /// Resolve the first occurrence of `needle` on `line` (0-based), with the
    /// caret `offset` characters into it.
    fn resolve_on(code: &CodeBase, line: usize, needle: &str, offset: usize) -> Option<usize> {
        let leaf = code.tree().leaf_at(line).unwrap();
        let column = code.tree().text(leaf).unwrap().find(needle).unwrap() + offset;
        resolve(code, leaf, column).map(|loc| loc.file_offset)
    }

    #[test]
    fn test_word_under_caret() {
        let word = word_under_caret("  p->head->next = 0;", 6).unwrap();
        assert_eq!(word.word, "p->head");
        let word = word_under_caret("  p->head->next = 0;", 2).unwrap();
        assert_eq!(word.word, "p");
        let word = word_under_caret("if (!*ptr)", 6).unwrap();
        assert_eq!(word.word, "ptr");
        let word = word_under_caret("x = new Foo();", 9).unwrap();
        assert!(word.after_new);
        assert_eq!(word.word, "Foo");
        assert!(word_under_caret("a, b", 1).is_none());
        assert!(word_under_caret("ab", 9).is_none());
    }

    #[test]
    fn test_member_call_through_variable() {
        let code = code();
        // f.bar() and p->bar() both land on Foo::bar's definition
        assert_eq!(resolve_on(&code, 24, "bar", 1), Some(17));
        assert_eq!(resolve_on(&code, 25, "bar", 0), Some(17));
        // the caret on the object resolves the object
        assert_eq!(resolve_on(&code, 24, "f.", 0), Some(22));
    }

    #[test]
    fn test_long_chain() {
        let code = code();
        assert_eq!(resolve_on(&code, 26, "value", 2), Some(2));
        assert_eq!(resolve_on(&code, 26, "head", 0), Some(8));
    }

    #[test]
    fn test_types_and_constructors() {
        let code = code();
        assert_eq!(resolve_on(&code, 23, "Foo(", 0), Some(15));
        assert_eq!(resolve_on(&code, 23, "Foo *", 0), Some(4));
        assert_eq!(resolve_on(&code, 1, "Node", 0), Some(0));
    }

    #[test]
    fn test_sibling_and_this() {
        let code = code();
        assert_eq!(resolve_on(&code, 11, "bar", 0), Some(17));
        assert_eq!(resolve_on(&code, 12, "count", 0), Some(9));
        assert_eq!(resolve_on(&code, 18, "count", 0), Some(9));
    }

    #[test]
    fn test_qualified_globals_and_free_functions() {
        let code = code();
        assert_eq!(resolve_on(&code, 27, "Foo::bar", 6), Some(17));
        assert_eq!(resolve_on(&code, 27, "tally", 0), Some(20));
        assert_eq!(resolve_on(&code, 28, "compute", 0), Some(21));
        assert_eq!(resolve_on(&code, 28, "n)", 0), Some(21));
        assert_eq!(resolve_on(&code, 28, "return", 0), None);
    }

    #[test]
    fn test_chain_depth_limit() {
        let code = code();
        let leaf = code.tree().leaf_at(26).unwrap();
        let short = CaretWord {
            word: "p->head->next->next->value".into(),
            after_new: false,
        };
        assert_eq!(resolve_word(&code, leaf, &short).map(|l| l.file_offset), Some(2));

        let mut long = String::from("p->head");
        for _ in 0..MAX_CHAIN_DEPTH {
            long.push_str("->next");
        }
        long.push_str("->value");
        let long = CaretWord {
            word: long,
            after_new: false,
        };
        assert_eq!(resolve_word(&code, leaf, &long), None);
    }
}
