//! Declaration recognition for single source lines.
//!
//! [`extract_var`] decides whether a line starts with a declaration
//! (`type name...`) and splits it into type, name, optional `Owner::`
//! qualifier and the delimiter that followed the name. The caller decides
//! what the delimiter means: `(` opens a parameter list, `;`/`,`/`=` end a
//! variable.

use super::model::{starts_with_word, SymbolTable, Variable};
use crate::ids::ClassId;
use crate::text::TextLine;

/// Leading keywords folded into the type, at most two per declaration
pub const QUALIFIERS: [&str; 4] = ["static", "const", "virtual", "explicit"];

/// Built-in type keywords, two-word forms first
pub const BUILTIN_TYPES: [&str; 8] = [
    "unsigned int",
    "unsigned char",
    "void",
    "bool",
    "int",
    "char",
    "float",
    "double",
];

const TOOLKIT_PREFIX: &str = "wx";
const POINTER_MARKERS: [&str; 3] = ["**", "*", "&"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclForm {
    Plain,
    /// `type (*name)(...)`
    FunctionPointer,
    Constructor(ClassId),
    Destructor(ClassId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub type_name: String,
    pub name: String,
    pub class_qualifier: Option<String>,
    /// Delimiter that closed the name; `None` at end of line
    pub separator: Option<char>,
    pub form: DeclForm,
}

impl Declaration {
    /// Name followed by a parameter list
    pub fn is_function(&self) -> bool {
        match self.form {
            DeclForm::Constructor(_) | DeclForm::Destructor(_) => true,
            DeclForm::FunctionPointer => false,
            DeclForm::Plain => self.separator == Some('('),
        }
    }

    /// Name followed by something that can only end a variable declaration
    pub fn is_variable(&self) -> bool {
        match self.form {
            DeclForm::FunctionPointer => true,
            DeclForm::Plain => matches!(self.separator, Some(';' | ',' | '=' | '[')),
            _ => false,
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.type_name.trim_end().ends_with('*')
    }

    /// Type name without qualifiers or pointer/reference markers
    pub fn base_type(&self) -> &str {
        base_type_name(&self.type_name)
    }

    /// Name of the class or struct this declaration belongs to, if qualified
    pub fn owner(&self) -> Option<&str> {
        self.class_qualifier.as_deref()
    }
}

/// Strip qualifier keywords and `*`/`&` markers from a declared type.
pub fn base_type_name(type_name: &str) -> &str {
    let mut rest = type_name.trim();
    loop {
        let before = rest;
        for q in QUALIFIERS {
            if starts_with_word(rest, q) {
                rest = rest[q.len()..].trim_start();
            }
        }
        if rest == before {
            break;
        }
    }
    rest.trim_end_matches(|c: char| c == '*' || c == '&' || c == ' ')
}

fn is_identifier(word: &str) -> bool {
    let body = word.strip_prefix('~').unwrap_or(word);
    let mut chars = body.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Declaration,
    /// Names may be omitted: `void f(int, char *)`
    Parameter,
}

/// Recognize a declaration at the start of `line`.
///
/// On success the declaration is consumed from `line`, leaving whatever
/// followed the name (parameter list, initializer, ...). On failure `line` is
/// left unchanged.
pub fn extract_var(line: &mut TextLine, symbols: &SymbolTable) -> Option<Declaration> {
    extract_with_mode(line, symbols, Mode::Declaration)
}

/// Like [`extract_var`], but accepts unnamed parameters.
pub fn extract_param(line: &mut TextLine, symbols: &SymbolTable) -> Option<Declaration> {
    extract_with_mode(line, symbols, Mode::Parameter)
}

fn extract_with_mode(line: &mut TextLine, symbols: &SymbolTable, mode: Mode) -> Option<Declaration> {
    let original = line.clone();
    let found = extract_inner(line, symbols, mode);
    if found.is_none() {
        *line = original;
    }
    found
}

fn extract_inner(line: &mut TextLine, symbols: &SymbolTable, mode: Mode) -> Option<Declaration> {
    line.trim();
    let mut type_name = String::new();

    for _ in 0..2 {
        let Some(q) = QUALIFIERS.iter().find(|q| starts_with_word(line.as_str(), q)) else {
            break;
        };
        line.strip_prefix(q);
        line.trim_start();
        type_name.push_str(q);
        type_name.push(' ');
    }

    if let Some(keyword) = BUILTIN_TYPES
        .iter()
        .find(|kw| starts_with_word(line.as_str(), kw))
    {
        line.strip_prefix(keyword);
        type_name.push_str(keyword);
        scan_pointer_marker(line, &mut type_name);
        return parse_name(line, type_name, DeclForm::Plain, mode);
    }

    if line.starts_with(TOOLKIT_PREFIX) {
        let mut probe = line.clone();
        let word = probe.extract_word();
        if word.delimiters.starts_with(' ') {
            let base = word.word.trim_end_matches(['*', '&']);
            if is_identifier(base) {
                type_name.push_str(base);
                let fused = &word.word[base.len()..];
                if fused.is_empty() {
                    probe.insert(" ", 0);
                    scan_pointer_marker(&mut probe, &mut type_name);
                } else {
                    type_name.push_str(fused);
                }
                *line = probe;
                return parse_name(line, type_name, DeclForm::Plain, mode);
            }
        }
    }

    if let Some((_, found)) = symbols.structs.longest_prefix_of(line.as_str()) {
        let name = found.name.clone();
        line.strip_prefix(&name);
        type_name.push_str(&name);
        scan_pointer_marker(line, &mut type_name);
        return parse_name(line, type_name, DeclForm::Plain, mode);
    }

    if let Some((idx, found)) = symbols.classes.longest_prefix_of(line.as_str()) {
        let id = ClassId::from_index(idx);
        let name = found.name.clone();
        let rest = &line.as_str()[name.len()..];
        let ctor = format!("::{}(", name);
        let dtor = format!("::~{}(", name);

        if rest.starts_with('(') {
            line.strip_prefix(&name);
            line.strip_prefix("(");
            type_name.push_str(&name);
            return Some(special_member(type_name, name, None, DeclForm::Constructor(id)));
        }
        if rest.starts_with(&ctor) {
            line.cut_range(0, name.len() + ctor.len())?;
            type_name.push_str(&name);
            return Some(special_member(
                type_name,
                name.clone(),
                Some(name),
                DeclForm::Constructor(id),
            ));
        }
        if rest.starts_with(&dtor) {
            line.cut_range(0, name.len() + dtor.len())?;
            return Some(special_member(
                type_name,
                format!("~{}", name),
                Some(name),
                DeclForm::Destructor(id),
            ));
        }

        line.strip_prefix(&name);
        type_name.push_str(&name);
        scan_pointer_marker(line, &mut type_name);
        return parse_name(line, type_name, DeclForm::Plain, mode);
    }

    if line.starts_with("~") {
        for (idx, class) in symbols.classes.iter().enumerate() {
            let dtor = format!("~{}(", class.name);
            if line.starts_with(&dtor) {
                let name = format!("~{}", class.name);
                line.cut_range(0, dtor.len())?;
                return Some(special_member(
                    type_name,
                    name,
                    None,
                    DeclForm::Destructor(ClassId::from_index(idx)),
                ));
            }
        }
    }

    None
}

fn special_member(
    type_name: String,
    name: String,
    class_qualifier: Option<String>,
    form: DeclForm,
) -> Declaration {
    Declaration {
        type_name: type_name.trim().to_string(),
        name,
        class_qualifier,
        separator: Some('('),
        form,
    }
}

/// Fold a trailing `*`, `**` or `&` (fused or after one space) into the type.
fn scan_pointer_marker(line: &mut TextLine, type_name: &mut String) {
    let text = line.as_str();
    let spaced = text.starts_with(' ') || text.starts_with('\t');
    let body = text.trim_start_matches([' ', '\t']);
    let skipped = text.len() - body.len();

    for marker in POINTER_MARKERS {
        if body.starts_with(marker) {
            if spaced {
                type_name.push(' ');
            }
            type_name.push_str(marker);
            line.cut_range(0, skipped + marker.len());
            return;
        }
    }
}

fn parse_name(
    line: &mut TextLine,
    type_name: String,
    form: DeclForm,
    mode: Mode,
) -> Option<Declaration> {
    line.trim_start();

    if line.strip_prefix("(*") {
        let close = line.find(")")?;
        let name = line.cut_range(0, close)?.trim().to_string();
        line.delete_char(0);
        line.trim_start();
        if !is_identifier(&name) {
            return None;
        }
        return Some(Declaration {
            type_name: type_name.trim().to_string(),
            name,
            class_qualifier: None,
            separator: line.as_str().chars().next(),
            form: DeclForm::FunctionPointer,
        });
    }

    let word = line.extract_word();
    let mut separator = word.closing();
    let mut name = word.word;

    // initializers and array bounds fused to the name: `x=3;`, `buf[16];`
    if let Some(idx) = name.find(['=', '[']) {
        let tail = name.split_off(idx);
        separator = tail.chars().next();
        let mut moved = tail[1..].to_string();
        moved.push_str(&word.delimiters);
        line.insert(&moved, 0);
    }

    if separator == Some(' ') {
        separator = match line.as_str().chars().next() {
            Some(c @ ('=' | '[' | '{' | ':')) => Some(c),
            Some(_) => Some(' '),
            None => None,
        };
    }

    if name.is_empty() {
        return match (mode, separator) {
            (Mode::Parameter, Some(',' | ')')) => Some(Declaration {
                type_name: type_name.trim().to_string(),
                name,
                class_qualifier: None,
                separator,
                form,
            }),
            _ => None,
        };
    }

    let (class_qualifier, name) = match name.rsplit_once("::") {
        Some((owner, member)) if is_identifier(owner) => {
            (Some(owner.to_string()), member.to_string())
        }
        Some(_) => return None,
        None => (None, name),
    };

    if !is_identifier(&name) {
        return None;
    }

    Some(Declaration {
        type_name: type_name.trim().to_string(),
        name,
        class_qualifier,
        separator,
        form,
    })
}

/// Outcome of scanning one line of a parameter list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamList {
    /// The closing `)` was consumed
    Closed,
    /// The line ended inside the list
    Open,
}

/// Consume parameters from `line` into `params` until the list closes or the
/// line runs out.
pub fn extract_params(
    line: &mut TextLine,
    symbols: &SymbolTable,
    params: &mut Vec<Variable>,
) -> ParamList {
    loop {
        line.trim_start();
        if line.is_empty() {
            return ParamList::Open;
        }
        if line.strip_prefix(")") {
            return ParamList::Closed;
        }
        if line.strip_prefix("void)") {
            return ParamList::Closed;
        }
        if line.strip_prefix(",") {
            continue;
        }

        match extract_param(line, symbols) {
            Some(decl) => {
                params.push(Variable::new(decl.name, decl.type_name));
                match decl.separator {
                    Some(')') => return ParamList::Closed,
                    Some(',') => continue,
                    None => return ParamList::Open,
                    // default value or anything else: skip to the next parameter
                    Some(_) => {
                        if let Some(end) = skip_param(line) {
                            return end;
                        }
                    }
                }
            }
            None => {
                if let Some(end) = skip_param(line) {
                    return end;
                }
            }
        }
    }
}

/// Drop text up to the next top-level `,` or `)`.
fn skip_param(line: &mut TextLine) -> Option<ParamList> {
    let mut depth = 0usize;
    let mut cut = None;
    for (idx, ch) in line.as_str().char_indices() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            ')' => {
                cut = Some((idx, ParamList::Closed));
                break;
            }
            ',' if depth == 0 => {
                cut = Some((idx, ParamList::Open));
                break;
            }
            _ => {}
        }
    }

    match cut {
        Some((idx, ParamList::Closed)) => {
            line.cut_range(0, idx + 1);
            Some(ParamList::Closed)
        }
        Some((idx, ParamList::Open)) => {
            line.cut_range(0, idx + 1);
            None
        }
        None => {
            line.clear();
            Some(ParamList::Open)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{Class, Struct};

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.add_class(Class::new("Foo"));
        table.add_class(Class::new("MyClass"));
        table.add_struct(Struct::new("Point"));
        table
    }

    fn extract(text: &str, symbols: &SymbolTable) -> Option<(Declaration, String)> {
        let mut line = TextLine::new(text);
        extract_var(&mut line, symbols).map(|d| (d, line.to_string()))
    }

    #[test]
    fn test_plain_int() {
        let (decl, rest) = extract("int x;", &table()).unwrap();
        assert_eq!(decl.type_name, "int");
        assert_eq!(decl.name, "x");
        assert!(!decl.is_pointer());
        assert!(decl.is_variable());
        assert_eq!(rest, "");
    }

    #[test]
    fn test_class_pointer() {
        let (decl, _) = extract("MyClass *p;", &table()).unwrap();
        assert_eq!(decl.type_name, "MyClass *");
        assert_eq!(decl.name, "p");
        assert!(decl.is_pointer());
        assert_eq!(decl.base_type(), "MyClass");
    }

    #[test]
    fn test_fused_pointer_and_reference() {
        let (decl, _) = extract("char** argv;", &table()).unwrap();
        assert_eq!(decl.type_name, "char**");
        let (decl, _) = extract("const Point &pt,", &table()).unwrap();
        assert_eq!(decl.type_name, "const Point &");
        assert_eq!(decl.separator, Some(','));
    }

    #[test]
    fn test_qualified_constructor() {
        let symbols = table();
        let (decl, rest) = extract("Foo::Foo(int a) {", &symbols).unwrap();
        assert!(matches!(decl.form, DeclForm::Constructor(_)));
        assert_eq!(decl.name, "Foo");
        assert_eq!(decl.owner(), Some("Foo"));
        assert!(decl.is_function());
        assert_eq!(rest, "int a) {");
    }

    #[test]
    fn test_inline_constructor() {
        let (decl, _) = extract("Foo(int a);", &table()).unwrap();
        assert!(matches!(decl.form, DeclForm::Constructor(_)));
        assert_eq!(decl.owner(), None);
    }

    #[test]
    fn test_destructors() {
        let symbols = table();
        let (decl, _) = extract("~Foo() {", &symbols).unwrap();
        assert!(matches!(decl.form, DeclForm::Destructor(_)));
        assert_eq!(decl.name, "~Foo");

        let (decl, _) = extract("Foo::~Foo() {", &symbols).unwrap();
        assert!(matches!(decl.form, DeclForm::Destructor(_)));
        assert_eq!(decl.owner(), Some("Foo"));

        let (decl, _) = extract("virtual ~Foo();", &symbols).unwrap();
        assert!(matches!(decl.form, DeclForm::Destructor(_)));
    }

    #[test]
    fn test_qualified_method() {
        let (decl, rest) = extract("void Foo::bar(int n) const {", &table()).unwrap();
        assert_eq!(decl.type_name, "void");
        assert_eq!(decl.name, "bar");
        assert_eq!(decl.owner(), Some("Foo"));
        assert!(decl.is_function());
        assert_eq!(rest, "int n) const {");
    }

    #[test]
    fn test_qualifiers_and_unsigned() {
        let (decl, _) = extract("static const unsigned int limit = 4;", &table()).unwrap();
        assert_eq!(decl.type_name, "static const unsigned int");
        assert_eq!(decl.name, "limit");
        assert_eq!(decl.separator, Some('='));
    }

    #[test]
    fn test_toolkit_types() {
        let symbols = table();
        let (decl, _) = extract("wxString* label;", &symbols).unwrap();
        assert_eq!(decl.type_name, "wxString*");
        assert_eq!(decl.name, "label");

        let (decl, _) = extract("wxFrame *frame;", &symbols).unwrap();
        assert_eq!(decl.type_name, "wxFrame *");

        assert!(extract("wxLogMessage(\"x\");", &symbols).is_none());
    }

    #[test]
    fn test_function_pointer() {
        let (decl, _) = extract("void (*callback)(int);", &table()).unwrap();
        assert_eq!(decl.form, DeclForm::FunctionPointer);
        assert_eq!(decl.name, "callback");
        assert!(decl.is_variable());
    }

    #[test]
    fn test_array_and_initializer_suffixes() {
        let (decl, _) = extract("char buf[16];", &table()).unwrap();
        assert_eq!(decl.name, "buf");
        assert_eq!(decl.separator, Some('['));
        let (decl, _) = extract("int n=3;", &table()).unwrap();
        assert_eq!(decl.name, "n");
        assert_eq!(decl.separator, Some('='));
    }

    #[test]
    fn test_not_a_declaration_leaves_line_intact() {
        let symbols = table();
        let mut line = TextLine::new("x = compute(3);");
        assert!(extract_var(&mut line, &symbols).is_none());
        assert_eq!(line.as_str(), "x = compute(3);");
        assert!(extract("Unknown thing;", &symbols).is_none());
        assert!(extract("Foo.bar = 3;", &symbols).is_none());
        assert!(extract("integer = 2;", &symbols).is_none());
    }

    #[test]
    fn test_params_across_lines() {
        let symbols = table();
        let mut params = Vec::new();
        let mut first = TextLine::new("int a,");
        assert_eq!(extract_params(&mut first, &symbols, &mut params), ParamList::Open);
        let mut second = TextLine::new("Foo *f, char) {");
        assert_eq!(extract_params(&mut second, &symbols, &mut params), ParamList::Closed);
        assert_eq!(second.as_str(), "{");
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "f", ""]);
        assert_eq!(params[1].type_name, "Foo *");
    }

    #[test]
    fn test_params_skip_defaults_and_unknown_types() {
        let symbols = table();
        let mut params = Vec::new();
        let mut line = TextLine::new("int a = f(1, 2), Bar b, bool on)");
        assert_eq!(extract_params(&mut line, &symbols, &mut params), ParamList::Closed);
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "on"]);
    }

    #[test]
    fn test_void_params() {
        let mut params = Vec::new();
        let mut line = TextLine::new("void) {");
        assert_eq!(extract_params(&mut line, &table(), &mut params), ParamList::Closed);
        assert!(params.is_empty());
    }
}
