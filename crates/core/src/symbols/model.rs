use crate::ids::{ClassId, ElementId, StructId};
use crate::models::{SymbolEntry, SymbolKind};
use std::collections::HashMap;

/// Where a symbol is declared, or a point on the navigation trail.
///
/// `element` is a non-owning handle into the tree. It is `None` after a
/// snapshot load until the tree has been rebuilt and the offset re-bound.
/// Equality compares `file_offset` only.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub element: Option<ElementId>,
    /// Absolute source line (0-indexed) of the declaration
    pub file_offset: usize,
}

impl Location {
    pub fn new(element: ElementId, file_offset: usize) -> Self {
        Self {
            element: Some(element),
            file_offset,
        }
    }

    pub fn unbound(file_offset: usize) -> Self {
        Self {
            element: None,
            file_offset,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.element.is_some()
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.file_offset == other.file_offset
    }
}

impl Eq for Location {}

pub trait Named {
    fn name(&self) -> &str;
}

/// Name-keyed set that keeps source order.
///
/// Inserting a name that is already present replaces the old entry in place,
/// so indices handed out earlier stay valid.
#[derive(Debug, Clone)]
pub struct SymbolSet<T> {
    entries: Vec<T>,
    by_name: HashMap<String, usize>,
}

impl<T> Default for SymbolSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T: Named> SymbolSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the entry's index.
    pub fn insert(&mut self, item: T) -> usize {
        if let Some(&idx) = self.by_name.get(item.name()) {
            self.entries[idx] = item;
            return idx;
        }
        let idx = self.entries.len();
        self.by_name.insert(item.name().to_string(), idx);
        self.entries.push(item);
        idx
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        match self.by_name.get(name) {
            Some(&idx) => self.entries.get_mut(idx),
            None => None,
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn by_index(&self, idx: usize) -> Option<&T> {
        self.entries.get(idx)
    }

    pub fn by_index_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.entries.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The longest entry name that `text` starts with as a whole word.
    pub fn longest_prefix_of(&self, text: &str) -> Option<(usize, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, item)| starts_with_word(text, item.name()))
            .max_by_key(|(_, item)| item.name().len())
    }
}

/// `text` starts with `word` and the next character cannot continue an identifier.
pub(crate) fn starts_with_word(text: &str, word: &str) -> bool {
    !word.is_empty()
        && text.starts_with(word)
        && text[word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub type_name: String,
    pub location: Option<Location>,
}

impl Variable {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl Named for Variable {
    fn name(&self) -> &str {
        &self.name
    }
}

pub type VarSet = SymbolSet<Variable>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub return_type: String,
    /// `Owner` in `Owner::name`
    pub class_qualifier: Option<String>,
    pub params: Vec<Variable>,
    pub location: Option<Location>,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            class_qualifier: None,
            params: Vec::new(),
            location: None,
        }
    }
}

impl Named for Function {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Member functions and variables of a struct or class
#[derive(Debug, Clone, Default)]
pub struct Members {
    pub functions: SymbolSet<Function>,
    pub variables: VarSet,
}

#[derive(Debug, Clone)]
pub struct Struct {
    pub name: String,
    pub location: Option<Location>,
    pub members: Members,
}

impl Struct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            members: Members::default(),
        }
    }
}

impl Named for Struct {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub location: Option<Location>,
    pub members: Members,
    pub constructor: Option<Function>,
    pub destructor: Option<Function>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            members: Members::default(),
            constructor: None,
            destructor: None,
        }
    }
}

impl Named for Class {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A user-defined type: one of the structs or one of the classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Struct(StructId),
    Class(ClassId),
}

/// All symbols of one parsed file
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub structs: SymbolSet<Struct>,
    pub classes: SymbolSet<Class>,
    /// Free functions
    pub functions: SymbolSet<Function>,
    /// File-scope variables
    pub globals: VarSet,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_struct(&mut self, item: Struct) -> StructId {
        StructId::from_index(self.structs.insert(item))
    }

    pub fn add_class(&mut self, item: Class) -> ClassId {
        ClassId::from_index(self.classes.insert(item))
    }

    pub fn struct_by_id(&self, id: StructId) -> Option<&Struct> {
        self.structs.by_index(id.index())
    }

    pub fn class_by_id(&self, id: ClassId) -> Option<&Class> {
        self.classes.by_index(id.index())
    }

    pub fn class_by_id_mut(&mut self, id: ClassId) -> Option<&mut Class> {
        self.classes.by_index_mut(id.index())
    }

    /// Resolve a bare type name, structs first
    pub fn lookup_type(&self, name: &str) -> Option<TypeRef> {
        if let Some(idx) = self.structs.position(name) {
            return Some(TypeRef::Struct(StructId::from_index(idx)));
        }
        self.classes
            .position(name)
            .map(|idx| TypeRef::Class(ClassId::from_index(idx)))
    }

    pub fn type_name(&self, ty: TypeRef) -> Option<&str> {
        match ty {
            TypeRef::Struct(id) => self.struct_by_id(id).map(|s| s.name.as_str()),
            TypeRef::Class(id) => self.class_by_id(id).map(|c| c.name.as_str()),
        }
    }

    pub fn type_location(&self, ty: TypeRef) -> Option<Location> {
        match ty {
            TypeRef::Struct(id) => self.struct_by_id(id).and_then(|s| s.location),
            TypeRef::Class(id) => self.class_by_id(id).and_then(|c| c.location),
        }
    }

    pub fn members(&self, ty: TypeRef) -> Option<&Members> {
        match ty {
            TypeRef::Struct(id) => self.struct_by_id(id).map(|s| &s.members),
            TypeRef::Class(id) => self.class_by_id(id).map(|c| &c.members),
        }
    }

    pub fn members_mut(&mut self, ty: TypeRef) -> Option<&mut Members> {
        match ty {
            TypeRef::Struct(id) => self.structs.by_index_mut(id.index()).map(|s| &mut s.members),
            TypeRef::Class(id) => self.classes.by_index_mut(id.index()).map(|c| &mut c.members),
        }
    }

    /// Visit every stored location (types, members, functions, globals)
    pub fn for_each_location_mut(&mut self, mut visit: impl FnMut(&mut Location)) {
        for s in self.structs.iter_mut() {
            visit_location(&mut s.location, &mut visit);
            visit_members(&mut s.members, &mut visit);
        }
        for c in self.classes.iter_mut() {
            visit_location(&mut c.location, &mut visit);
            visit_members(&mut c.members, &mut visit);
            if let Some(ctor) = c.constructor.as_mut() {
                visit_location(&mut ctor.location, &mut visit);
            }
            if let Some(dtor) = c.destructor.as_mut() {
                visit_location(&mut dtor.location, &mut visit);
            }
        }
        for f in self.functions.iter_mut() {
            visit_location(&mut f.location, &mut visit);
        }
        for v in self.globals.iter_mut() {
            visit_location(&mut v.location, &mut visit);
        }
    }

    /// Flatten the table into outline entries in declaration order per set
    pub fn entries(&self) -> Vec<SymbolEntry> {
        let line_of = |loc: &Option<Location>| loc.map(|l| l.file_offset + 1);
        let mut entries = Vec::new();

        let push_members = |entries: &mut Vec<SymbolEntry>, owner: &str, members: &Members| {
            for v in members.variables.iter() {
                entries.push(SymbolEntry {
                    kind: SymbolKind::Field,
                    name: v.name.clone(),
                    owner: Some(owner.to_string()),
                    type_name: v.type_name.clone(),
                    line: line_of(&v.location),
                });
            }
            for f in members.functions.iter() {
                entries.push(SymbolEntry {
                    kind: SymbolKind::Method,
                    name: f.name.clone(),
                    owner: Some(owner.to_string()),
                    type_name: f.return_type.clone(),
                    line: line_of(&f.location),
                });
            }
        };

        for s in self.structs.iter() {
            entries.push(SymbolEntry {
                kind: SymbolKind::Struct,
                name: s.name.clone(),
                owner: None,
                type_name: String::new(),
                line: line_of(&s.location),
            });
            push_members(&mut entries, &s.name, &s.members);
        }
        for c in self.classes.iter() {
            entries.push(SymbolEntry {
                kind: SymbolKind::Class,
                name: c.name.clone(),
                owner: None,
                type_name: String::new(),
                line: line_of(&c.location),
            });
            for (kind, special) in [
                (SymbolKind::Constructor, &c.constructor),
                (SymbolKind::Destructor, &c.destructor),
            ] {
                if let Some(f) = special {
                    entries.push(SymbolEntry {
                        kind,
                        name: f.name.clone(),
                        owner: Some(c.name.clone()),
                        type_name: String::new(),
                        line: line_of(&f.location),
                    });
                }
            }
            push_members(&mut entries, &c.name, &c.members);
        }
        for f in self.functions.iter() {
            entries.push(SymbolEntry {
                kind: SymbolKind::Function,
                name: f.name.clone(),
                owner: None,
                type_name: f.return_type.clone(),
                line: line_of(&f.location),
            });
        }
        for v in self.globals.iter() {
            entries.push(SymbolEntry {
                kind: SymbolKind::Global,
                name: v.name.clone(),
                owner: None,
                type_name: v.type_name.clone(),
                line: line_of(&v.location),
            });
        }
        entries
    }
}

fn visit_location(location: &mut Option<Location>, visit: &mut impl FnMut(&mut Location)) {
    if let Some(loc) = location.as_mut() {
        visit(loc);
    }
}

fn visit_members(members: &mut Members, visit: &mut impl FnMut(&mut Location)) {
    for f in members.functions.iter_mut() {
        visit_location(&mut f.location, visit);
    }
    for v in members.variables.iter_mut() {
        visit_location(&mut v.location, visit);
    }
}
