use super::{PersistError, LINK_CLASS, LINK_NONE, LINK_STRUCT, MAGIC, MAX_DEPTH, MAX_STRING_LEN, VERSION};
use crate::ids::{ClassId, ElementId, StructId};
use crate::models::{Dialect, LineKind};
use crate::parsers::CodeBase;
use crate::symbols::{
    Class, Function, Location, Members, Struct, SymbolSet, SymbolTable, TypeRef, VarSet, Variable,
};
use crate::text::TextLine;
use crate::tree::CodeTree;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

/// Reads a snapshot back into a tree and symbol table.
///
/// This is the first load phase: every `Location` comes back unbound and
/// must be re-bound against the rebuilt tree afterwards.
pub struct SnapshotReader<R: Read> {
    input: R,
}

impl<R: Read> SnapshotReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    pub fn read_code_base(&mut self) -> Result<CodeBase, PersistError> {
        let mut magic = [0u8; 4];
        self.input.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(PersistError::BadMagic);
        }
        let version = self.input.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }
        let dialect = if self.flag()? {
            Dialect::Structured
        } else {
            Dialect::Flat
        };
        let block_count = self.count("block")?;

        let mut tree = CodeTree::new();
        let root = tree.root();
        if self.kind()? != LineKind::CodeBase || self.flag()? {
            return Err(corrupt("snapshot does not start with a code base section"));
        }
        self.string()?;
        self.section_body(&mut tree, root, 0)?;

        let symbols = self.symbols()?;
        Ok(CodeBase {
            tree,
            symbols,
            dialect,
            block_count,
            diagnostics: Vec::new(),
        })
    }

    fn int(&mut self) -> Result<i32, PersistError> {
        Ok(self.input.read_i32::<LittleEndian>()?)
    }

    fn count(&mut self, what: &str) -> Result<usize, PersistError> {
        let value = self.int()?;
        usize::try_from(value).map_err(|_| corrupt(format!("negative {} count {}", what, value)))
    }

    fn flag(&mut self) -> Result<bool, PersistError> {
        match self.input.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(corrupt(format!("bad flag byte {}", other))),
        }
    }

    fn string(&mut self) -> Result<String, PersistError> {
        let len = self.count("string")?;
        if len > MAX_STRING_LEN {
            return Err(corrupt(format!("string of {} bytes", len)));
        }
        let mut buf = vec![0u8; len];
        self.input.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| corrupt(e.to_string()))
    }

    fn kind(&mut self) -> Result<LineKind, PersistError> {
        let code = self.int()?;
        LineKind::from_code(code).ok_or_else(|| corrupt(format!("unknown element kind {}", code)))
    }

    fn location(&mut self) -> Result<Option<Location>, PersistError> {
        let offset = self.int()?;
        match offset {
            -1 => Ok(None),
            o if o >= 0 => Ok(Some(Location::unbound(o as usize))),
            o => Err(corrupt(format!("bad offset {}", o))),
        }
    }

    fn element(
        &mut self,
        tree: &mut CodeTree,
        parent: ElementId,
        depth: usize,
    ) -> Result<(), PersistError> {
        if depth > MAX_DEPTH {
            return Err(corrupt("sections nested too deeply"));
        }
        let kind = self.kind()?;
        if kind == LineKind::CodeBase {
            return Err(corrupt("nested code base section"));
        }
        let is_leaf = self.flag()?;
        let text = self.string()?;
        if is_leaf {
            tree.push_leaf(parent, kind, text)
                .ok_or_else(|| corrupt("leaf under a non-section"))?;
            return Ok(());
        }
        let id = tree
            .push_section_raw(parent, kind, TextLine::from(text), false)
            .ok_or_else(|| corrupt("section under a non-section"))?;
        self.section_body(tree, id, depth + 1)
    }

    fn section_body(
        &mut self,
        tree: &mut CodeTree,
        id: ElementId,
        depth: usize,
    ) -> Result<(), PersistError> {
        let children = self.count("child")?;
        let folded = self.flag()?;
        tree.set_folded(id, folded);
        for _ in 0..children {
            self.element(tree, id, depth)?;
        }
        let link = self.symbol_link()?;
        tree.set_symbol_link(id, link);
        let vars = self.vars()?;
        if let Some(slot) = tree.vars_mut(id) {
            *slot = vars;
        }
        Ok(())
    }

    fn symbol_link(&mut self) -> Result<Option<TypeRef>, PersistError> {
        let kind = self.int()?;
        let index = self.int()?;
        match kind {
            LINK_NONE => Ok(None),
            LINK_STRUCT | LINK_CLASS if index >= 0 => {
                let index = index as usize;
                Ok(Some(if kind == LINK_STRUCT {
                    TypeRef::Struct(StructId::from_index(index))
                } else {
                    TypeRef::Class(ClassId::from_index(index))
                }))
            }
            _ => Err(corrupt(format!("bad symbol link ({}, {})", kind, index))),
        }
    }

    fn vars(&mut self) -> Result<VarSet, PersistError> {
        let count = self.count("variable")?;
        let mut vars = VarSet::new();
        for _ in 0..count {
            let name = self.string()?;
            let type_name = self.string()?;
            let mut var = Variable::new(name, type_name);
            var.location = self.location()?;
            vars.insert(var);
        }
        Ok(vars)
    }

    fn function(&mut self) -> Result<Function, PersistError> {
        let name = self.string()?;
        let return_type = self.string()?;
        let mut function = Function::new(name, return_type);
        let qualifier = self.string()?;
        if !qualifier.is_empty() {
            function.class_qualifier = Some(qualifier);
        }
        let params = self.count("parameter")?;
        for _ in 0..params {
            let type_name = self.string()?;
            let name = self.string()?;
            function.params.push(Variable::new(name, type_name));
        }
        function.location = self.location()?;
        Ok(function)
    }

    fn functions(&mut self) -> Result<SymbolSet<Function>, PersistError> {
        let count = self.count("function")?;
        let mut functions = SymbolSet::new();
        for _ in 0..count {
            functions.insert(self.function()?);
        }
        Ok(functions)
    }

    fn optional_function(&mut self) -> Result<Option<Function>, PersistError> {
        if self.flag()? {
            Ok(Some(self.function()?))
        } else {
            Ok(None)
        }
    }

    fn members(&mut self) -> Result<Members, PersistError> {
        let variables = self.vars()?;
        let functions = self.functions()?;
        Ok(Members {
            functions,
            variables,
        })
    }

    fn symbols(&mut self) -> Result<SymbolTable, PersistError> {
        let mut symbols = SymbolTable::new();

        for _ in 0..self.count("struct")? {
            let mut record = Struct::new(self.string()?);
            record.location = self.location()?;
            record.members = self.members()?;
            symbols.add_struct(record);
        }

        for _ in 0..self.count("class")? {
            let mut class = Class::new(self.string()?);
            class.location = self.location()?;
            class.members = self.members()?;
            class.constructor = self.optional_function()?;
            class.destructor = self.optional_function()?;
            symbols.add_class(class);
        }

        symbols.functions = self.functions()?;
        symbols.globals = self.vars()?;
        Ok(symbols)
    }
}

fn corrupt(message: impl Into<String>) -> PersistError {
    PersistError::Corrupt(message.into())
}
