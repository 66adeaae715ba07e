use super::{PersistError, LINK_CLASS, LINK_NONE, LINK_STRUCT, MAGIC, VERSION};
use crate::ids::ElementId;
use crate::models::Dialect;
use crate::parsers::CodeBase;
use crate::symbols::{Function, Location, Members, SymbolSet, SymbolTable, TypeRef, VarSet};
use crate::tree::CodeTree;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// Writes a code base in snapshot field order.
pub struct SnapshotWriter<W: Write> {
    out: W,
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write_code_base(&mut self, code: &CodeBase) -> Result<(), PersistError> {
        self.out.write_all(MAGIC)?;
        self.out.write_u32::<LittleEndian>(VERSION)?;
        self.flag(code.dialect() == Dialect::Structured)?;
        self.count(code.block_count())?;

        let tree = code.tree();
        self.element(tree, tree.root())?;
        self.symbols(code.symbols())?;
        self.out.flush()?;
        Ok(())
    }

    fn int(&mut self, value: i32) -> Result<(), PersistError> {
        self.out.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    fn count(&mut self, value: usize) -> Result<(), PersistError> {
        let value = i32::try_from(value).map_err(|_| PersistError::Overflow(value))?;
        self.int(value)
    }

    fn flag(&mut self, value: bool) -> Result<(), PersistError> {
        self.out.write_u8(u8::from(value))?;
        Ok(())
    }

    fn string(&mut self, value: &str) -> Result<(), PersistError> {
        self.count(value.len())?;
        self.out.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Locations travel as bare offsets, -1 when unset.
    fn location(&mut self, location: Option<Location>) -> Result<(), PersistError> {
        match location {
            Some(location) => self.count(location.file_offset),
            None => self.int(-1),
        }
    }

    fn element(&mut self, tree: &CodeTree, id: ElementId) -> Result<(), PersistError> {
        let node = tree.get(id).ok_or(PersistError::DanglingElement(id.0))?;
        self.int(node.kind().code())?;
        self.flag(node.is_leaf())?;
        self.string(node.text().as_str())?;

        let Some(section) = node.section() else {
            return Ok(());
        };
        self.count(section.children().len())?;
        self.flag(section.is_folded())?;
        for &child in section.children() {
            self.element(tree, child)?;
        }
        match section.symbol_link() {
            None => {
                self.int(LINK_NONE)?;
                self.int(-1)?;
            }
            Some(TypeRef::Struct(id)) => {
                self.int(LINK_STRUCT)?;
                self.count(id.index())?;
            }
            Some(TypeRef::Class(id)) => {
                self.int(LINK_CLASS)?;
                self.count(id.index())?;
            }
        }
        self.vars(section.vars())
    }

    fn vars(&mut self, vars: &VarSet) -> Result<(), PersistError> {
        self.count(vars.len())?;
        for var in vars.iter() {
            self.string(&var.name)?;
            self.string(&var.type_name)?;
            self.location(var.location)?;
        }
        Ok(())
    }

    fn function(&mut self, function: &Function) -> Result<(), PersistError> {
        self.string(&function.name)?;
        self.string(&function.return_type)?;
        self.string(function.class_qualifier.as_deref().unwrap_or(""))?;
        self.count(function.params.len())?;
        for param in &function.params {
            self.string(&param.type_name)?;
            self.string(&param.name)?;
        }
        self.location(function.location)
    }

    fn functions(&mut self, functions: &SymbolSet<Function>) -> Result<(), PersistError> {
        self.count(functions.len())?;
        for function in functions.iter() {
            self.function(function)?;
        }
        Ok(())
    }

    fn optional_function(&mut self, function: Option<&Function>) -> Result<(), PersistError> {
        self.flag(function.is_some())?;
        match function {
            Some(function) => self.function(function),
            None => Ok(()),
        }
    }

    fn members(&mut self, members: &Members) -> Result<(), PersistError> {
        self.vars(&members.variables)?;
        self.functions(&members.functions)
    }

    fn symbols(&mut self, symbols: &SymbolTable) -> Result<(), PersistError> {
        self.count(symbols.structs.len())?;
        for record in symbols.structs.iter() {
            self.string(&record.name)?;
            self.location(record.location)?;
            self.members(&record.members)?;
        }

        self.count(symbols.classes.len())?;
        for class in symbols.classes.iter() {
            self.string(&class.name)?;
            self.location(class.location)?;
            self.members(&class.members)?;
            self.optional_function(class.constructor.as_ref())?;
            self.optional_function(class.destructor.as_ref())?;
        }

        self.functions(&symbols.functions)?;
        self.vars(&symbols.globals)
    }
}
