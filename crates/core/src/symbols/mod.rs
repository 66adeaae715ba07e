//! Symbol model: structs, classes, functions and variables found by the parser,
//! each tied to the tree element that declares it.

mod extract;
mod model;

pub use extract::{
    base_type_name, extract_param, extract_params, extract_var, DeclForm, Declaration, ParamList,
    BUILTIN_TYPES, QUALIFIERS,
};
pub use model::{
    Class, Function, Location, Members, Named, Struct, SymbolSet, SymbolTable, TypeRef, VarSet,
    Variable,
};
