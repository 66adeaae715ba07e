//! Foldnav Core Library
//!
//! A fold-aware outline parser and symbol navigator for block-structured
//! C++ sources.
//!
//! # Features
//!
//! - Parse a file into a tree of single lines and foldable sections, filling
//!   a symbol table (structs, classes, functions, variables) in the same pass
//! - Recognize files laid out as a preamble plus a fixed number of marked
//!   blocks and sub-blocks, and fall back to a flat view for anything else
//! - Address lines by visible steps whatever the fold state
//! - Resolve the identifier under a caret, following `a->b.c` chains
//! - Goto/back navigation over a trail of visited locations
//! - Binary snapshots with two-phase reload
//! - Directory outline scans in JSON, YAML, or ANSI-colored summary form
//!
//! # Example
//!
//! ```no_run
//! use foldnav_core::{ParseConfig, Session};
//!
//! let source = std::fs::read_to_string("widget.cpp").unwrap();
//! let mut session = Session::from_source(&source, ParseConfig::default()).unwrap();
//! session.goto_symbol("main").unwrap();
//! for line in session.visible_lines() {
//!     println!("{}", line);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod ids;
pub mod models;
pub mod navigation;
pub mod output;
pub mod parsers;
pub mod persist;
pub mod session;
pub mod symbols;
pub mod text;
pub mod tree;

// Re-exports for convenience
pub use config::{ConfigError, ParseConfig, ScanConfig};
pub use engine::{render_code, render_file, render_file_ansi, OutlineScanner, Renderer, ScanError};
pub use ids::{ClassId, ElementId, StructId};
pub use models::*;
pub use navigation::{resolve, NavError, NavigationTrail, Navigator, TrailEntry};
pub use output::{format_file, format_output, format_summary, FormatError, OutputFormat};
pub use parsers::{create_parser, CodeBase, CodeParser, CppParser, ParseDiagnostic, ParserError};
pub use persist::PersistError;
pub use session::{Cursor, Session};
pub use symbols::{extract_var, Location, SymbolTable, TypeRef};
pub use text::{TextLine, TextPage};
pub use tree::{CodeTree, Direction, Landing};
