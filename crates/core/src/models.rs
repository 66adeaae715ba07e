use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Classification of one code element (a single line or a multi-line section)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Unrecognized source line
    Code,
    /// Single `//` or one-line `/* */` comment
    Comment,
    Blank,
    Include,
    /// `#define`, one line or a continued section
    Define,
    /// Forward declaration or prototype
    FwdDecl,
    VarDecl,
    Enum,
    /// Run of `//` lines or a multi-line `/* */` comment
    CommentBlock,
    LocalScope1,
    LocalScope2,
    LocalScope3,
    LocalScope4,
    /// `typedef struct|union` or `struct Name {` body
    TypedefStruct,
    Class,
    FunctionDef,
    ClassMethodDef,
    SubBlock,
    Block,
    Preamble,
    /// Root of a parsed file
    CodeBase,
    /// One arm of `#if ... #else ... #endif`
    Conditional,
    /// `wxBEGIN... wxEND...` macro table
    ToolkitMacroBlock,
    /// Any other preprocessor line (`#pragma`, `#undef`, ...)
    Directive,
    /// `public:` / `protected:` / `private:`
    AccessSpecifier,
}

impl LineKind {
    pub const ALL: [LineKind; 25] = [
        LineKind::Code,
        LineKind::Comment,
        LineKind::Blank,
        LineKind::Include,
        LineKind::Define,
        LineKind::FwdDecl,
        LineKind::VarDecl,
        LineKind::Enum,
        LineKind::CommentBlock,
        LineKind::LocalScope1,
        LineKind::LocalScope2,
        LineKind::LocalScope3,
        LineKind::LocalScope4,
        LineKind::TypedefStruct,
        LineKind::Class,
        LineKind::FunctionDef,
        LineKind::ClassMethodDef,
        LineKind::SubBlock,
        LineKind::Block,
        LineKind::Preamble,
        LineKind::CodeBase,
        LineKind::Conditional,
        LineKind::ToolkitMacroBlock,
        LineKind::Directive,
        LineKind::AccessSpecifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Code => "code",
            LineKind::Comment => "comment",
            LineKind::Blank => "blank",
            LineKind::Include => "include",
            LineKind::Define => "define",
            LineKind::FwdDecl => "fwd_decl",
            LineKind::VarDecl => "var_decl",
            LineKind::Enum => "enum",
            LineKind::CommentBlock => "comment_block",
            LineKind::LocalScope1 => "local1",
            LineKind::LocalScope2 => "local2",
            LineKind::LocalScope3 => "local3",
            LineKind::LocalScope4 => "local4",
            LineKind::TypedefStruct => "struct",
            LineKind::Class => "class",
            LineKind::FunctionDef => "function",
            LineKind::ClassMethodDef => "method",
            LineKind::SubBlock => "sub_block",
            LineKind::Block => "block",
            LineKind::Preamble => "preamble",
            LineKind::CodeBase => "codebase",
            LineKind::Conditional => "conditional",
            LineKind::ToolkitMacroBlock => "macro_block",
            LineKind::Directive => "directive",
            LineKind::AccessSpecifier => "access",
        }
    }

    /// Stable numeric tag used by the snapshot format
    pub fn code(&self) -> i32 {
        LineKind::ALL
            .iter()
            .position(|k| k == self)
            .map(|p| p as i32)
            .unwrap_or(0)
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| LineKind::ALL.get(idx).copied())
    }

    /// Local scope section kind for a nesting depth (1-based, capped at 4)
    pub fn local_scope(depth: usize) -> Self {
        match depth {
            0 | 1 => LineKind::LocalScope1,
            2 => LineKind::LocalScope2,
            3 => LineKind::LocalScope3,
            _ => LineKind::LocalScope4,
        }
    }

    pub fn is_local_scope(&self) -> bool {
        matches!(
            self,
            LineKind::LocalScope1
                | LineKind::LocalScope2
                | LineKind::LocalScope3
                | LineKind::LocalScope4
        )
    }

    pub fn is_function(&self) -> bool {
        matches!(self, LineKind::FunctionDef | LineKind::ClassMethodDef)
    }

    /// Sections that bound fold propagation
    pub fn is_structural(&self) -> bool {
        matches!(self, LineKind::Block | LineKind::SubBlock | LineKind::CodeBase)
    }
}

/// Kind of header/source file picked up by the directory scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Source,
    Header,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "c" | "cc" | "cpp" | "cxx" => Some(FileKind::Source),
            "h" | "hh" | "hpp" | "hxx" => Some(FileKind::Header),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Source => "source",
            FileKind::Header => "header",
        }
    }
}

/// Whether a file was recognized as a block-structured dialect file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Preamble followed by the configured number of blocks
    Structured,
    /// Anything else, scanned as one global scope
    #[default]
    Flat,
}

/// Kind of a symbol listed in an outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Struct,
    Class,
    Function,
    Method,
    Constructor,
    Destructor,
    Field,
    Global,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Struct => "struct",
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Destructor => "destructor",
            SymbolKind::Field => "field",
            SymbolKind::Global => "global",
        }
    }
}

/// One symbol in a file outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub kind: SymbolKind,
    pub name: String,
    /// Owning struct/class for members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Declared type (return type for functions)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    /// Declaration line (1-indexed); absent for forward-declared symbols
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// A parsed file reduced to its outline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutline {
    /// Relative path from scan root
    pub path: PathBuf,
    pub absolute_path: PathBuf,
    pub kind: FileKind,
    pub dialect: Dialect,
    /// Number of blocks found (0 for flat files)
    pub block_count: usize,
    pub line_count: usize,
    pub symbols: Vec<SymbolEntry>,
    /// Parse diagnostics, rendered as text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    /// Whether the file could be read and parsed
    pub parsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics about an outline scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutlineStats {
    pub total_files: usize,
    pub source_files: usize,
    pub header_files: usize,
    pub dialect_files: usize,
    pub total_lines: usize,
    pub total_symbols: usize,
    pub structs: usize,
    pub classes: usize,
    pub functions: usize,
    pub methods: usize,
    pub diagnostics: usize,
}

impl OutlineStats {
    pub fn add_file(&mut self, file: &FileOutline) {
        self.total_files += 1;
        match file.kind {
            FileKind::Source => self.source_files += 1,
            FileKind::Header => self.header_files += 1,
        }
        if file.dialect == Dialect::Structured {
            self.dialect_files += 1;
        }
        self.total_lines += file.line_count;
        self.diagnostics += file.diagnostics.len();
        for symbol in &file.symbols {
            self.total_symbols += 1;
            match symbol.kind {
                SymbolKind::Struct => self.structs += 1,
                SymbolKind::Class => self.classes += 1,
                SymbolKind::Function => self.functions += 1,
                SymbolKind::Method | SymbolKind::Constructor | SymbolKind::Destructor => {
                    self.methods += 1
                }
                SymbolKind::Field | SymbolKind::Global => {}
            }
        }
    }
}

/// Scan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_duration_ms: u64,
    pub files_per_second: f64,
    pub timestamp: String,
    pub tool_version: String,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            scan_duration_ms: 0,
            files_per_second: 0.0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Aggregated outline scan results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineMap {
    /// Project root path
    pub root: PathBuf,
    pub files: Vec<FileOutline>,
    pub stats: OutlineStats,
    pub metadata: ScanMetadata,
}

/// Rendered view of a single file
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
    /// Addressable units shown
    pub visible_lines: usize,
    pub lines_hidden: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_kind_codes_round_trip() {
        for kind in LineKind::ALL {
            assert_eq!(LineKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(LineKind::from_code(-1), None);
        assert_eq!(LineKind::from_code(999), None);
    }

    #[test]
    fn test_local_scope_depth_caps_at_four() {
        assert_eq!(LineKind::local_scope(1), LineKind::LocalScope1);
        assert_eq!(LineKind::local_scope(4), LineKind::LocalScope4);
        assert_eq!(LineKind::local_scope(9), LineKind::LocalScope4);
    }

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_extension("CPP"), Some(FileKind::Source));
        assert_eq!(FileKind::from_extension("hpp"), Some(FileKind::Header));
        assert_eq!(FileKind::from_extension("py"), None);
    }

    #[test]
    fn test_stats_add_file() {
        let file = FileOutline {
            path: PathBuf::from("a.cpp"),
            absolute_path: PathBuf::from("/x/a.cpp"),
            kind: FileKind::Source,
            dialect: Dialect::Structured,
            block_count: 6,
            line_count: 10,
            symbols: vec![SymbolEntry {
                kind: SymbolKind::Class,
                name: "Foo".to_string(),
                owner: None,
                type_name: String::new(),
                line: Some(3),
            }],
            diagnostics: vec![],
            parsed: true,
            error: None,
        };
        let mut stats = OutlineStats::default();
        stats.add_file(&file);
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.dialect_files, 1);
        assert_eq!(stats.classes, 1);
        assert_eq!(stats.total_lines, 10);
    }
}
