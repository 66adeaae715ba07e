mod braces;
mod codebase;
mod cpp;

pub use braces::{
    brace_delta, continues_block, find_arm_end, find_end_brace, find_open_brace, ArmEnd,
};
pub use codebase::CodeBase;
pub use cpp::CppParser;

use crate::config::{ConfigError, ParseConfig};
use crate::models::FileKind;
use crate::text::TextPage;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to initialize parser: {0}")]
    InitError(#[from] regex::Error),
    #[error("Invalid parse configuration: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Failed to read source: {0}")]
    IoError(#[from] std::io::Error),
}

/// A recoverable problem met while parsing. Parsing always continues.
///
/// Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParseDiagnostic {
    /// A section's realized length differs from the lines it was built from
    LengthMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },
    UnmatchedBrace { line: usize },
    MissingCommentEnd { line: usize },
    MissingEndif { line: usize },
    /// Preamble found but the block count is wrong; parsed flat instead
    BlockCount { expected: usize, found: usize },
    /// Input exceeded `max_lines`
    Truncated { kept: usize, dropped: usize },
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDiagnostic::LengthMismatch {
                line,
                expected,
                actual,
            } => write!(
                f,
                "line {}: section spans {} lines but holds {}",
                line, expected, actual
            ),
            ParseDiagnostic::UnmatchedBrace { line } => {
                write!(f, "line {}: no matching closing brace", line)
            }
            ParseDiagnostic::MissingCommentEnd { line } => {
                write!(f, "line {}: comment is never closed", line)
            }
            ParseDiagnostic::MissingEndif { line } => {
                write!(f, "line {}: conditional has no #endif", line)
            }
            ParseDiagnostic::BlockCount { expected, found } => write!(
                f,
                "expected {} blocks, found {}; parsed as a flat file",
                expected, found
            ),
            ParseDiagnostic::Truncated { kept, dropped } => {
                write!(f, "kept the first {} lines, dropped {}", kept, dropped)
            }
        }
    }
}

/// Trait for file parsers producing a code tree and its symbols
pub trait CodeParser: Send + Sync {
    /// Parse a loaded page. Never fails; problems become diagnostics.
    fn parse(&self, page: &TextPage) -> CodeBase;

    /// File kinds this parser handles
    fn file_kinds(&self) -> &'static [FileKind];
}

/// Create a parser for the given file kind
pub fn create_parser(
    kind: FileKind,
    config: &ParseConfig,
) -> Result<Box<dyn CodeParser>, ParserError> {
    match kind {
        FileKind::Source | FileKind::Header => Ok(Box::new(CppParser::new(config.clone())?)),
    }
}
