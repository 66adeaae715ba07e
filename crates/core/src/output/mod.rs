mod json;
mod yaml;

pub use json::{to_json, to_json_compact};
pub use yaml::to_yaml;

use crate::models::{Dialect, FileOutline, OutlineMap, SymbolEntry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Summary,
    Ansi,
}

/// Format an OutlineMap according to the specified format
pub fn format_output(map: &OutlineMap, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(map),
        OutputFormat::Yaml => to_yaml(map),
        OutputFormat::Summary => Ok(format_summary(map)),
        OutputFormat::Ansi => Ok(format_summary_ansi(map)),
    }
}

/// Format the outline of a single file
pub fn format_file(file: &FileOutline, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(file),
        OutputFormat::Yaml => to_yaml(file),
        OutputFormat::Summary | OutputFormat::Ansi => Ok(format_file_summary(file)),
    }
}

fn symbol_line(symbol: &SymbolEntry) -> String {
    let line = symbol
        .line
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".to_string());
    let name = match &symbol.owner {
        Some(owner) => format!("{}::{}", owner, symbol.name),
        None => symbol.name.clone(),
    };
    if symbol.type_name.is_empty() {
        format!("{:>6}  {:<12} {}", line, symbol.kind.as_str(), name)
    } else {
        format!(
            "{:>6}  {:<12} {} : {}",
            line,
            symbol.kind.as_str(),
            name,
            symbol.type_name
        )
    }
}

/// Symbols of one file, one per line, with diagnostics at the end
pub fn format_file_summary(file: &FileOutline) -> String {
    let mut output = String::new();
    let dialect = match file.dialect {
        Dialect::Structured => format!("structured, {} blocks", file.block_count),
        Dialect::Flat => "flat".to_string(),
    };
    output.push_str(&format!(
        "{} ({} lines, {})\n",
        file.path.display(),
        file.line_count,
        dialect
    ));
    for symbol in &file.symbols {
        output.push_str(&symbol_line(symbol));
        output.push('\n');
    }
    if let Some(error) = &file.error {
        output.push_str(&format!("error: {}\n", error));
    }
    for diagnostic in &file.diagnostics {
        output.push_str(&format!("warning: {}\n", diagnostic));
    }
    output
}

/// Generate a human-readable summary
pub fn format_summary(map: &OutlineMap) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Outline Summary\n\
         ===============\n\
         Root: {}\n\n",
        map.root.display()
    ));

    output.push_str(&format!(
        "Files Scanned: {}\n\
         - Sources: {}\n\
         - Headers: {}\n\
         - Block-structured: {}\n\n",
        map.stats.total_files,
        map.stats.source_files,
        map.stats.header_files,
        map.stats.dialect_files
    ));

    output.push_str(&format!(
        "Total Lines: {}\n\n\
         Total Symbols: {}\n\
         - Structs: {}\n\
         - Classes: {}\n\
         - Functions: {}\n\
         - Methods: {}\n\n",
        map.stats.total_lines,
        map.stats.total_symbols,
        map.stats.structs,
        map.stats.classes,
        map.stats.functions,
        map.stats.methods
    ));

    let mut noisy: Vec<_> = map
        .files
        .iter()
        .filter(|f| !f.diagnostics.is_empty() || f.error.is_some())
        .collect();
    if !noisy.is_empty() {
        noisy.sort_by(|a, b| b.diagnostics.len().cmp(&a.diagnostics.len()));
        output.push_str(&format!("Diagnostics: {}\n", map.stats.diagnostics));
        for file in noisy.iter().take(5) {
            match &file.error {
                Some(error) => {
                    output.push_str(&format!("  {} (error: {})\n", file.path.display(), error))
                }
                None => output.push_str(&format!(
                    "  {} ({} warnings)\n",
                    file.path.display(),
                    file.diagnostics.len()
                )),
            }
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Scan Duration: {}ms ({:.2} files/sec)\n\
         Timestamp: {}\n\
         Tool Version: {}\n",
        map.metadata.scan_duration_ms,
        map.metadata.files_per_second,
        map.metadata.timestamp,
        map.metadata.tool_version
    ));

    output
}

fn format_summary_ansi(map: &OutlineMap) -> String {
    let mut output = String::new();

    let bold = "\x1b[1m";
    let reset = "\x1b[0m";
    let cyan = "\x1b[36m";
    let yellow = "\x1b[33m";
    let dim = "\x1b[2m";

    output.push_str(&format!(
        "{}{}Outline Summary{}\n\
         {}==============={}\n\
         {}Root:{} {}\n\n",
        bold, cyan, reset, cyan, reset, dim, reset,
        map.root.display()
    ));

    output.push_str(&format!(
        "{}Files Scanned:{} {} (sources: {}, headers: {}, block-structured: {})\n",
        dim, reset,
        map.stats.total_files,
        map.stats.source_files,
        map.stats.header_files,
        map.stats.dialect_files
    ));

    output.push_str(&format!(
        "{}Total Lines:{} {} | {}Symbols:{} {}\n\
         {}  Structs:{} {} | {}Classes:{} {} | {}Functions:{} {} | {}Methods:{} {}\n",
        dim, reset, map.stats.total_lines,
        dim, reset, map.stats.total_symbols,
        dim, reset, map.stats.structs,
        dim, reset, map.stats.classes,
        dim, reset, map.stats.functions,
        dim, reset, map.stats.methods
    ));

    if map.stats.diagnostics > 0 {
        output.push_str(&format!(
            "{}Diagnostics:{} {}{}{}\n",
            dim, reset, yellow, map.stats.diagnostics, reset
        ));
    }

    output.push_str(&format!(
        "\n{}Scan:{} {}ms ({:.2} files/sec)\n",
        dim, reset,
        map.metadata.scan_duration_ms,
        map.metadata.files_per_second,
    ));

    output
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileKind, OutlineStats, ScanMetadata, SymbolKind};
    use std::path::PathBuf;

    fn outline() -> FileOutline {
        FileOutline {
            path: PathBuf::from("src/foo.cpp"),
            absolute_path: PathBuf::from("/p/src/foo.cpp"),
            kind: FileKind::Source,
            dialect: Dialect::Structured,
            block_count: 6,
            line_count: 40,
            symbols: vec![
                SymbolEntry {
                    kind: SymbolKind::Class,
                    name: "Foo".into(),
                    owner: None,
                    type_name: String::new(),
                    line: Some(12),
                },
                SymbolEntry {
                    kind: SymbolKind::Method,
                    name: "bar".into(),
                    owner: Some("Foo".into()),
                    type_name: "int".into(),
                    line: None,
                },
            ],
            diagnostics: vec!["line 30: no matching closing brace".into()],
            parsed: true,
            error: None,
        }
    }

    #[test]
    fn test_file_summary() {
        let text = format_file_summary(&outline());
        assert!(text.starts_with("src/foo.cpp (40 lines, structured, 6 blocks)\n"));
        assert!(text.contains("    12  class        Foo\n"));
        assert!(text.contains("     -  method       Foo::bar : int\n"));
        assert!(text.ends_with("warning: line 30: no matching closing brace\n"));
    }

    #[test]
    fn test_summary_lists_noisy_files() {
        let file = outline();
        let mut stats = OutlineStats::default();
        stats.add_file(&file);
        let map = OutlineMap {
            root: PathBuf::from("/p"),
            files: vec![file],
            stats,
            metadata: ScanMetadata::default(),
        };
        let text = format_output(&map, OutputFormat::Summary).unwrap();
        assert!(text.contains("Block-structured: 1"));
        assert!(text.contains("src/foo.cpp (1 warnings)"));

        let ansi = format_output(&map, OutputFormat::Ansi).unwrap();
        assert!(ansi.contains("\x1b[1m"));
        let json = format_file(&map.files[0], OutputFormat::Json).unwrap();
        assert!(json.contains("\"dialect\": \"structured\""));
    }
}
