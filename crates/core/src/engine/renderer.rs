use super::ScanError;
use crate::config::ParseConfig;
use crate::ids::ElementId;
use crate::models::{LineKind, RenderedFile};
use crate::parsers::{CodeBase, CppParser};
use crate::tree::CodeTree;
use std::io;
use std::path::Path;
use termcolor::{Ansi, Color, ColorSpec, NoColor, WriteColor};

/// Renders the visible units of a tree, one per line
#[derive(Debug, Clone)]
pub struct Renderer {
    line_numbers: bool,
    fold_markers: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            line_numbers: true,
            fold_markers: true,
        }
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    pub fn with_fold_markers(mut self, enabled: bool) -> Self {
        self.fold_markers = enabled;
        self
    }

    /// Render as plain text
    pub fn render(&self, tree: &CodeTree) -> io::Result<String> {
        let mut out = NoColor::new(Vec::new());
        self.write_to(tree, &mut out)?;
        Ok(String::from_utf8_lossy(&out.into_inner()).into_owned())
    }

    /// Render with ANSI colors by element kind
    pub fn render_ansi(&self, tree: &CodeTree) -> io::Result<String> {
        let mut out = Ansi::new(Vec::new());
        self.write_to(tree, &mut out)?;
        Ok(String::from_utf8_lossy(&out.into_inner()).into_owned())
    }

    pub fn write_to<W: WriteColor>(&self, tree: &CodeTree, out: &mut W) -> io::Result<()> {
        let width = tree.length(tree.root()).max(1).to_string().len();
        for id in tree.visible_units() {
            self.write_unit(tree, id, width, out)?;
        }
        Ok(())
    }

    fn write_unit<W: WriteColor>(
        &self,
        tree: &CodeTree,
        id: ElementId,
        width: usize,
        out: &mut W,
    ) -> io::Result<()> {
        if self.line_numbers {
            out.set_color(ColorSpec::new().set_dimmed(true))?;
            write!(out, "{:>width$}", tree.file_offset(id) + 1, width = width)?;
            out.reset()?;
        }
        if self.fold_markers {
            let marker = if tree.is_folded(id) { '+' } else { ' ' };
            write!(out, "{}", marker)?;
        }
        if self.line_numbers || self.fold_markers {
            write!(out, " ")?;
        }

        let text = tree.text(id).map(|t| t.as_str()).unwrap_or("");
        match tree.kind(id).and_then(kind_color) {
            Some(spec) => {
                out.set_color(&spec)?;
                write!(out, "{}", text)?;
                out.reset()?;
            }
            None => write!(out, "{}", text)?,
        }
        writeln!(out)
    }
}

fn kind_color(kind: LineKind) -> Option<ColorSpec> {
    let mut spec = ColorSpec::new();
    match kind {
        LineKind::Comment | LineKind::CommentBlock => spec.set_fg(Some(Color::Green)),
        LineKind::Include | LineKind::Define | LineKind::Directive | LineKind::Conditional => {
            spec.set_fg(Some(Color::Magenta))
        }
        LineKind::Class | LineKind::TypedefStruct | LineKind::Enum => {
            spec.set_fg(Some(Color::Cyan)).set_bold(true)
        }
        LineKind::FunctionDef | LineKind::ClassMethodDef => spec.set_fg(Some(Color::Yellow)),
        LineKind::Block | LineKind::SubBlock | LineKind::Preamble => {
            spec.set_fg(Some(Color::Blue)).set_bold(true)
        }
        LineKind::FwdDecl | LineKind::VarDecl => spec.set_fg(Some(Color::White)),
        LineKind::ToolkitMacroBlock => spec.set_fg(Some(Color::Red)),
        _ => return None,
    };
    Some(spec)
}

/// Render a parsed code base under its current fold state
pub fn render_code(code: &CodeBase, path: &Path, ansi: bool) -> io::Result<RenderedFile> {
    let renderer = Renderer::new();
    let content = if ansi {
        renderer.render_ansi(code.tree())?
    } else {
        renderer.render(code.tree())?
    };
    let visible_lines = code.tree().visible_units().len();
    Ok(RenderedFile {
        path: path.to_path_buf(),
        content,
        visible_lines,
        lines_hidden: code.line_count().saturating_sub(visible_lines),
    })
}

fn parse_for_render(
    path: &Path,
    config: &ParseConfig,
    expand_all: bool,
) -> Result<CodeBase, ScanError> {
    let mut code = CppParser::new(config.clone())?.parse_file(path)?;
    if expand_all {
        code.tree_mut().expand_all();
    }
    Ok(code)
}

/// Parse and render a file (convenience function)
pub fn render_file(
    path: &Path,
    config: &ParseConfig,
    expand_all: bool,
) -> Result<RenderedFile, ScanError> {
    let code = parse_for_render(path, config, expand_all)?;
    Ok(render_code(&code, path, false)?)
}

/// Parse and render a file with ANSI colors (convenience function)
pub fn render_file_ansi(
    path: &Path,
    config: &ParseConfig,
    expand_all: bool,
) -> Result<RenderedFile, ScanError> {
    let code = parse_for_render(path, config, expand_all)?;
    Ok(render_code(&code, path, true)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SOURCE: &str = "\
// helpers
int helper(int v) {
  return v;
}
int main() {
  return helper(1);
}
";

    fn code() -> CodeBase {
        CppParser::new(ParseConfig::default())
            .unwrap()
            .parse_source(SOURCE)
    }

    #[test]
    fn test_render_folded() {
        let out = Renderer::new().render(code().tree()).unwrap();
        assert_eq!(
            out,
            "1  // helpers\n2+ int helper(int v) {...}\n5+ int main() {...}\n"
        );
    }

    #[test]
    fn test_render_without_decoration() {
        let mut code = code();
        code.tree_mut().expand_all();
        let out = Renderer::new()
            .with_line_numbers(false)
            .with_fold_markers(false)
            .render(code.tree())
            .unwrap();
        assert_eq!(out, SOURCE);
    }

    #[test]
    fn test_render_ansi_colors_kinds() {
        let out = Renderer::new().render_ansi(code().tree()).unwrap();
        assert!(out.contains("\x1b["));
        assert!(out.contains("int main() {...}"));
    }

    #[test]
    fn test_render_file_counts_hidden_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.cpp");
        std::fs::write(&path, SOURCE).unwrap();

        let rendered = render_file(&path, &ParseConfig::default(), false).unwrap();
        assert_eq!(rendered.visible_lines, 3);
        assert_eq!(rendered.lines_hidden, 4);

        let rendered = render_file_ansi(&path, &ParseConfig::default(), true).unwrap();
        assert_eq!(rendered.visible_lines, 7);
        assert_eq!(rendered.lines_hidden, 0);
    }
}
