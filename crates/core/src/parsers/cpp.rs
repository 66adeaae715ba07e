use super::braces::{brace_delta, find_arm_end, find_end_brace, find_open_brace, ArmEnd};
use super::{CodeBase, CodeParser, ParseDiagnostic, ParserError};
use crate::config::ParseConfig;
use crate::ids::ElementId;
use crate::models::{Dialect, FileKind, LineKind};
use crate::symbols::{
    base_type_name, extract_params, extract_var, Class, DeclForm, Declaration, Function, Location,
    ParamList, Struct, SymbolTable, TypeRef, Variable,
};
use crate::text::{TextLine, TextPage};
use crate::tree::CodeTree;
use regex::Regex;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

struct Patterns {
    include: Regex,
    class: Regex,
    struct_fwd: Regex,
    record: Regex,
    record_name: Regex,
    enumeration: Regex,
    define: Regex,
    cond_open: Regex,
    cond_arm: Regex,
    cond_close: Regex,
    directive: Regex,
    macro_begin: Regex,
    macro_end: Regex,
    access: Regex,
    control: Regex,
    for_init: Regex,
}

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            include: Regex::new(r"^\s*#\s*include\b")?,
            class: Regex::new(r"^\s*class\s+([A-Za-z_]\w*)\b(.*)$")?,
            struct_fwd: Regex::new(r"^\s*struct\s+([A-Za-z_]\w*)\s*;")?,
            record: Regex::new(
                r"^\s*(typedef\s+)?(struct|union)(\s+([A-Za-z_]\w*))?\s*(:[^{;]*)?(\{.*)?$",
            )?,
            record_name: Regex::new(r"\}\s*\**\s*([A-Za-z_]\w*)\s*[;,]")?,
            enumeration: Regex::new(
                r"^\s*(typedef\s+)?enum\b(\s+(class|struct))?(\s+[A-Za-z_]\w*)?\s*(:[^{;]*)?(\{.*)?$",
            )?,
            define: Regex::new(r"^\s*#\s*define\b")?,
            cond_open: Regex::new(r"^\s*#\s*(if|ifdef|ifndef)\b")?,
            cond_arm: Regex::new(r"^\s*#\s*(else|elif)\b")?,
            cond_close: Regex::new(r"^\s*#\s*endif\b")?,
            directive: Regex::new(r"^\s*#")?,
            macro_begin: Regex::new(r"^\s*wxBEGIN_\w+")?,
            macro_end: Regex::new(r"^\s*wxEND_\w+")?,
            access: Regex::new(r"^\s*(public|protected|private)\s*:")?,
            control: Regex::new(
                r"^\s*(\}\s*)?(if|else|for|while|switch|case|default|do|try|catch)\b|^\s*\{",
            )?,
            for_init: Regex::new(r"^\s*for\s*\(\s*(.*)$")?,
        })
    }
}

/// Where the scanner is: which classifiers apply and where declarations go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Global,
    /// Body of a struct or class
    Members(TypeRef),
    /// Inside a function; `depth` is the nesting level of the next local section
    Local { depth: usize },
}

/// Line-classifying parser for the block-structured C++ dialect.
pub struct CppParser {
    config: ParseConfig,
    patterns: Patterns,
}

impl CppParser {
    pub fn new(config: ParseConfig) -> Result<Self, ParserError> {
        config.validate()?;
        Ok(Self {
            config,
            patterns: Patterns::new()?,
        })
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    pub fn parse_source(&self, source: &str) -> CodeBase {
        self.parse_page(&TextPage::from_source(source))
    }

    pub fn parse_file(&self, path: &Path) -> Result<CodeBase, ParserError> {
        let source = std::fs::read_to_string(path)?;
        Ok(self.parse_source(&source))
    }

    pub fn parse_page(&self, page: &TextPage) -> CodeBase {
        let kept = page.len().min(self.config.max_lines);
        let lines = &page.lines()[..kept];
        let mut diagnostics = Vec::new();
        if kept < page.len() {
            let diag = ParseDiagnostic::Truncated {
                kept,
                dropped: page.len() - kept,
            };
            warn!(%diag, "input truncated");
            diagnostics.push(diag);
        }

        if let Some(layout) = self.detect_layout(lines) {
            if layout.blocks.len() == self.config.num_blocks {
                debug!(blocks = layout.blocks.len(), "structured file");
                let mut builder = Builder::new(lines, &self.patterns, &self.config);
                builder.diagnostics = diagnostics;
                builder.structured(&layout);
                return builder.finish(Dialect::Structured, layout.blocks.len());
            }
            let diag = ParseDiagnostic::BlockCount {
                expected: self.config.num_blocks,
                found: layout.blocks.len(),
            };
            warn!(%diag, "rejected as structured file");
            diagnostics.push(diag);
        }

        let mut builder = Builder::new(lines, &self.patterns, &self.config);
        builder.diagnostics = diagnostics;
        let root = builder.tree.root();
        builder.scan(root, 0..lines.len(), Scope::Global);
        builder.finish(Dialect::Flat, 0)
    }

    fn is_block_marker(&self, line: &TextLine) -> bool {
        line.as_str()
            .trim_start()
            .starts_with(self.config.block_marker.as_str())
    }

    /// Locate the preamble and the block markers, if the file opens with one.
    fn detect_layout(&self, lines: &[TextLine]) -> Option<Layout> {
        let first = lines.iter().position(|l| !l.is_blank())?;
        let opening = lines[first].as_str().trim_start();
        let after_marker = opening.strip_prefix(self.config.preamble_marker.as_str())?;

        let close = if after_marker.contains("*/") {
            first
        } else {
            (first + 1..lines.len()).find(|&j| lines[j].contains("*/"))?
        };

        let mut body_start = close + 1;
        while body_start < lines.len() && lines[body_start].is_blank() {
            body_start += 1;
        }
        if body_start < lines.len() && !self.is_block_marker(&lines[body_start]) {
            debug!(line = body_start + 1, "content before the first block");
            return None;
        }

        let blocks = (body_start..lines.len())
            .filter(|&j| self.is_block_marker(&lines[j]))
            .collect();
        Some(Layout {
            preamble: first..close + 1,
            body_start,
            blocks,
        })
    }
}

impl CodeParser for CppParser {
    fn parse(&self, page: &TextPage) -> CodeBase {
        self.parse_page(page)
    }

    fn file_kinds(&self) -> &'static [FileKind] {
        &[FileKind::Source, FileKind::Header]
    }
}

struct Layout {
    /// Preamble comment lines
    preamble: Range<usize>,
    /// First line after the preamble and its trailing blank lines
    body_start: usize,
    /// Block marker lines
    blocks: Vec<usize>,
}

fn header_kind(kind: LineKind) -> LineKind {
    match kind {
        LineKind::Block | LineKind::SubBlock | LineKind::Preamble | LineKind::CommentBlock => {
            LineKind::Comment
        }
        LineKind::Conditional => LineKind::Directive,
        LineKind::Define => LineKind::Define,
        _ => LineKind::Code,
    }
}

/// Names declared after the first one: `b` and `c` in `int a = 1, *b, c[2];`.
///
/// `rest` is what followed the first name and `separator` the delimiter that
/// ended it. Returns `(name, pointer marker)` pairs.
fn more_declarators(rest: &str, separator: Option<char>) -> Vec<(String, &'static str)> {
    let mut segments = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, c) in rest.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = (depth - 1).max(0),
            ',' if depth == 0 => {
                segments.push(&rest[start..idx]);
                start = idx + 1;
            }
            ';' if depth == 0 => break,
            _ => {}
        }
    }
    let tail_end = rest[start..].find(';').map_or(rest.len(), |i| start + i);
    segments.push(&rest[start..tail_end]);

    if separator != Some(',') {
        // the first segment is the first name's initializer or bound
        segments.remove(0);
    }

    segments
        .into_iter()
        .filter_map(|segment| {
            let segment = segment.trim();
            let marker = if segment.starts_with('*') {
                "*"
            } else if segment.starts_with('&') {
                "&"
            } else {
                ""
            };
            let body = segment.trim_start_matches(['*', '&', ' ']);
            let name: String = body
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            match name.chars().next() {
                Some(c) if c.is_alphabetic() || c == '_' => Some((name, marker)),
                _ => None,
            }
        })
        .collect()
}

/// Mutable state of one parse pass.
struct Builder<'a> {
    lines: &'a [TextLine],
    patterns: &'a Patterns,
    config: &'a ParseConfig,
    tree: CodeTree,
    symbols: SymbolTable,
    diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> Builder<'a> {
    fn new(lines: &'a [TextLine], patterns: &'a Patterns, config: &'a ParseConfig) -> Self {
        Self {
            lines,
            patterns,
            config,
            tree: CodeTree::new(),
            symbols: SymbolTable::new(),
            diagnostics: Vec::new(),
        }
    }

    fn finish(self, dialect: Dialect, block_count: usize) -> CodeBase {
        CodeBase {
            tree: self.tree,
            symbols: self.symbols,
            dialect,
            block_count,
            diagnostics: self.diagnostics,
        }
    }

    fn text(&self, idx: usize) -> &'a str {
        self.lines[idx].as_str()
    }

    fn diagnose(&mut self, diag: ParseDiagnostic) {
        warn!(%diag, "parse diagnostic");
        self.diagnostics.push(diag);
    }

    fn leaf(&mut self, parent: ElementId, kind: LineKind, idx: usize) -> Option<ElementId> {
        self.tree.push_leaf(parent, kind, self.lines[idx].clone())
    }

    /// Push a section and the leaf for its first line.
    fn open_section(
        &mut self,
        parent: ElementId,
        kind: LineKind,
        idx: usize,
        folded: bool,
    ) -> Option<(ElementId, ElementId)> {
        let section = self
            .tree
            .push_section(parent, kind, &self.lines[idx], folded)?;
        let first = self.leaf(section, header_kind(kind), idx)?;
        Some((section, first))
    }

    /// Record a mismatch if `section` does not span exactly `lines`.
    fn close_section(&mut self, section: ElementId, lines: Range<usize>) {
        let expected = lines.len();
        let actual = self.tree.length(section);
        if expected != actual {
            self.diagnose(ParseDiagnostic::LengthMismatch {
                line: lines.start + 1,
                expected,
                actual,
            });
        }
    }

    /// Fill a brace-delimited section whose first line is `start`.
    ///
    /// Header lines run through `open`; the body between the braces is
    /// scanned in `scope`, or kept as raw lines when `scope` is `None`.
    fn braced_body(
        &mut self,
        section: ElementId,
        start: usize,
        open: usize,
        close: usize,
        scope: Option<Scope>,
    ) {
        self.arm_body(section, start, open, close, scope);
        if close > open {
            self.leaf(section, LineKind::Code, close);
        }
        self.close_section(section, start..close + 1);
    }

    /// Header lines through `open`, then the lines before `stop`.
    fn arm_body(
        &mut self,
        section: ElementId,
        start: usize,
        open: usize,
        stop: usize,
        scope: Option<Scope>,
    ) {
        for idx in start + 1..=open {
            self.leaf(section, LineKind::Code, idx);
        }
        let body = open + 1..stop.max(open + 1);
        match scope {
            Some(scope) => self.scan(section, body, scope),
            None => {
                for idx in body {
                    self.leaf(section, LineKind::Code, idx);
                }
            }
        }
    }

    fn unmatched(&mut self, parent: ElementId, idx: usize) -> usize {
        self.diagnose(ParseDiagnostic::UnmatchedBrace { line: idx + 1 });
        self.leaf(parent, LineKind::Code, idx);
        1
    }

    // ---- structured files ----

    fn structured(&mut self, layout: &Layout) {
        let root = self.tree.root();
        for idx in 0..layout.preamble.start {
            self.leaf(root, LineKind::Blank, idx);
        }

        let start = layout.preamble.start;
        if let Some((preamble, _)) = self.open_section(root, LineKind::Preamble, start, true) {
            for idx in start + 1..layout.preamble.end {
                self.leaf(preamble, LineKind::Comment, idx);
            }
            for idx in layout.preamble.end..layout.body_start {
                self.leaf(preamble, LineKind::Blank, idx);
            }
            self.close_section(preamble, start..layout.body_start);
        }

        for (k, &marker) in layout.blocks.iter().enumerate() {
            let stop = layout
                .blocks
                .get(k + 1)
                .copied()
                .unwrap_or(self.lines.len());
            self.block(root, marker..stop);
        }
    }

    fn block(&mut self, root: ElementId, range: Range<usize>) {
        let subs: Vec<usize> = (range.start + 1..range.end)
            .filter(|&idx| {
                self.text(idx)
                    .trim_start()
                    .starts_with(self.config.sub_block_marker.as_str())
            })
            .collect();
        let folded = subs.is_empty() && self.config.fold_blocks;
        let Some((block, _)) = self.open_section(root, LineKind::Block, range.start, folded) else {
            return;
        };
        debug!(line = range.start + 1, sub_blocks = subs.len(), "block");

        let first_sub = subs.first().copied().unwrap_or(range.end);
        self.scan(block, range.start + 1..first_sub, Scope::Global);
        for (k, &marker) in subs.iter().enumerate() {
            let stop = subs.get(k + 1).copied().unwrap_or(range.end);
            if let Some((sub, _)) =
                self.open_section(block, LineKind::SubBlock, marker, self.config.fold_sub_blocks)
            {
                self.scan(sub, marker + 1..stop, Scope::Global);
                self.close_section(sub, marker..stop);
            }
        }
        self.close_section(block, range);
    }

    // ---- scope scanning ----

    fn scan(&mut self, parent: ElementId, range: Range<usize>, scope: Scope) {
        let mut idx = range.start;
        while idx < range.end {
            let consumed = match scope {
                Scope::Local { depth } => self.classify_local(parent, idx, range.end, depth),
                _ => self.classify_global(parent, idx, range.end, scope),
            };
            idx += consumed.max(1);
        }
    }

    /// Classify the construct starting at `idx` at file or member scope.
    /// Returns the number of lines consumed.
    fn classify_global(&mut self, parent: ElementId, idx: usize, end: usize, scope: Scope) -> usize {
        let text = self.text(idx);
        if self.patterns.include.is_match(text) {
            self.leaf(parent, LineKind::Include, idx);
            return 1;
        }
        if let Some(n) = self.try_class(parent, idx, end) {
            return n;
        }
        if let Some(caps) = self.patterns.struct_fwd.captures(text) {
            let name = &caps[1];
            if !self.symbols.structs.contains(name) {
                self.symbols.add_struct(Struct::new(name));
            }
            self.leaf(parent, LineKind::FwdDecl, idx);
            return 1;
        }
        if let Some(n) = self.try_enum(parent, idx, end) {
            return n;
        }
        if let Some(n) = self.try_record(parent, idx, end) {
            return n;
        }
        if let Some(n) = self.try_define(parent, idx, end) {
            return n;
        }
        if let Some(n) = self.try_comment(parent, idx, end) {
            return n;
        }
        if let Some(n) = self.try_macro_block(parent, idx, end) {
            return n;
        }
        if let Some(n) = self.try_conditional(parent, idx, end, scope) {
            return n;
        }
        if text.trim().is_empty() {
            self.leaf(parent, LineKind::Blank, idx);
            return 1;
        }
        if self.patterns.directive.is_match(text) {
            self.leaf(parent, LineKind::Directive, idx);
            return 1;
        }
        if matches!(scope, Scope::Members(_)) && self.patterns.access.is_match(text) {
            self.leaf(parent, LineKind::AccessSpecifier, idx);
            return 1;
        }
        if let Some(n) = self.try_declaration(parent, idx, end, scope) {
            return n;
        }
        self.leaf(parent, LineKind::Code, idx);
        1
    }

    fn classify_local(&mut self, parent: ElementId, idx: usize, end: usize, depth: usize) -> usize {
        let scope = Scope::Local { depth };
        let text = self.text(idx);
        if let Some(n) = self.try_comment(parent, idx, end) {
            return n;
        }
        if text.trim().is_empty() {
            self.leaf(parent, LineKind::Blank, idx);
            return 1;
        }
        if let Some(n) = self.try_conditional(parent, idx, end, scope) {
            return n;
        }
        if self.patterns.directive.is_match(text) {
            self.leaf(parent, LineKind::Directive, idx);
            return 1;
        }
        if !self.patterns.control.is_match(text) {
            let mut line = self.lines[idx].trimmed();
            if let Some(decl) = extract_var(&mut line, &self.symbols) {
                if decl.is_variable() {
                    return self.variables(parent, idx, end, scope, &decl, line.as_str());
                }
            }
        }
        if let Some(n) = self.try_local_section(parent, idx, end, depth) {
            return n;
        }
        self.leaf(parent, LineKind::Code, idx);
        1
    }

    // ---- constructs ----

    fn try_comment(&mut self, parent: ElementId, idx: usize, end: usize) -> Option<usize> {
        let trimmed = self.text(idx).trim_start();
        if trimmed.starts_with("//") {
            let run = (idx..end)
                .take_while(|&j| self.text(j).trim_start().starts_with("//"))
                .count();
            if run == 1 {
                self.leaf(parent, LineKind::Comment, idx);
                return Some(1);
            }
            let (section, _) = self.open_section(parent, LineKind::CommentBlock, idx, true)?;
            for j in idx + 1..idx + run {
                self.leaf(section, LineKind::Comment, j);
            }
            self.close_section(section, idx..idx + run);
            return Some(run);
        }

        let after = trimmed.strip_prefix("/*")?;
        if after.contains("*/") {
            self.leaf(parent, LineKind::Comment, idx);
            return Some(1);
        }
        let Some(close) = (idx + 1..end).find(|&j| self.text(j).contains("*/")) else {
            self.diagnose(ParseDiagnostic::MissingCommentEnd { line: idx + 1 });
            self.leaf(parent, LineKind::Comment, idx);
            return Some(1);
        };
        let (section, _) = self.open_section(parent, LineKind::CommentBlock, idx, true)?;
        for j in idx + 1..=close {
            self.leaf(section, LineKind::Comment, j);
        }
        self.close_section(section, idx..close + 1);
        Some(close - idx + 1)
    }

    fn try_define(&mut self, parent: ElementId, idx: usize, end: usize) -> Option<usize> {
        if !self.patterns.define.is_match(self.text(idx)) {
            return None;
        }
        let mut last = idx;
        while last + 1 < end && self.text(last).trim_end().ends_with('\\') {
            last += 1;
        }
        if last == idx {
            self.leaf(parent, LineKind::Define, idx);
            return Some(1);
        }
        let (section, _) = self.open_section(parent, LineKind::Define, idx, true)?;
        for j in idx + 1..=last {
            self.leaf(section, LineKind::Define, j);
        }
        self.close_section(section, idx..last + 1);
        Some(last - idx + 1)
    }

    fn try_macro_block(&mut self, parent: ElementId, idx: usize, end: usize) -> Option<usize> {
        if !self.patterns.macro_begin.is_match(self.text(idx)) {
            return None;
        }
        let close = (idx + 1..end).find(|&j| self.patterns.macro_end.is_match(self.text(j)))?;
        let (section, _) = self.open_section(parent, LineKind::ToolkitMacroBlock, idx, true)?;
        for j in idx + 1..=close {
            self.leaf(section, LineKind::Code, j);
        }
        self.close_section(section, idx..close + 1);
        Some(close - idx + 1)
    }

    fn try_conditional(
        &mut self,
        parent: ElementId,
        idx: usize,
        end: usize,
        scope: Scope,
    ) -> Option<usize> {
        if !self.patterns.cond_open.is_match(self.text(idx)) {
            return None;
        }
        let mut depth = 0usize;
        let mut arms = vec![idx];
        let mut endif = None;
        for j in idx + 1..end {
            let text = self.text(j);
            if self.patterns.cond_open.is_match(text) {
                depth += 1;
            } else if self.patterns.cond_close.is_match(text) {
                if depth == 0 {
                    endif = Some(j);
                    break;
                }
                depth -= 1;
            } else if depth == 0 && self.patterns.cond_arm.is_match(text) {
                arms.push(j);
            }
        }
        let Some(endif) = endif else {
            self.diagnose(ParseDiagnostic::MissingEndif { line: idx + 1 });
            self.leaf(parent, LineKind::Directive, idx);
            return Some(1);
        };

        for (k, &start) in arms.iter().enumerate() {
            let last_arm = k + 1 == arms.len();
            let stop = if last_arm { endif + 1 } else { arms[k + 1] };
            let (section, _) = self.open_section(parent, LineKind::Conditional, start, true)?;
            if last_arm {
                self.scan(section, start + 1..endif, scope);
                self.leaf(section, LineKind::Directive, endif);
            } else {
                self.scan(section, start + 1..stop, scope);
            }
            self.close_section(section, start..stop);
        }
        Some(endif - idx + 1)
    }

    fn try_class(&mut self, parent: ElementId, idx: usize, end: usize) -> Option<usize> {
        let caps = self.patterns.class.captures(self.text(idx))?;
        let name = caps.get(1)?.as_str();
        let rest = caps.get(2).map_or("", |m| m.as_str()).trim();

        if rest.starts_with(';') {
            if !self.symbols.classes.contains(name) {
                self.symbols.add_class(Class::new(name));
            }
            self.leaf(parent, LineKind::FwdDecl, idx);
            return Some(1);
        }
        if !(rest.is_empty() || rest.starts_with(':') || rest.starts_with('{')) {
            return None;
        }
        let open = find_open_brace(self.lines, idx, end)?;
        let Some(close) = find_end_brace(self.lines, open, end) else {
            return Some(self.unmatched(parent, idx));
        };

        let id = self.symbols.add_class(Class::new(name));
        let ty = TypeRef::Class(id);
        let (section, first) = self.open_section(parent, LineKind::Class, idx, true)?;
        if let Some(class) = self.symbols.class_by_id_mut(id) {
            class.location = Some(Location::new(first, idx));
        }
        self.tree.set_symbol_link(section, Some(ty));
        debug!(class = name, line = idx + 1, "class");
        self.braced_body(section, idx, open, close, Some(Scope::Members(ty)));
        Some(close - idx + 1)
    }

    /// `struct`/`union` definitions, with or without `typedef`
    fn try_record(&mut self, parent: ElementId, idx: usize, end: usize) -> Option<usize> {
        let caps = self.patterns.record.captures(self.text(idx))?;
        let is_typedef = caps.get(1).is_some();
        let tag = caps.get(4).map(|m| m.as_str());
        let open = find_open_brace(self.lines, idx, end)?;
        let Some(close) = find_end_brace(self.lines, open, end) else {
            return Some(self.unmatched(parent, idx));
        };

        let alias = if is_typedef {
            self.patterns
                .record_name
                .captures(self.text(close))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
        } else {
            None
        };
        let (section, first) = self.open_section(parent, LineKind::TypedefStruct, idx, true)?;

        match alias.or(tag) {
            Some(name) => {
                let mut record = Struct::new(name);
                record.location = Some(Location::new(first, idx));
                let ty = TypeRef::Struct(self.symbols.add_struct(record));
                self.tree.set_symbol_link(section, Some(ty));
                debug!(name, line = idx + 1, "struct");
                self.braced_body(section, idx, open, close, Some(Scope::Members(ty)));
            }
            None => self.braced_body(section, idx, open, close, None),
        }
        Some(close - idx + 1)
    }

    fn try_enum(&mut self, parent: ElementId, idx: usize, end: usize) -> Option<usize> {
        if !self.patterns.enumeration.is_match(self.text(idx)) {
            return None;
        }
        let open = find_open_brace(self.lines, idx, end)?;
        let Some(close) = find_end_brace(self.lines, open, end) else {
            return Some(self.unmatched(parent, idx));
        };
        let (section, _) = self.open_section(parent, LineKind::Enum, idx, true)?;
        self.braced_body(section, idx, open, close, None);
        Some(close - idx + 1)
    }

    fn try_declaration(
        &mut self,
        parent: ElementId,
        idx: usize,
        end: usize,
        scope: Scope,
    ) -> Option<usize> {
        let mut line = self.lines[idx].trimmed();
        let decl = extract_var(&mut line, &self.symbols)?;
        if decl.is_function() {
            return self.function(parent, idx, end, scope, &decl, line);
        }
        if decl.is_variable() {
            return Some(self.variables(parent, idx, end, scope, &decl, line.as_str()));
        }
        None
    }

    fn owner_of(&self, decl: &Declaration, scope: Scope) -> Option<TypeRef> {
        match decl.form {
            DeclForm::Constructor(id) | DeclForm::Destructor(id) => return Some(TypeRef::Class(id)),
            DeclForm::Plain | DeclForm::FunctionPointer => {}
        }
        if let Some(owner) = decl.owner() {
            return self.symbols.lookup_type(owner);
        }
        match scope {
            Scope::Members(ty) => Some(ty),
            _ => None,
        }
    }

    fn register_function(&mut self, function: Function, form: DeclForm, owner: Option<TypeRef>) {
        match (form, owner) {
            (DeclForm::Constructor(id), _) => {
                if let Some(class) = self.symbols.class_by_id_mut(id) {
                    class.constructor = Some(function);
                }
            }
            (DeclForm::Destructor(id), _) => {
                if let Some(class) = self.symbols.class_by_id_mut(id) {
                    class.destructor = Some(function);
                }
            }
            (_, Some(ty)) => {
                if let Some(members) = self.symbols.members_mut(ty) {
                    members.functions.insert(function);
                }
            }
            (_, None) => {
                self.symbols.functions.insert(function);
            }
        }
    }

    /// A function prototype or definition whose name was found on line `idx`.
    fn function(
        &mut self,
        parent: ElementId,
        idx: usize,
        end: usize,
        scope: Scope,
        decl: &Declaration,
        mut rest: TextLine,
    ) -> Option<usize> {
        let mut params = Vec::new();
        let mut sig_end = idx;
        while extract_params(&mut rest, &self.symbols, &mut params) == ParamList::Open {
            sig_end += 1;
            if sig_end >= end {
                return None;
            }
            rest = self.lines[sig_end].trimmed();
        }

        let owner = self.owner_of(decl, scope);
        let mut function = Function::new(decl.name.clone(), decl.type_name.clone());
        function.class_qualifier = decl.class_qualifier.clone();
        function.params = params.iter().filter(|p| !p.name.is_empty()).cloned().collect();

        let Some(open) = find_open_brace(self.lines, sig_end, end) else {
            if !self.text(sig_end).trim_end().ends_with(';') {
                return None;
            }
            let first = self.leaf(parent, LineKind::FwdDecl, idx);
            for j in idx + 1..=sig_end {
                self.leaf(parent, LineKind::Code, j);
            }
            function.location = first.map(|f| Location::new(f, idx));
            self.register_function(function, decl.form, owner);
            return Some(sig_end - idx + 1);
        };
        let Some(close) = find_end_brace(self.lines, open, end) else {
            return Some(self.unmatched(parent, idx));
        };

        let kind = if owner.is_some() {
            LineKind::ClassMethodDef
        } else {
            LineKind::FunctionDef
        };
        let (section, first) = self.open_section(parent, kind, idx, true)?;
        self.tree.set_symbol_link(section, owner);
        let location = Location::new(first, idx);
        if let Some(vars) = self.tree.vars_mut(section) {
            for param in &function.params {
                vars.insert(param.clone().at(location));
            }
        }
        function.location = Some(location);
        debug!(function = %decl.name, line = idx + 1, "function");
        self.register_function(function, decl.form, owner);

        self.braced_body(section, idx, open, close, Some(Scope::Local { depth: 1 }));
        Some(close - idx + 1)
    }

    /// A variable declaration line, possibly declaring several names.
    fn variables(
        &mut self,
        parent: ElementId,
        idx: usize,
        end: usize,
        scope: Scope,
        decl: &Declaration,
        rest: &str,
    ) -> usize {
        let base = base_type_name(&decl.type_name).to_string();
        let mut names = vec![(decl.name.clone(), decl.type_name.clone())];
        for (name, marker) in more_declarators(rest, decl.separator) {
            let type_name = if marker.is_empty() {
                base.clone()
            } else {
                format!("{} {}", base, marker)
            };
            names.push((name, type_name));
        }

        // brace initializer spanning lines
        let mut last = idx;
        if brace_delta(self.text(idx)) > 0 {
            if let Some(close) = find_end_brace(self.lines, idx, end) {
                last = close;
            }
        }

        let first = self.leaf(parent, LineKind::VarDecl, idx);
        for j in idx + 1..=last {
            self.leaf(parent, LineKind::Code, j);
        }
        let location = first.map(|f| Location::new(f, idx));
        for (name, type_name) in names {
            let variable = Variable {
                name,
                type_name,
                location,
            };
            self.register_variable(parent, scope, variable);
        }
        last - idx + 1
    }

    fn register_variable(&mut self, parent: ElementId, scope: Scope, variable: Variable) {
        match scope {
            Scope::Members(ty) => {
                if let Some(members) = self.symbols.members_mut(ty) {
                    members.variables.insert(variable);
                }
            }
            Scope::Global => {
                self.symbols.globals.insert(variable.clone());
                if let Some(vars) = self.tree.vars_mut(parent) {
                    vars.insert(variable);
                }
            }
            Scope::Local { .. } => {
                if let Some(vars) = self.tree.vars_mut(parent) {
                    vars.insert(variable);
                }
            }
        }
    }

    /// Control-flow statements and other brace-opening lines inside a function.
    fn try_local_section(
        &mut self,
        parent: ElementId,
        idx: usize,
        end: usize,
        depth: usize,
    ) -> Option<usize> {
        let text = self.text(idx);
        let open = if brace_delta(text) > 0 {
            idx
        } else if self.patterns.control.is_match(text) {
            find_open_brace(self.lines, idx, end)?
        } else {
            return None;
        };
        let Some(arm_end) = find_arm_end(self.lines, open, end) else {
            return Some(self.unmatched(parent, idx));
        };

        let (section, first) = self.open_section(parent, LineKind::local_scope(depth), idx, true)?;
        if let Some(caps) = self.patterns.for_init.captures(text) {
            let mut init = TextLine::new(caps.get(1).map_or("", |m| m.as_str()));
            if let Some(decl) = extract_var(&mut init, &self.symbols) {
                if decl.is_variable() {
                    let variable = Variable::new(decl.name, decl.type_name)
                        .at(Location::new(first, idx));
                    if let Some(vars) = self.tree.vars_mut(section) {
                        vars.insert(variable);
                    }
                }
            }
        }

        // nesting below the fourth level is kept unparsed
        let inner = (depth < 4).then_some(Scope::Local { depth: depth + 1 });
        match arm_end {
            ArmEnd::Closed(close) => {
                self.braced_body(section, idx, open, close, inner);
                Some(close - idx + 1)
            }
            // `} else {` starts the next arm as a sibling
            ArmEnd::Continued(next) => {
                self.arm_body(section, idx, open, next, inner);
                self.close_section(section, idx..next);
                Some(next - idx)
            }
        }
    }
}
