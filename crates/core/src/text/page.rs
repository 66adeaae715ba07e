use super::TextLine;
use ropey::Rope;

/// An ordered sequence of lines, as loaded from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextPage {
    lines: Vec<TextLine>,
}

impl TextPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split source text into lines, dropping `\n` / `\r\n` terminators.
    ///
    /// Only `\n` ends a line. A lone `\r` or a Unicode line separator stays
    /// inside the line, the way a compiler counts lines.
    pub fn from_source(source: &str) -> Self {
        if source.is_empty() {
            return Self::default();
        }
        let rope = Rope::from_str(source);
        let mut lines: Vec<TextLine> = rope
            .lines()
            .map(|slice| {
                let mut text = slice.to_string();
                if text.ends_with('\n') {
                    text.pop();
                    if text.ends_with('\r') {
                        text.pop();
                    }
                }
                TextLine::from(text)
            })
            .collect();

        // Rope yields an empty trailing line after a final newline
        if source.ends_with('\n') {
            lines.pop();
        }

        Self { lines }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TextLine>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TextLine> {
        self.lines.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TextLine> {
        self.lines.get_mut(index)
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextLine> {
        self.lines.iter()
    }

    pub fn push(&mut self, line: impl Into<TextLine>) {
        self.lines.push(line.into());
    }

    /// Insert a line before `index`. Returns false when `index` is past the end.
    pub fn insert_line(&mut self, index: usize, line: impl Into<TextLine>) -> bool {
        if index > self.lines.len() {
            return false;
        }
        self.lines.insert(index, line.into());
        true
    }

    pub fn remove_line(&mut self, index: usize) -> Option<TextLine> {
        if index < self.lines.len() {
            Some(self.lines.remove(index))
        } else {
            None
        }
    }

    /// Drop every line past `max_lines`. Returns how many lines were removed.
    pub fn truncate(&mut self, max_lines: usize) -> usize {
        let removed = self.lines.len().saturating_sub(max_lines);
        self.lines.truncate(max_lines);
        removed
    }

    /// Join the page back into source text with `\n` terminators.
    pub fn to_source(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            out.push_str(line.as_str());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_source_strips_terminators() {
        let page = TextPage::from_source("int a;\r\nint b;\n\nint c;\n");
        assert_eq!(page.len(), 4);
        assert_eq!(page.get(0).map(TextLine::as_str), Some("int a;"));
        assert_eq!(page.get(2).map(TextLine::as_str), Some(""));
        assert_eq!(page.get(3).map(TextLine::as_str), Some("int c;"));
    }

    #[test]
    fn test_only_newline_breaks_lines() {
        let page = TextPage::from_source("a\rb\u{2028}c\u{85}d\n");
        assert_eq!(page.len(), 1);
        assert_eq!(page.get(0).map(TextLine::as_str), Some("a\rb\u{2028}c\u{85}d"));
    }

    #[test]
    fn test_from_source_without_trailing_newline() {
        let page = TextPage::from_source("a\nb");
        assert_eq!(page.len(), 2);
        assert_eq!(page.to_source(), "a\nb\n");
    }

    #[test]
    fn test_line_editing() {
        let mut page = TextPage::from_lines(["a", "c"]);
        assert!(page.insert_line(1, "b"));
        assert!(!page.insert_line(9, "z"));
        assert_eq!(page.remove_line(0).map(|l| l.to_string()).as_deref(), Some("a"));
        assert_eq!(page.truncate(1), 1);
        assert_eq!(page.len(), 1);
    }
}
