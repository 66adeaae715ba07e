use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that end a word for [`TextLine::extract_word`] and for caret word lookup.
pub const WORD_DELIMITERS: [char; 5] = [' ', ',', '(', ')', ';'];

fn is_delimiter(ch: char) -> bool {
    WORD_DELIMITERS.contains(&ch) || ch == '\t'
}

/// A single mutable line of source text.
///
/// All positions are byte offsets. Operations that receive an offset outside
/// the line (or inside a multi-byte character) leave the line untouched and
/// report failure instead of panicking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextLine {
    text: String,
}

/// Result of [`TextLine::extract_word`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedWord {
    /// The word that was removed from the front of the line
    pub word: String,
    /// Delimiters consumed after the word, in order (empty at end of line)
    pub delimiters: String,
}

impl ExtractedWord {
    /// The delimiter that actually terminated the word.
    ///
    /// For `" ,"` this is `','`; a lone space gives `' '`; end of line gives `None`.
    pub fn closing(&self) -> Option<char> {
        self.delimiters
            .chars()
            .rev()
            .find(|c| *c != ' ' && *c != '\t')
            .or_else(|| self.delimiters.chars().next())
    }

    pub fn at_end(&self) -> bool {
        self.delimiters.is_empty()
    }
}

impl TextLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.text.capacity()
    }

    /// True when the line holds only spaces and tabs
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(|c| c == ' ' || c == '\t')
    }

    pub fn push_str(&mut self, token: &str) {
        self.text.push_str(token);
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    fn valid_index(&self, at: usize) -> bool {
        at <= self.text.len() && self.text.is_char_boundary(at)
    }

    /// Insert a character before byte `at`. Returns false when `at` is out of range.
    pub fn insert_char(&mut self, at: usize, ch: char) -> bool {
        if !self.valid_index(at) {
            return false;
        }
        self.text.insert(at, ch);
        true
    }

    /// Remove and return the character starting at byte `at`.
    pub fn delete_char(&mut self, at: usize) -> Option<char> {
        if at >= self.text.len() || !self.text.is_char_boundary(at) {
            return None;
        }
        Some(self.text.remove(at))
    }

    /// Remove bytes `from..to` and return them as an owned string.
    pub fn cut_range(&mut self, from: usize, to: usize) -> Option<String> {
        if from > to || !self.valid_index(from) || !self.valid_index(to) {
            return None;
        }
        Some(self.text.drain(from..to).collect())
    }

    /// Insert `token` before byte `at`.
    pub fn insert(&mut self, token: &str, at: usize) -> bool {
        if !self.valid_index(at) {
            return false;
        }
        self.text.insert_str(at, token);
        true
    }

    pub fn find(&self, token: &str) -> Option<usize> {
        self.text.find(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.text.contains(token)
    }

    pub fn starts_with(&self, token: &str) -> bool {
        self.text.starts_with(token)
    }

    pub fn ends_with(&self, token: &str) -> bool {
        self.text.ends_with(token)
    }

    /// Strip leading and trailing spaces and tabs in place.
    pub fn trim(&mut self) {
        let trimmed = self.text.trim_matches(|c| c == ' ' || c == '\t');
        if trimmed.len() != self.text.len() {
            self.text = trimmed.to_string();
        }
    }

    /// Copy of this line with whitespace trimmed.
    pub fn trimmed(&self) -> TextLine {
        let mut line = self.clone();
        line.trim();
        line
    }

    pub fn trim_start(&mut self) {
        let start = self.text.len() - self.text.trim_start_matches([' ', '\t']).len();
        if start > 0 {
            self.text.drain(..start);
        }
    }

    /// Remove `prefix` from the front of the line if present.
    pub fn strip_prefix(&mut self, prefix: &str) -> bool {
        if self.text.starts_with(prefix) {
            self.text.drain(..prefix.len());
            true
        } else {
            false
        }
    }

    /// Remove and return the leading word.
    ///
    /// The word ends at the first of `{space, ',', '(', ')', ';'}`. That
    /// delimiter is consumed; a space followed by another delimiter (as in
    /// `"a ,b"`) consumes both, so callers see the delimiter that really closed
    /// the word. Whitespace left in front of the remainder is dropped.
    pub fn extract_word(&mut self) -> ExtractedWord {
        self.trim_start();
        let Some(end) = self.text.find(is_delimiter) else {
            let word = std::mem::take(&mut self.text);
            return ExtractedWord {
                word,
                delimiters: String::new(),
            };
        };

        let word: String = self.text[..end].to_string();
        let mut rest = self.text[end..].chars();
        let mut delimiters = String::new();
        let mut consumed = 0;

        if let Some(first) = rest.next() {
            delimiters.push(first);
            consumed += first.len_utf8();
            if first == ' ' || first == '\t' {
                let after = &self.text[end + consumed..];
                let spaces = after.len() - after.trim_start_matches([' ', '\t']).len();
                if let Some(second) = after[spaces..].chars().next() {
                    if is_delimiter(second) {
                        delimiters.push(second);
                        consumed += spaces + second.len_utf8();
                    }
                }
            }
        }

        self.text.drain(..end + consumed);
        self.trim_start();
        ExtractedWord { word, delimiters }
    }

    /// Truncate the line at the first occurrence of `token`.
    pub fn before_first(&mut self, token: &str) -> bool {
        match self.text.find(token) {
            Some(idx) => {
                self.text.truncate(idx);
                true
            }
            None => false,
        }
    }

    /// Split at the first `.` or `->`, whichever comes first.
    ///
    /// The line keeps the left-hand fragment; the right-hand side (without the
    /// operator) is returned. `None` when the line has no dereference.
    pub fn before_first_deref(&mut self) -> Option<String> {
        let (left, right) = split_first_deref(&self.text)?;
        let (left_len, right) = (left.len(), right.to_string());
        self.text.truncate(left_len);
        Some(right)
    }
}

/// Split `text` at its first `.` or `->`.
pub fn split_first_deref(text: &str) -> Option<(&str, &str)> {
    let dot = text.find('.');
    let arrow = text.find("->");
    match (dot, arrow) {
        (Some(d), Some(a)) if a < d => Some((&text[..a], &text[a + 2..])),
        (Some(d), _) => Some((&text[..d], &text[d + 1..])),
        (None, Some(a)) => Some((&text[..a], &text[a + 2..])),
        (None, None) => None,
    }
}

impl fmt::Display for TextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for TextLine {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for TextLine {
    fn from(text: String) -> Self {
        Self { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_delete() {
        let mut line = TextLine::new("int x;");
        assert!(line.insert_char(3, '*'));
        assert_eq!(line.as_str(), "int* x;");
        assert_eq!(line.delete_char(3), Some('*'));
        assert_eq!(line.delete_char(40), None);
        assert!(!line.insert("y", 99));
        assert_eq!(line.as_str(), "int x;");
    }

    #[test]
    fn test_cut_range() {
        let mut line = TextLine::new("static int count;");
        assert_eq!(line.cut_range(0, 7).as_deref(), Some("static "));
        assert_eq!(line.as_str(), "int count;");
        assert_eq!(line.cut_range(5, 2), None);
    }

    #[test]
    fn test_trim_only_spaces_and_tabs() {
        let mut line = TextLine::new("\t  return 0;  ");
        line.trim();
        assert_eq!(line.as_str(), "return 0;");
    }

    #[test]
    fn test_extract_word_simple() {
        let mut line = TextLine::new("int x;");
        let word = line.extract_word();
        assert_eq!(word.word, "int");
        assert_eq!(word.closing(), Some(' '));
        let word = line.extract_word();
        assert_eq!(word.word, "x");
        assert_eq!(word.closing(), Some(';'));
        assert!(line.is_empty());
    }

    #[test]
    fn test_extract_word_adjacent_delimiters() {
        let mut line = TextLine::new("a ,b)");
        let word = line.extract_word();
        assert_eq!(word.word, "a");
        assert_eq!(word.delimiters, " ,");
        assert_eq!(word.closing(), Some(','));
        assert_eq!(line.as_str(), "b)");
    }

    #[test]
    fn test_extract_word_at_end() {
        let mut line = TextLine::new("name");
        let word = line.extract_word();
        assert_eq!(word.word, "name");
        assert!(word.at_end());
        assert_eq!(word.closing(), None);
    }

    #[test]
    fn test_before_first() {
        let mut line = TextLine::new("int x = 3; // note");
        assert!(line.before_first("//"));
        assert_eq!(line.as_str(), "int x = 3; ");
        assert!(!line.before_first("@@"));
    }

    #[test]
    fn test_before_first_deref() {
        let mut line = TextLine::new("a->b.c");
        assert_eq!(line.before_first_deref().as_deref(), Some("b.c"));
        assert_eq!(line.as_str(), "a");

        let mut line = TextLine::new("a.b->c");
        assert_eq!(line.before_first_deref().as_deref(), Some("b->c"));
        assert_eq!(line.as_str(), "a");

        let mut line = TextLine::new("plain");
        assert_eq!(line.before_first_deref(), None);
    }
}
