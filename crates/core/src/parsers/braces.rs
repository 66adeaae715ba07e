//! Line-level brace matching.

use crate::text::TextLine;

/// Net `{` minus `}` on one line, skipping string and character literals
/// and anything after a `//` comment.
pub fn brace_delta(line: &str) -> isize {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '/' if chars.peek() == Some(&'/') => break,
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn code_part(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// First line in `from..limit` holding a `{`.
///
/// Gives up on a line that ends a statement with `;` before any brace shows.
pub fn find_open_brace(lines: &[TextLine], from: usize, limit: usize) -> Option<usize> {
    for (idx, line) in lines.iter().enumerate().take(limit).skip(from) {
        let code = code_part(line.as_str());
        if let Some(brace) = code.find('{') {
            if !code[..brace].contains(';') {
                return Some(idx);
            }
            return None;
        }
        if code.trim_end().ends_with(';') {
            return None;
        }
    }
    None
}

/// Whether `line` closes a brace and opens the next arm of the same
/// statement, as `} else {`, `} else if (x) {` or `} catch (...) {` do.
pub fn continues_block(line: &str) -> bool {
    match line.trim_start().strip_prefix('}') {
        Some(rest) => {
            let rest = rest.trim_start();
            brace_delta(rest) > 0 || starts_with_word(rest, "else") || starts_with_word(rest, "catch")
        }
        None => false,
    }
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

/// Brace delta of the line holding an opening brace. A leading `}` belongs
/// to the previous arm and is not counted.
fn opening_delta(line: &str) -> isize {
    if continues_block(line) {
        let trimmed = line.trim_start();
        brace_delta(&trimmed[1..])
    } else {
        brace_delta(line)
    }
}

/// The line on which the brace opened at `open` closes, searching up to `limit`.
///
/// Depth is summed per whole line, so a line holding both braces closes on
/// itself.
pub fn find_end_brace(lines: &[TextLine], open: usize, limit: usize) -> Option<usize> {
    let mut depth = 0;
    for (idx, line) in lines.iter().enumerate().take(limit).skip(open) {
        depth += if idx == open {
            opening_delta(line.as_str())
        } else {
            brace_delta(line.as_str())
        };
        if depth <= 0 {
            return Some(idx);
        }
    }
    None
}

/// Where one arm of a braced statement stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmEnd {
    /// Closing brace on this line, which belongs to the arm
    Closed(usize),
    /// This line closes the arm and opens the next one
    Continued(usize),
}

/// Like [`find_end_brace`], but stops at a `} else {` style line at the
/// arm's own depth instead of counting through it.
pub fn find_arm_end(lines: &[TextLine], open: usize, limit: usize) -> Option<ArmEnd> {
    let mut depth = 0;
    for (idx, line) in lines.iter().enumerate().take(limit).skip(open) {
        let text = line.as_str();
        if idx > open && depth == 1 && continues_block(text) {
            return Some(ArmEnd::Continued(idx));
        }
        depth += if idx == open {
            opening_delta(text)
        } else {
            brace_delta(text)
        };
        if depth <= 0 {
            return Some(ArmEnd::Closed(idx));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(lines: &[&str]) -> Vec<TextLine> {
        lines.iter().map(|&l| TextLine::from(l)).collect()
    }

    #[test]
    fn test_brace_delta_skips_literals() {
        assert_eq!(brace_delta("if (a) {"), 1);
        assert_eq!(brace_delta(r#"puts("{"); }"#), -1);
        assert_eq!(brace_delta("char c = '}';"), 0);
        assert_eq!(brace_delta(r#"s = "\"{";"#), 0);
        assert_eq!(brace_delta("x(); // {"), 0);
    }

    #[test]
    fn test_one_line_section() {
        let lines = page(&["void f() { return; }", "int x;"]);
        assert_eq!(find_open_brace(&lines, 0, 2), Some(0));
        assert_eq!(find_end_brace(&lines, 0, 2), Some(0));
    }

    #[test]
    fn test_brace_on_next_line() {
        let lines = page(&["void f()", "{", "  if (x) {", "  }", "}", "int y;"]);
        assert_eq!(find_open_brace(&lines, 0, 6), Some(1));
        assert_eq!(find_end_brace(&lines, 1, 6), Some(4));
    }

    #[test]
    fn test_statement_end_stops_open_search() {
        let lines = page(&["void f();", "{"]);
        assert_eq!(find_open_brace(&lines, 0, 2), None);
        let lines = page(&["struct A *p; {"]);
        assert_eq!(find_open_brace(&lines, 0, 1), None);
    }

    #[test]
    fn test_unmatched_brace_fails() {
        let lines = page(&["void f() {", "  x();", ""]);
        assert_eq!(find_end_brace(&lines, 0, 3), None);
    }

    #[test]
    fn test_limit_bounds_search() {
        let lines = page(&["{", "}", "}"]);
        assert_eq!(find_end_brace(&lines, 0, 1), None);
        assert_eq!(find_open_brace(&lines, 1, 3), None);
    }

    #[test]
    fn test_continues_block() {
        assert!(continues_block("  } else {"));
        assert!(continues_block("} else if (y) {"));
        assert!(continues_block("} else"));
        assert!(continues_block("} catch (const E &e) {"));
        assert!(!continues_block("} while (x);"));
        assert!(!continues_block("}"));
        assert!(!continues_block("} elsewhere();"));
        assert!(!continues_block("else {"));
    }

    #[test]
    fn test_arm_ends_at_else() {
        let lines = page(&["if (x) {", "  a();", "} else {", "  b();", "}"]);
        assert_eq!(find_arm_end(&lines, 0, 5), Some(ArmEnd::Continued(2)));
        assert_eq!(find_arm_end(&lines, 2, 5), Some(ArmEnd::Closed(4)));
        // the whole statement still balances as one unit
        assert_eq!(find_end_brace(&lines, 0, 5), Some(4));
        assert_eq!(find_end_brace(&lines, 2, 5), Some(4));
    }

    #[test]
    fn test_nested_else_is_not_an_arm_boundary() {
        let lines = page(&[
            "if (x) {",
            "  if (y) {",
            "  } else {",
            "  }",
            "}",
        ]);
        assert_eq!(find_arm_end(&lines, 0, 5), Some(ArmEnd::Closed(4)));
    }
}
