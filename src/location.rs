//! Source-location provenance: the brand every AST node carries, and the
//! diagnostics derived from it (outer-form extraction, line/column).

use std::fmt::{self, Display};
use std::rc::Rc;

/// The full source text an AST node was parsed from, plus the byte offset
/// of that node's opening character. Cheap to clone: the text is shared.
#[derive(Clone, Debug)]
pub struct Brand {
    pub source: Rc<str>,
    pub offset: usize,
}

impl Brand {
    pub fn new(source: Rc<str>, offset: usize) -> Self {
        Self { source, offset }
    }

    /// 1-based line and column of this brand's offset.
    pub fn line_col(&self) -> (usize, usize) {
        line_col(&self.source, self.offset)
    }

    /// The enclosing top-level form, e.g. for error messages that want to
    /// show the whole `(define ...)` a failure happened inside.
    pub fn source_view(&self) -> &str {
        source_view(&self.source, self.offset)
    }
}

impl Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.line_col();
        write!(f, "line:{}, col:{}", line, col)
    }
}

/// Computes 1-based line and column by counting newlines up to `offset`.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let mut line = 1;
    let mut col = 1;
    for ch in source[..offset].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Finds the enclosing top-level form around `offset`: scans backwards to a
/// newline immediately preceding `(`, then forward while tracking paren
/// depth with string-literal awareness (an unescaped `"` toggles in-string;
/// while in-string only an unescaped `"` closes it).
pub fn find_outer_form_bounds(source: &str, offset: usize) -> Option<(usize, usize)> {
    let bytes = source.as_bytes();
    let mut loc = offset.min(bytes.len());

    while loc > 0 && !(bytes[loc - 1] == b'\n' && bytes.get(loc) == Some(&b'(')) {
        loc -= 1;
    }

    if bytes.get(loc) != Some(&b'(') {
        return None;
    }

    let start = loc;
    let mut in_string = false;
    let mut depth: i64 = 1;
    let mut i = loc + 1;

    while i < bytes.len() && depth > 0 {
        let c = bytes[i];
        if in_string {
            if c == b'"' && bytes[i - 1] != b'\\' {
                in_string = false;
            }
        } else {
            match c {
                b'(' => depth += 1,
                b')' => depth -= 1,
                b'"' => in_string = true,
                _ => {}
            }
        }
        i += 1;
    }

    Some((start, i))
}

/// The textual form of the enclosing top-level form, or the remainder of
/// the source from `offset` if no enclosing form could be found.
pub fn source_view(source: &str, offset: usize) -> &str {
    match find_outer_form_bounds(source, offset) {
        Some((start, end)) => &source[start..end],
        None => &source[offset.min(source.len())..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_newlines() {
        let src = "(a)\n(b c)\n(d)";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 4), (2, 1));
        assert_eq!(line_col(src, 10), (3, 1));
    }

    #[test]
    fn finds_enclosing_form() {
        let src = "(define x 1)\n(define (f x)\n  (+ x 1))\n";
        let inner_offset = src.find("+ x").unwrap();
        let view = source_view(src, inner_offset);
        assert_eq!(view, "(define (f x)\n  (+ x 1))");
    }

    #[test]
    fn string_literals_suppress_paren_tracking() {
        let src = "(define s \"a ( b ) c\")\n";
        let offset = src.find("b").unwrap();
        let view = source_view(src, offset);
        assert_eq!(view, "(define s \"a ( b ) c\")");
    }

    #[test]
    fn escaped_quote_does_not_close_string() {
        let src = "(define s \"a \\\" (\")\n(ok)";
        let offset = 2;
        let view = source_view(src, offset);
        assert!(view.starts_with("(define"));
    }
}
