//! Source positions.
//!
//! Every node gets a `Position` when it is created. Positions are immutable
//! values: a start `Location` snapshot taken before a match, an end computed
//! from the consumed text, and the label of the input they belong to.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Identifies which original input a position belongs to.
///
/// Cheap to clone; shared by every node produced from the same input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceLabel(Arc<str>);

impl SourceLabel {
    pub fn new(label: &str) -> Self {
        Self(Arc::from(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceLabel {
    fn default() -> Self {
        Self::new("string")
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A point in source text: byte offset plus 1-based line and column.
///
/// Columns count chars, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// The location of the first character of an input.
    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }

    /// The location reached after consuming `text` from here.
    ///
    /// Line count grows by the number of `\n` characters; the column resets
    /// to 1 at each newline and counts the chars after the last one.
    pub fn advance(self, text: &str) -> Self {
        let offset = self.offset + text.len();
        match text.rfind('\n') {
            Some(last) => {
                let newlines = text.bytes().filter(|b| *b == b'\n').count();
                let tail = text[last + 1..].chars().count();
                Self::new(offset, self.line + newlines, tail + 1)
            }
            None => Self::new(offset, self.line, self.column + text.chars().count()),
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The span a node covers in its source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub start: Location,
    pub end: Location,
    pub source: SourceLabel,
}

impl Position {
    /// Span covering `text` consumed at `start`.
    pub fn new(start: Location, text: &str, source: SourceLabel) -> Self {
        Self {
            start,
            end: start.advance(text),
            source,
        }
    }

    /// Zero-width span, used by structural and sentinel nodes.
    pub fn point(at: Location, source: SourceLabel) -> Self {
        Self {
            start: at,
            end: at,
            source,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.source, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_advance_same_line() {
        let end = Location::start().advance("abc");
        assert_eq!(end, Location::new(3, 1, 4));
    }

    #[test]
    fn test_advance_across_newline() {
        let end = Location::start().advance("ab\ncd");
        assert_eq!(end, Location::new(5, 2, 3));
    }

    #[test]
    fn test_advance_trailing_newline_resets_column() {
        let end = Location::new(4, 3, 7).advance("x\n");
        assert_eq!(end, Location::new(6, 4, 1));
    }

    #[test]
    fn test_advance_multiple_newlines() {
        let end = Location::start().advance("\n\n\nz");
        assert_eq!(end.line, 4);
        assert_eq!(end.column, 2);
    }

    #[test]
    fn test_advance_counts_chars_not_bytes() {
        let end = Location::start().advance("é*");
        assert_eq!(end.offset, 3);
        assert_eq!(end.column, 3);
    }

    #[test]
    fn test_advance_crlf_is_one_line() {
        let end = Location::start().advance("a\r\nb");
        assert_eq!(end.line, 2);
        assert_eq!(end.column, 2);
    }

    #[test]
    fn test_position_end_not_before_start() {
        let pos = Position::new(Location::new(2, 1, 3), "(a|b)", SourceLabel::default());
        assert!(pos.end >= pos.start);
        assert_eq!(pos.end.column, 8);
    }

    #[test]
    fn test_point_is_empty() {
        let pos = Position::point(Location::start(), "glob".into());
        assert!(pos.is_empty());
        assert_eq!(pos.to_string(), "glob:1:1-1:1");
    }
}
