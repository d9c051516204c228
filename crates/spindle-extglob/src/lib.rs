//! Extglob dialect for spindle.
//!
//! Supplies the grammar table (which rules map to which kinds) and two
//! renderers: a verbatim one that reproduces the input exactly, and one that
//! turns a pattern into regular-expression source.
//!
//! ```text
//! "*.{rs,toml}"  ─► parse() ─► Document<ExtglobKind> ─► to_regex() ─► "[^/]*\.(?:rs|toml)"
//! ```

pub mod grammar;
pub mod regex_source;

use spindle_parser::{Document, ParseError, ParserOptions};
use spindle_render::{RenderError, RenderOptions, Rendered};
use std::fmt;

pub use grammar::parser;
pub use regex_source::regex_renderer;

/// Token kinds of the extglob dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtglobKind {
    /// `\x`
    Escape,
    /// `"..."`
    Quoted,
    /// `**`
    Globstar,
    /// `*`
    Star,
    /// `?`
    Qmark,
    Slash,
    Comma,
    /// `|` alternation separator
    Pipe,
    /// Literal text
    Text,
    /// `(...)`, optionally prefixed by one of `! @ * ? +`
    Paren,
    /// `{...}`
    Brace,
    /// `[...]`, optionally negated with `!` or `^`
    Bracket,
}

impl ExtglobKind {
    pub fn name(self) -> &'static str {
        match self {
            ExtglobKind::Escape => "escape",
            ExtglobKind::Quoted => "quoted",
            ExtglobKind::Globstar => "globstar",
            ExtglobKind::Star => "star",
            ExtglobKind::Qmark => "qmark",
            ExtglobKind::Slash => "slash",
            ExtglobKind::Comma => "comma",
            ExtglobKind::Pipe => "pipe",
            ExtglobKind::Text => "text",
            ExtglobKind::Paren => "paren",
            ExtglobKind::Brace => "brace",
            ExtglobKind::Bracket => "bracket",
        }
    }
}

impl fmt::Display for ExtglobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from the parse → render pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtglobError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Parse a pattern with the extglob grammar.
pub fn parse(pattern: &str, options: ParserOptions) -> Result<Document<ExtglobKind>, ParseError> {
    parser(options).parse(pattern)
}

/// Parse and render a pattern back to its original text.
pub fn round_trip(
    pattern: &str,
    parser_options: ParserOptions,
    render_options: RenderOptions,
) -> Result<Rendered, ExtglobError> {
    let doc = parse(pattern, parser_options)?;
    Ok(grammar::verbatim_renderer(render_options).render(&doc)?)
}

/// Convert a pattern to regular-expression source.
pub fn to_regex(pattern: &str) -> Result<String, ExtglobError> {
    let doc = parse(pattern, ParserOptions::new().strict(true))?;
    let rendered = regex_renderer(RenderOptions::default()).render(&doc)?;
    Ok(rendered.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use spindle_parser::ParseErrorKind;

    #[test]
    fn test_round_trip_helper() {
        let rendered = round_trip("!(a|b)*.js", ParserOptions::default(), RenderOptions::default())
            .unwrap();
        assert_eq!(rendered.output, "!(a|b)*.js");
    }

    #[test]
    fn test_to_regex_helper() {
        assert_eq!(to_regex("*.{rs,toml}").unwrap(), r"[^/]*\.(?:rs|toml)");
    }

    #[test]
    fn test_error_wraps_parse_failure() {
        match to_regex("a)").unwrap_err() {
            ExtglobError::Parse(err) => assert_eq!(err.kind, ParseErrorKind::UnbalancedClose),
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_display_is_transparent() {
        let err = to_regex("(a").unwrap_err();
        assert!(err.to_string().starts_with("Parse error in string at line 1, column 1"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ExtglobKind::Globstar.to_string(), "globstar");
        assert_eq!(ExtglobKind::Bracket.name(), "bracket");
    }
}
