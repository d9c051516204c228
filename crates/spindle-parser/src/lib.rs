//! Spindle Parser
//!
//! A small parser engine for glob-like pattern dialects. A dialect registers
//! token handlers (regex captures, open/close pairs, or arbitrary
//! middleware) and the engine drives them over the input, building a tree of
//! typed nodes while tracking nested constructs.
//!
//! ```text
//! input ─► Parser::parse() ─► Document { root → children…, eos }
//! ```
//!
//! # Example
//!
//! ```
//! use spindle_parser::{NodeKind, Parser, ParserOptions, Rule};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Kind { Text, Paren }
//!
//! impl std::fmt::Display for Kind {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! let mut parser = Parser::new(ParserOptions::default());
//! parser
//!     .register_pair(Kind::Paren, Rule::literal("("), Rule::literal(")"))
//!     .register_capture(Kind::Text, Rule::new("[^()]+").unwrap());
//!
//! let doc = parser.parse("(a)").unwrap();
//! let group = doc.top_level()[0];
//! assert_eq!(doc.node(group).kind, NodeKind::Group(Kind::Paren));
//! assert_eq!(doc.children(group).len(), 3);
//! ```

pub mod ast;
pub mod options;
pub mod parser;
pub mod position;
pub mod rule;
pub mod tracker;

pub use ast::{Diagnostic, Document, Kind, Node, NodeId, NodeKind};
pub use options::{ErrorMode, ParserOptions};
pub use parser::{Mark, Middleware, ParseState, Parser};
pub use position::{Location, Position, SourceLabel};
pub use rule::{Rule, RuleMatch};
pub use tracker::{CloseMismatch, NestingTracker};

/// Categories of parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The next character matched no registered handler.
    NoHandler,
    /// A close token matched with no open group of its kind on top.
    UnbalancedClose,
    /// Input ended with a group still open (strict mode only).
    Unterminated,
    /// A handler reported malformed input (throw mode only).
    Diagnostic,
    /// The engine hit a fatal error earlier and has not been reset.
    Poisoned,
}

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error in {source_label} at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub source_label: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        label: &SourceLabel,
        at: Location,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source_label: label.to_string(),
            line: at.line,
            column: at.column,
        }
    }
}

/// A recognition rule that failed to compile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid rule `{pattern}`: {message}")]
pub struct RuleError {
    pub pattern: String,
    pub message: String,
}
