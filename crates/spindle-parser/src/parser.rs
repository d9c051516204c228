//! Parser engine.
//!
//! Drives an ordered table of handlers over the input. On every turn the
//! handlers are tried from the top; the first one that moves the cursor wins
//! and the turn restarts. A turn in which no handler moves the cursor is a
//! fatal `NoHandler` error, so the loop always terminates.
//!
//! Handlers come in three flavours:
//! - captures: a rule producing a single `Token` node
//! - pairs: an open rule that starts a `Group` and a close rule that ends it
//! - middleware: arbitrary functions over `ParseState`

use crate::ast::{Diagnostic, Document, Kind, Node, NodeId, NodeKind};
use crate::options::{ErrorMode, ParserOptions};
use crate::position::{Location, Position, SourceLabel};
use crate::rule::{Rule, RuleMatch};
use crate::tracker::{CloseMismatch, NestingTracker};
use crate::{ParseError, ParseErrorKind};

/// A handler function with full access to the parse state.
///
/// Returns the node it produced, if any. Only cursor movement counts as
/// progress for the dispatch loop.
pub type Middleware<K> = Box<dyn FnMut(&mut ParseState<K>) -> Result<Option<NodeId>, ParseError>>;

enum Handler<K> {
    Capture { kind: K, rule: Rule },
    Open { kind: K, rule: Rule },
    Close { kind: K, rule: Rule },
    Middleware(Middleware<K>),
}

/// A location snapshot taken before attempting a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(Location);

impl Mark {
    pub fn location(self) -> Location {
        self.0
    }
}

/// Engine state shared with handlers: cursor, nesting tracker and the
/// document under construction.
pub struct ParseState<K> {
    options: ParserOptions,
    label: SourceLabel,
    cursor: usize,
    location: Location,
    tracker: NestingTracker<K>,
    document: Document<K>,
    last: Option<NodeId>,
}

impl<K: Kind> ParseState<K> {
    fn new(options: ParserOptions) -> Self {
        let label = options.label();
        Self {
            document: Document::new(label.clone()),
            options,
            label,
            cursor: 0,
            location: Location::start(),
            tracker: NestingTracker::new(),
            last: None,
        }
    }

    // --- Cursor ---

    /// Input not yet consumed.
    pub fn remaining(&self) -> &str {
        &self.document.source()[self.cursor..]
    }

    /// Input consumed so far.
    pub fn consumed(&self) -> &str {
        &self.document.source()[..self.cursor]
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.document.source().len()
    }

    pub fn mark(&self) -> Mark {
        Mark(self.location)
    }

    /// Match `rule` at the cursor and consume the match.
    pub fn eat(&mut self, rule: &Rule) -> Option<RuleMatch> {
        let m = rule.match_head(self.remaining())?;
        self.advance(m.len());
        Some(m)
    }

    fn advance(&mut self, len: usize) {
        let end = (self.cursor + len).min(self.document.source().len());
        let text = &self.document.source()[self.cursor..end];
        self.location = self.location.advance(text);
        self.cursor = end;
    }

    // --- Node construction ---

    /// Build a node covering everything consumed since `start`.
    pub fn node(&self, kind: NodeKind<K>, start: Mark) -> Node<K> {
        let from = start.0.offset.min(self.cursor);
        let raw = &self.document.source()[from..self.cursor];
        let position = Position {
            start: start.0,
            end: self.location,
            source: self.label.clone(),
        };
        Node::new(kind, raw, position).created_at(self.cursor, self.document.source().len())
    }

    /// Append `node` under the innermost open group, or the root if none is
    /// open.
    pub fn append(&mut self, node: Node<K>) -> NodeId {
        let parent = self.tracker.current().unwrap_or(NodeId::ROOT);
        let id = self.document.append(parent, node);
        self.last = Some(id);
        id
    }

    /// Append a `Token` node covering the text consumed since `start`.
    pub fn push_token(&mut self, kind: K, start: Mark) -> NodeId {
        let node = self.node(NodeKind::Token(kind), start);
        self.append(node)
    }

    /// Start a group of `kind` whose opener was consumed since `start`.
    ///
    /// The zero-width `Group` node is appended under the innermost open
    /// group, the `Open` node becomes its first child, and the group becomes
    /// the new innermost open group.
    pub fn open_group(&mut self, kind: K, start: Mark, prefix: Option<String>) -> NodeId {
        let group = Node::new(
            NodeKind::Group(kind),
            "",
            Position::point(start.0, self.label.clone()),
        )
        .with_prefix(prefix)
        .created_at(self.cursor, self.document.source().len());
        let group_id = self.append(group);

        let open = self.node(NodeKind::Open(kind), start);
        self.last = Some(self.document.append(group_id, open));
        self.tracker.push(kind, group_id);
        group_id
    }

    /// Close the innermost group, which must be of `kind`.
    ///
    /// The tracker is only popped when the check passes.
    pub fn close_group(
        &mut self,
        kind: K,
        start: Mark,
        suffix: Option<String>,
    ) -> Result<NodeId, ParseError> {
        let group = self.tracker.pop(kind).map_err(|mismatch| {
            let raw = &self.document.source()[start.0.offset.min(self.cursor)..self.cursor];
            let message = match mismatch {
                CloseMismatch::NothingOpen => {
                    format!("Missing opening {kind} for '{raw}'")
                }
                CloseMismatch::Interleaved { innermost } => {
                    format!("Missing opening {kind} for '{raw}' (innermost open group is {innermost})")
                }
            };
            ParseError::new(ParseErrorKind::UnbalancedClose, message, &self.label, start.0)
        })?;

        let close = self.node(NodeKind::Close(kind), start).with_suffix(suffix);
        let id = self.document.append(group, close);
        self.last = Some(id);
        Ok(id)
    }

    // --- Diagnostics ---

    /// Report malformed input.
    ///
    /// In `ErrorMode::Collect` the diagnostic is recorded on the document
    /// and parsing continues; in `ErrorMode::Throw` it is returned as an
    /// error and the parse aborts.
    pub fn diagnostic(&mut self, message: impl Into<String>) -> Result<(), ParseError> {
        let message = message.into();
        match self.options.error_mode {
            ErrorMode::Collect => {
                self.document.push_error(Diagnostic {
                    message,
                    location: self.location,
                    source: self.label.clone(),
                });
                Ok(())
            }
            ErrorMode::Throw => Err(self.error(ParseErrorKind::Diagnostic, message)),
        }
    }

    fn error(&self, kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, message, &self.label, self.location)
    }

    // --- Queries ---

    pub fn is_inside(&self, kind: K) -> bool {
        self.tracker.is_inside(kind)
    }

    pub fn current_group(&self) -> Option<NodeId> {
        self.tracker.current()
    }

    /// The most recently appended node.
    pub fn last_node(&self) -> Option<NodeId> {
        self.last
    }

    pub fn tracker(&self) -> &NestingTracker<K> {
        &self.tracker
    }

    pub fn document(&self) -> &Document<K> {
        &self.document
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }
}

/// The parser engine.
///
/// Configure it once with handlers, then call `parse` per input. A
/// successful `parse` hands back the document and leaves the engine fresh;
/// a fatal error poisons it until `reset`.
pub struct Parser<K> {
    handlers: Vec<Handler<K>>,
    state: ParseState<K>,
    poisoned: bool,
}

impl<K: Kind> Parser<K> {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            handlers: Vec::new(),
            state: ParseState::new(options),
            poisoned: false,
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.state.options
    }

    pub fn state(&self) -> &ParseState<K> {
        &self.state
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a simple token kind. Earlier registrations take priority.
    pub fn register_capture(&mut self, kind: K, rule: Rule) -> &mut Self {
        self.handlers.push(Handler::Capture { kind, rule });
        self
    }

    /// Register a nested construct with separate open and close rules.
    pub fn register_pair(&mut self, kind: K, open: Rule, close: Rule) -> &mut Self {
        self.handlers.push(Handler::Open { kind, rule: open });
        self.handlers.push(Handler::Close { kind, rule: close });
        self
    }

    /// Register an arbitrary handler function.
    pub fn register_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: FnMut(&mut ParseState<K>) -> Result<Option<NodeId>, ParseError> + 'static,
    {
        self.handlers.push(Handler::Middleware(Box::new(middleware)));
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    /// Parse `input` to completion and return the document.
    ///
    /// Input fed earlier through `feed` is part of the same document.
    pub fn parse(&mut self, input: &str) -> Result<Document<K>, ParseError> {
        self.feed(input)?;
        self.finish()
    }

    /// Append `chunk` to the running input and consume as much as possible,
    /// without finishing the document.
    pub fn feed(&mut self, chunk: &str) -> Result<(), ParseError> {
        self.guard(|parser| {
            parser.state.document.push_source(chunk);
            parser.run()
        })
    }

    /// Finish the document: check for unterminated groups in strict mode,
    /// append the end-of-stream sentinel and hand the document over.
    pub fn finish(&mut self) -> Result<Document<K>, ParseError> {
        self.guard(|parser| {
            let state = &mut parser.state;
            if state.options.strict {
                if let Some((kind, group)) = state.tracker.innermost() {
                    let at = state.document.node(group).position.start;
                    return Err(ParseError::new(
                        ParseErrorKind::Unterminated,
                        format!("Unclosed {kind}: missing closing token before end of input"),
                        &state.label,
                        at,
                    ));
                }
            }

            let eos = Node::new(
                NodeKind::Eos,
                "",
                Position::point(state.location, state.label.clone()),
            )
            .created_at(state.cursor, state.document.source().len());
            state.document.append(NodeId::ROOT, eos);

            let options = state.options.clone();
            let finished = std::mem::replace(state, ParseState::new(options));
            Ok(finished.document)
        })
    }

    /// Discard any partial document and clear a poisoned state. Handlers
    /// stay registered.
    pub fn reset(&mut self) {
        let options = self.state.options.clone();
        self.state = ParseState::new(options);
        self.poisoned = false;
    }

    fn guard<T>(
        &mut self,
        step: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.poisoned {
            return Err(self.state.error(
                ParseErrorKind::Poisoned,
                "Parser is unusable after a fatal error; call reset() first",
            ));
        }
        let result = step(self);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn run(&mut self) -> Result<(), ParseError> {
        while !self.state.is_at_end() {
            let before = self.state.cursor;
            let mut advanced = false;

            for handler in self.handlers.iter_mut() {
                dispatch(handler, &mut self.state)?;
                if self.state.cursor > before {
                    advanced = true;
                    break;
                }
            }

            if !advanced {
                let ch = self.state.peek().unwrap_or('\0');
                return Err(self.state.error(
                    ParseErrorKind::NoHandler,
                    format!("No handler matched input starting with '{ch}'"),
                ));
            }
        }
        Ok(())
    }
}

fn dispatch<K: Kind>(
    handler: &mut Handler<K>,
    state: &mut ParseState<K>,
) -> Result<Option<NodeId>, ParseError> {
    let start = state.mark();
    match handler {
        Handler::Capture { kind, rule } => {
            Ok(state.eat(rule).map(|_| state.push_token(*kind, start)))
        }
        Handler::Open { kind, rule } => match state.eat(rule) {
            Some(m) => Ok(Some(state.open_group(*kind, start, m.prefix))),
            None => Ok(None),
        },
        Handler::Close { kind, rule } => match state.eat(rule) {
            Some(m) => state.close_group(*kind, start, m.suffix).map(Some),
            None => Ok(None),
        },
        Handler::Middleware(middleware) => middleware(state),
    }
}
