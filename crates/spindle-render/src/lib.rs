//! Spindle Renderer
//!
//! Walks a parsed `Document` and regenerates text through per-kind render
//! functions. The engine never recurses on its own: a container's render
//! function decides whether, and how, its children are rendered by calling
//! `Emitter::render_children`.
//!
//! ```text
//! Document ─► Renderer::render() ─► Rendered { output, source_map }
//! ```
//!
//! When source maps are enabled every emitted fragment is tagged with the
//! position of the node that produced it.

pub mod sourcemap;

use serde::{Deserialize, Serialize};
use spindle_parser::{Document, Kind, Location, Node, NodeId, NodeKind};
use std::collections::HashMap;

pub use sourcemap::{Mapping, SourceMap, SourceMapBuilder, SourceMapMode, SourceMapOutput};

/// Categories of render failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderErrorKind {
    /// A node's kind has no render function.
    Unregistered,
    /// A render function reported a failure of its own.
    Handler,
}

/// Render error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Render error: {message}")]
pub struct RenderError {
    pub kind: RenderErrorKind,
    pub message: String,
}

impl RenderError {
    pub fn unregistered<K: Kind>(node: &Node<K>) -> Self {
        Self {
            kind: RenderErrorKind::Unregistered,
            message: format!(
                "No renderer registered for '{}' (value '{}')",
                node.kind, node.raw
            ),
        }
    }

    /// An error raised from inside a render function.
    pub fn handler(message: impl Into<String>) -> Self {
        Self {
            kind: RenderErrorKind::Handler,
            message: message.into(),
        }
    }
}

/// Options recognized by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    pub sourcemap: SourceMapMode,
    /// Name of the generated file, recorded in the source map.
    pub file: Option<String>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sourcemap(mut self, mode: SourceMapMode) -> Self {
        self.sourcemap = mode;
        self
    }

    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// The result of a successful render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendered {
    pub output: String,
    /// Number of non-empty fragments emitted.
    pub fragments: usize,
    pub source_map: Option<SourceMapOutput>,
}

/// A render function: `(emitter, node, siblings, index)`.
///
/// `siblings[index]` is the node being rendered.
pub type RenderFn<K> =
    Box<dyn Fn(&mut Emitter<'_, K>, &Node<K>, &[NodeId], usize) -> Result<(), RenderError>>;

/// The handle render functions write through.
pub struct Emitter<'a, K> {
    doc: &'a Document<K>,
    handlers: &'a HashMap<NodeKind<K>, RenderFn<K>>,
    output: &'a mut String,
    location: Location,
    mappings: Option<Vec<Mapping>>,
    fragments: usize,
}

impl<'a, K: Kind> Emitter<'a, K> {
    /// Append `text` to the output on behalf of `node`.
    ///
    /// Empty text is not a fragment and records nothing.
    pub fn emit(&mut self, text: &str, node: &Node<K>) {
        if text.is_empty() {
            return;
        }
        if let Some(mappings) = self.mappings.as_mut() {
            mappings.push(Mapping {
                generated: self.location,
                original: node.position.clone(),
            });
        }
        self.output.push_str(text);
        self.location = self.location.advance(text);
        self.fragments += 1;
    }

    /// Render every child of `node` in order.
    pub fn render_children(&mut self, node: &Node<K>) -> Result<(), RenderError> {
        let children = node.children();
        for (index, child) in children.iter().enumerate() {
            self.render_node(*child, children, index)?;
        }
        Ok(())
    }

    /// Render one node through its registered render function.
    pub fn render_node(
        &mut self,
        id: NodeId,
        siblings: &[NodeId],
        index: usize,
    ) -> Result<(), RenderError> {
        let doc = self.doc;
        let handlers = self.handlers;
        let node = doc.node(id);
        let render = handlers
            .get(&node.kind)
            .ok_or_else(|| RenderError::unregistered(node))?;
        render(self, node, siblings, index)
    }

    pub fn document(&self) -> &'a Document<K> {
        self.doc
    }

    /// Output produced so far in this render.
    pub fn output(&self) -> &str {
        self.output
    }

    /// Where the next fragment will start in the output.
    pub fn location(&self) -> Location {
        self.location
    }
}

/// The renderer engine.
///
/// Holds per-kind render functions and may render any number of documents
/// one after another. Each `render` starts from an empty output buffer.
pub struct Renderer<K> {
    handlers: HashMap<NodeKind<K>, RenderFn<K>>,
    options: RenderOptions,
    output: String,
}

impl<K: Kind> Renderer<K> {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            handlers: HashMap::new(),
            options,
            output: String::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Register the render function for `kind`, replacing any earlier one.
    pub fn register<F>(&mut self, kind: NodeKind<K>, render: F) -> &mut Self
    where
        F: Fn(&mut Emitter<'_, K>, &Node<K>, &[NodeId], usize) -> Result<(), RenderError>
            + 'static,
    {
        self.handlers.insert(kind, Box::new(render));
        self
    }

    pub fn is_registered(&self, kind: NodeKind<K>) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Render the document's top-level nodes in order.
    pub fn render(&mut self, doc: &Document<K>) -> Result<Rendered, RenderError> {
        self.output.clear();
        let track = self.options.sourcemap != SourceMapMode::Disabled;

        let mut emitter = Emitter {
            doc,
            handlers: &self.handlers,
            output: &mut self.output,
            location: Location::start(),
            mappings: track.then(Vec::new),
            fragments: 0,
        };
        emitter.render_children(doc.node(doc.root()))?;
        let fragments = emitter.fragments;
        let mappings = emitter.mappings.take();

        let source_map = mappings.map(|mappings| {
            let mut builder = SourceMapBuilder::new(self.options.file.clone());
            builder.set_source_content(doc.label().as_str(), doc.source());
            for mapping in mappings {
                builder.add_mapping(mapping.generated, &mapping.original);
            }
            match self.options.sourcemap {
                SourceMapMode::Generator => SourceMapOutput::Generator(builder),
                _ => SourceMapOutput::Map(builder.finish()),
            }
        });

        Ok(Rendered {
            output: self.output.clone(),
            fragments,
            source_map,
        })
    }

    /// Output accumulated by the most recent `render`, including a render
    /// that failed part-way.
    pub fn partial_output(&self) -> &str {
        &self.output
    }
}

// ---------------------------------------------------------------------------
// Stock render functions
// ---------------------------------------------------------------------------

/// Emit the node's raw text.
pub fn emit_raw<K: Kind>(
    cx: &mut Emitter<'_, K>,
    node: &Node<K>,
    _siblings: &[NodeId],
    _index: usize,
) -> Result<(), RenderError> {
    cx.emit(&node.raw, node);
    Ok(())
}

/// Emit the node's children in order.
pub fn emit_children<K: Kind>(
    cx: &mut Emitter<'_, K>,
    node: &Node<K>,
    _siblings: &[NodeId],
    _index: usize,
) -> Result<(), RenderError> {
    cx.render_children(node)
}

/// Emit nothing. Used for sentinels.
pub fn emit_nothing<K: Kind>(
    _cx: &mut Emitter<'_, K>,
    _node: &Node<K>,
    _siblings: &[NodeId],
    _index: usize,
) -> Result<(), RenderError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use spindle_parser::{Parser, ParserOptions, Position, Rule, SourceLabel};
    use std::fmt;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum K {
        Text,
        Pipe,
        Paren,
    }

    impl fmt::Display for K {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                K::Text => "text",
                K::Pipe => "pipe",
                K::Paren => "paren",
            };
            f.write_str(name)
        }
    }

    fn parse(input: &str) -> Document<K> {
        let mut parser = Parser::new(ParserOptions::default());
        parser
            .register_pair(K::Paren, Rule::literal("("), Rule::literal(")"))
            .register_capture(K::Pipe, Rule::literal("|"))
            .register_capture(K::Text, Rule::new(r"[^()|]+").unwrap());
        parser.parse(input).unwrap()
    }

    fn verbatim(options: RenderOptions) -> Renderer<K> {
        let mut renderer = Renderer::new(options);
        renderer
            .register(NodeKind::Eos, emit_nothing)
            .register(NodeKind::Token(K::Text), emit_raw)
            .register(NodeKind::Token(K::Pipe), emit_raw)
            .register(NodeKind::Group(K::Paren), emit_children)
            .register(NodeKind::Open(K::Paren), emit_raw)
            .register(NodeKind::Close(K::Paren), emit_raw);
        renderer
    }

    // =========================================================================
    // Output
    // =========================================================================

    #[test]
    fn test_verbatim_round_trip() {
        for input in ["", "abc", "(a|b)", "((x))", "a(b|(c|d))e"] {
            let doc = parse(input);
            let rendered = verbatim(RenderOptions::default()).render(&doc).unwrap();
            assert_eq!(rendered.output, input);
            assert!(rendered.source_map.is_none());
        }
    }

    #[test]
    fn test_container_controls_children() {
        let mut renderer = verbatim(RenderOptions::default());
        renderer.register(NodeKind::Group(K::Paren), |cx, node, _, _| {
            cx.emit("[", node);
            // Skip the open and close children, keep the contents.
            let children = node.children();
            for (index, child) in children.iter().enumerate() {
                let kind = cx.document().node(*child).kind;
                if matches!(kind, NodeKind::Open(_) | NodeKind::Close(_)) {
                    continue;
                }
                cx.render_node(*child, children, index)?;
            }
            cx.emit("]", node);
            Ok(())
        });
        let rendered = renderer.render(&parse("x(a|b)y")).unwrap();
        assert_eq!(rendered.output, "x[a|b]y");
    }

    #[test]
    fn test_siblings_and_index_passed_through() {
        let mut renderer = verbatim(RenderOptions::default());
        renderer.register(NodeKind::Token(K::Text), |cx, node, siblings, index| {
            let text = format!("{}@{}/{}", node.raw, index, siblings.len());
            cx.emit(&text, node);
            Ok(())
        });
        let rendered = renderer.render(&parse("a|b")).unwrap();
        assert_eq!(rendered.output, "a@0/4|b@2/4");
    }

    #[test]
    fn test_renderer_reusable_across_documents() {
        let mut renderer = verbatim(RenderOptions::default());
        assert_eq!(renderer.render(&parse("(a)")).unwrap().output, "(a)");
        assert_eq!(renderer.render(&parse("b|c")).unwrap().output, "b|c");
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_unregistered_kind_is_fatal() {
        let mut renderer: Renderer<K> = Renderer::new(RenderOptions::default());
        renderer
            .register(NodeKind::Eos, emit_nothing)
            .register(NodeKind::Token(K::Text), emit_raw);
        let err = renderer.render(&parse("a|b")).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Unregistered);
        assert_eq!(
            err.to_string(),
            "Render error: No renderer registered for 'pipe' (value '|')"
        );
        assert_eq!(renderer.partial_output(), "a");
    }

    #[test]
    fn test_unregistered_node_in_handmade_tree() {
        let mut doc: Document<K> = Document::new(SourceLabel::default());
        let position = Position::point(Location::start(), SourceLabel::default());
        doc.append(doc.root(), Node::new(NodeKind::Token(K::Text), "a", position.clone()));

        let mut renderer: Renderer<K> = Renderer::new(RenderOptions::default());
        renderer.register(NodeKind::Token(K::Text), emit_raw);
        assert_eq!(renderer.render(&doc).unwrap().output, "a");

        doc.append(doc.root(), Node::new(NodeKind::Close(K::Paren), ")", position));
        let err = renderer.render(&doc).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Unregistered);
        assert!(err.message.contains("'paren.close'"));
        assert!(err.message.contains("')'"));
    }

    #[test]
    fn test_handler_error_propagates() {
        let mut renderer = verbatim(RenderOptions::default());
        renderer.register(NodeKind::Token(K::Pipe), |_, _, _, _| {
            Err(RenderError::handler("alternation not supported"))
        });
        let err = renderer.render(&parse("(a|b)")).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Handler);
        assert_eq!(renderer.partial_output(), "(a");
    }

    // =========================================================================
    // Source maps
    // =========================================================================

    #[test]
    fn test_mappings_match_fragments() {
        let doc = parse("a(b|c)");
        let options = RenderOptions::new().sourcemap(SourceMapMode::Enabled);
        let rendered = verbatim(options).render(&doc).unwrap();
        let map = match rendered.source_map.unwrap() {
            SourceMapOutput::Map(map) => map,
            other => panic!("Expected finished map, got {other:?}"),
        };
        assert_eq!(map.len(), rendered.fragments);
        assert_eq!(map.len(), 6);

        let emitted: Vec<&Position> = doc
            .iter()
            .map(|id| doc.node(id))
            .filter(|node| !node.raw.is_empty())
            .map(|node| &node.position)
            .collect();
        let mapped: Vec<&Position> = map.mappings.iter().map(|m| &m.original).collect();
        assert_eq!(mapped, emitted);
    }

    #[test]
    fn test_generated_locations_advance() {
        let doc = parse("ab|\ncd");
        let options = RenderOptions::new().sourcemap(SourceMapMode::Enabled);
        let rendered = verbatim(options).render(&doc).unwrap();
        let map = rendered.source_map.unwrap().into_map();
        let generated: Vec<Location> = map.mappings.iter().map(|m| m.generated).collect();
        assert_eq!(
            generated,
            vec![
                Location::new(0, 1, 1),
                Location::new(2, 1, 3),
                Location::new(3, 1, 4),
            ]
        );
        assert_eq!(map.sources, vec!["string".to_string()]);
        assert_eq!(map.sources_content, vec![Some("ab|\ncd".to_string())]);
    }

    #[test]
    fn test_generator_mode_returns_builder() {
        let options = RenderOptions::new()
            .sourcemap(SourceMapMode::Generator)
            .file("out.glob");
        let rendered = verbatim(options).render(&parse("(a)")).unwrap();
        let mut builder = match rendered.source_map.unwrap() {
            SourceMapOutput::Generator(builder) => builder,
            other => panic!("Expected generator, got {other:?}"),
        };
        assert_eq!(builder.mappings().len(), 3);
        builder.add_source("extra");
        let map = builder.finish();
        assert_eq!(map.file.as_deref(), Some("out.glob"));
        assert_eq!(map.sources.len(), 2);
    }

    #[test]
    fn test_empty_fragments_not_counted() {
        let mut renderer = verbatim(RenderOptions::new().sourcemap(SourceMapMode::Enabled));
        renderer.register(NodeKind::Eos, |cx, node, _, _| {
            cx.emit("", node);
            Ok(())
        });
        let rendered = renderer.render(&parse("a")).unwrap();
        assert_eq!(rendered.fragments, 1);
        assert_eq!(rendered.source_map.unwrap().mappings().len(), 1);
    }
}
