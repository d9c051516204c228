//! Render an extglob document as regular-expression source.
//!
//! | Pattern       | Regex            |
//! |---------------|------------------|
//! | `*`           | `[^/]*`          |
//! | `**`          | `.*`             |
//! | `?`           | `[^/]`           |
//! | `{a,b}`       | `(?:a\|b)`       |
//! | `@(a\|b)`     | `(?:a\|b)`       |
//! | `?(a)`        | `(?:a)?`         |
//! | `*(a)`        | `(?:a)*`         |
//! | `+(a)`        | `(?:a)+`         |
//! | `[!a-z]`      | `[^a-z]`         |
//!
//! Negated groups `!(...)` have no regular-expression equivalent without
//! lookaround and are rejected.

use crate::ExtglobKind;
use spindle_parser::{Node, NodeId, NodeKind};
use spindle_render::{emit_nothing, Emitter, RenderError, RenderOptions, Renderer};

type Cx<'a> = Emitter<'a, ExtglobKind>;

/// Build a renderer producing regular-expression source.
pub fn regex_renderer(options: RenderOptions) -> Renderer<ExtglobKind> {
    let mut renderer = Renderer::new(options);
    renderer
        .register(NodeKind::Eos, emit_nothing)
        .register(NodeKind::Token(ExtglobKind::Text), |cx, node, _, _| {
            cx.emit(&regex::escape(&node.raw), node);
            Ok(())
        })
        .register(NodeKind::Token(ExtglobKind::Escape), |cx, node, _, _| {
            cx.emit(&regex::escape(unescape(&node.raw).as_str()), node);
            Ok(())
        })
        .register(NodeKind::Token(ExtglobKind::Quoted), |cx, node, _, _| {
            let inner = &node.raw[1..node.raw.len() - 1];
            cx.emit(&regex::escape(&unescape(inner)), node);
            Ok(())
        })
        .register(NodeKind::Token(ExtglobKind::Star), fixed("[^/]*"))
        .register(NodeKind::Token(ExtglobKind::Globstar), fixed(".*"))
        .register(NodeKind::Token(ExtglobKind::Qmark), fixed("[^/]"))
        .register(NodeKind::Token(ExtglobKind::Slash), fixed("/"))
        .register(NodeKind::Token(ExtglobKind::Pipe), fixed("|"))
        .register(NodeKind::Token(ExtglobKind::Comma), render_comma)
        .register(NodeKind::Group(ExtglobKind::Paren), render_paren)
        .register(NodeKind::Group(ExtglobKind::Brace), render_brace)
        .register(NodeKind::Group(ExtglobKind::Bracket), render_bracket);
    renderer
}

fn fixed(
    text: &'static str,
) -> impl Fn(&mut Cx<'_>, &Node<ExtglobKind>, &[NodeId], usize) -> Result<(), RenderError> {
    move |cx, node, _, _| {
        cx.emit(text, node);
        Ok(())
    }
}

/// Drop the backslash from each `\x` pair.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.extend(chars.next()),
            _ => out.push(ch),
        }
    }
    out
}

fn render_comma(
    cx: &mut Cx<'_>,
    node: &Node<ExtglobKind>,
    _siblings: &[NodeId],
    _index: usize,
) -> Result<(), RenderError> {
    let in_brace = node
        .parent()
        .is_some_and(|parent| cx.document().node(parent).is(NodeKind::Group(ExtglobKind::Brace)));
    cx.emit(if in_brace { "|" } else { "," }, node);
    Ok(())
}

/// Render a group's contents, skipping its open and close children.
fn render_contents(cx: &mut Cx<'_>, node: &Node<ExtglobKind>) -> Result<(), RenderError> {
    let children = node.children();
    for (index, child) in children.iter().enumerate() {
        let kind = cx.document().node(*child).kind;
        if matches!(kind, NodeKind::Open(_) | NodeKind::Close(_)) {
            continue;
        }
        cx.render_node(*child, children, index)?;
    }
    Ok(())
}

fn require_closed(
    cx: &Cx<'_>,
    node: &Node<ExtglobKind>,
    siblings: &[NodeId],
    index: usize,
) -> Result<(), RenderError> {
    if cx.document().is_closed(siblings[index]) {
        return Ok(());
    }
    Err(RenderError::handler(format!(
        "Unclosed {} group at {}",
        node.kind.dialect().map_or("?", ExtglobKind::name),
        node.position
    )))
}

fn render_paren(
    cx: &mut Cx<'_>,
    node: &Node<ExtglobKind>,
    siblings: &[NodeId],
    index: usize,
) -> Result<(), RenderError> {
    require_closed(cx, node, siblings, index)?;
    let quantifier = match node.prefix.as_deref() {
        None | Some("@") => "",
        Some("?") => "?",
        Some("*") => "*",
        Some("+") => "+",
        Some(other) => {
            return Err(RenderError::handler(format!(
                "Cannot express '{other}(...)' at {} as a regular expression",
                node.position
            )))
        }
    };
    cx.emit("(?:", node);
    render_contents(cx, node)?;
    cx.emit(")", node);
    cx.emit(quantifier, node);
    Ok(())
}

fn render_brace(
    cx: &mut Cx<'_>,
    node: &Node<ExtglobKind>,
    siblings: &[NodeId],
    index: usize,
) -> Result<(), RenderError> {
    require_closed(cx, node, siblings, index)?;
    cx.emit("(?:", node);
    render_contents(cx, node)?;
    cx.emit(")", node);
    Ok(())
}

/// Bracket contents are emitted as class text, not through the token
/// renderers. An empty class has no regex form and is rejected.
fn render_bracket(
    cx: &mut Cx<'_>,
    node: &Node<ExtglobKind>,
    siblings: &[NodeId],
    index: usize,
) -> Result<(), RenderError> {
    require_closed(cx, node, siblings, index)?;
    let doc = cx.document();
    let has_body = node
        .children()
        .iter()
        .any(|child| !matches!(doc.node(*child).kind, NodeKind::Open(_) | NodeKind::Close(_)));
    if !has_body {
        return Err(RenderError::handler(format!(
            "Empty bracket expression at {}",
            node.position
        )));
    }
    cx.emit(if node.prefix.is_some() { "[^" } else { "[" }, node);

    for child in node.children() {
        let child = doc.node(*child);
        let text = match child.kind {
            NodeKind::Open(_) | NodeKind::Close(_) => continue,
            NodeKind::Token(ExtglobKind::Escape) => unescape(&child.raw),
            NodeKind::Token(ExtglobKind::Quoted) => {
                unescape(&child.raw[1..child.raw.len() - 1])
            }
            NodeKind::Token(_) => child.raw.clone(),
            _ => {
                return Err(RenderError::handler(format!(
                    "Unexpected {} inside bracket expression at {}",
                    child.kind, child.position
                )))
            }
        };
        cx.emit(&escape_class(&text), child);
    }

    cx.emit("]", node);
    Ok(())
}

/// Escape characters that are special inside a regex character class,
/// leaving `-` alone so ranges survive.
fn escape_class(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '[' | ']' | '^' | '&' | '~') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
