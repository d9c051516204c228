//! The extglob grammar table and the verbatim renderer.
//!
//! Order matters: escapes come first, then bracket bodies (everything up to
//! the closing `]` is class text), then quoted strings so their contents are
//! never seen by other rules. Paren openers come before `*`/`?` so that `*(`
//! opens a group, and `**` comes before `*`.

use crate::ExtglobKind;
use spindle_parser::{NodeKind, Parser, ParserOptions, Rule};
use spindle_render::{emit_children, emit_nothing, emit_raw, RenderOptions, Renderer};
use std::sync::LazyLock;

struct Rules {
    escape: Rule,
    quoted: Rule,
    paren_open: Rule,
    paren_close: Rule,
    brace_open: Rule,
    brace_close: Rule,
    bracket_open: Rule,
    bracket_close: Rule,
    globstar: Rule,
    star: Rule,
    qmark: Rule,
    slash: Rule,
    comma: Rule,
    pipe: Rule,
    class_text: Rule,
    text: Rule,
    stray: Rule,
}

fn rule(pattern: &str) -> Rule {
    Rule::new(pattern).expect("extglob grammar rules are valid")
}

static RULES: LazyLock<Rules> = LazyLock::new(|| Rules {
    escape: rule(r"\\(?s:.)"),
    quoted: rule(r#""(?:[^"\\]|\\(?s:.))*""#),
    paren_open: rule(r"(?P<prefix>[!@*?+])?\("),
    paren_close: Rule::literal(")"),
    brace_open: Rule::literal("{"),
    brace_close: Rule::literal("}"),
    bracket_open: rule(r"\[(?P<prefix>[!^])?"),
    bracket_close: Rule::literal("]"),
    globstar: Rule::literal("**"),
    star: Rule::literal("*"),
    qmark: Rule::literal("?"),
    slash: Rule::literal("/"),
    comma: Rule::literal(","),
    pipe: Rule::literal("|"),
    class_text: rule(r"[^\\\]]+"),
    text: rule(r#"[^\\"(){}\[\]*?/,|!@+]+"#),
    // Qualifiers not followed by `(`, unterminated quotes, a trailing backslash.
    stray: rule(r#"[!@+"\\]"#),
});

/// Build a parser configured with the extglob grammar.
pub fn parser(options: ParserOptions) -> Parser<ExtglobKind> {
    let rules = &*RULES;
    let pipe = rules.pipe.clone();
    let class_text = rules.class_text.clone();
    let mut parser = Parser::new(options);

    parser
        .register_capture(ExtglobKind::Escape, rules.escape.clone())
        // Inside `[...]` only `\` and `]` are special.
        .register_middleware(move |state| {
            if !state.is_inside(ExtglobKind::Bracket) {
                return Ok(None);
            }
            let start = state.mark();
            Ok(state
                .eat(&class_text)
                .map(|_| state.push_token(ExtglobKind::Text, start)))
        })
        .register_capture(ExtglobKind::Quoted, rules.quoted.clone())
        .register_pair(
            ExtglobKind::Paren,
            rules.paren_open.clone(),
            rules.paren_close.clone(),
        )
        .register_pair(
            ExtglobKind::Brace,
            rules.brace_open.clone(),
            rules.brace_close.clone(),
        )
        .register_pair(
            ExtglobKind::Bracket,
            rules.bracket_open.clone(),
            rules.bracket_close.clone(),
        )
        .register_capture(ExtglobKind::Globstar, rules.globstar.clone())
        .register_capture(ExtglobKind::Star, rules.star.clone())
        .register_capture(ExtglobKind::Qmark, rules.qmark.clone())
        .register_capture(ExtglobKind::Slash, rules.slash.clone())
        .register_capture(ExtglobKind::Comma, rules.comma.clone())
        // Alternation only means something inside a group.
        .register_middleware(move |state| {
            let start = state.mark();
            if state.eat(&pipe).is_none() {
                return Ok(None);
            }
            if state.current_group().is_none() {
                state.diagnostic("Alternation '|' outside of a group")?;
            }
            Ok(Some(state.push_token(ExtglobKind::Pipe, start)))
        })
        .register_capture(ExtglobKind::Text, rules.text.clone())
        .register_capture(ExtglobKind::Text, rules.stray.clone());

    parser
}

const TOKENS: [ExtglobKind; 9] = [
    ExtglobKind::Escape,
    ExtglobKind::Quoted,
    ExtglobKind::Globstar,
    ExtglobKind::Star,
    ExtglobKind::Qmark,
    ExtglobKind::Slash,
    ExtglobKind::Comma,
    ExtglobKind::Pipe,
    ExtglobKind::Text,
];

const GROUPS: [ExtglobKind; 3] = [ExtglobKind::Paren, ExtglobKind::Brace, ExtglobKind::Bracket];

/// A renderer that reproduces the parsed input exactly.
pub fn verbatim_renderer(options: RenderOptions) -> Renderer<ExtglobKind> {
    let mut renderer = Renderer::new(options);
    renderer.register(NodeKind::Eos, emit_nothing);
    for kind in TOKENS {
        renderer.register(NodeKind::Token(kind), emit_raw);
    }
    for kind in GROUPS {
        renderer
            .register(NodeKind::Group(kind), emit_children)
            .register(NodeKind::Open(kind), emit_raw)
            .register(NodeKind::Close(kind), emit_raw);
    }
    renderer
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use spindle_parser::{Document, ParseErrorKind};

    fn parse(pattern: &str) -> Document<ExtglobKind> {
        parser(ParserOptions::default()).parse(pattern).unwrap()
    }

    /// Top-level kinds, without the trailing eos.
    fn top_kinds(doc: &Document<ExtglobKind>) -> Vec<NodeKind<ExtglobKind>> {
        let top = doc.top_level();
        top[..top.len() - 1]
            .iter()
            .map(|id| doc.node(*id).kind)
            .collect()
    }

    fn verbatim(pattern: &str) -> String {
        let doc = parse(pattern);
        verbatim_renderer(RenderOptions::default())
            .render(&doc)
            .unwrap()
            .output
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    #[test]
    fn test_star_and_globstar() {
        let doc = parse("**/*.rs");
        assert_eq!(
            top_kinds(&doc),
            vec![
                NodeKind::Token(ExtglobKind::Globstar),
                NodeKind::Token(ExtglobKind::Slash),
                NodeKind::Token(ExtglobKind::Star),
                NodeKind::Token(ExtglobKind::Text),
            ]
        );
    }

    #[test]
    fn test_escape_hides_metacharacter() {
        let doc = parse(r"a\*b");
        let top = doc.top_level();
        assert_eq!(doc.node(top[1]).kind, NodeKind::Token(ExtglobKind::Escape));
        assert_eq!(doc.node(top[1]).raw, r"\*");
    }

    #[test]
    fn test_quoted_string_is_one_token() {
        let doc = parse(r#""a(b)*"c"#);
        let top = doc.top_level();
        assert_eq!(doc.node(top[0]).kind, NodeKind::Token(ExtglobKind::Quoted));
        assert_eq!(doc.node(top[0]).raw, r#""a(b)*""#);
    }

    #[test]
    fn test_stray_qualifier_is_text() {
        let doc = parse("a!b+c");
        assert!(top_kinds(&doc)
            .iter()
            .all(|k| *k == NodeKind::Token(ExtglobKind::Text)));
    }

    #[test]
    fn test_trailing_backslash_is_text() {
        let doc = parse(r"a\");
        let top = doc.top_level();
        assert_eq!(doc.node(top[1]).kind, NodeKind::Token(ExtglobKind::Text));
        assert_eq!(doc.node(top[1]).raw, r"\");
    }

    // =========================================================================
    // Groups
    // =========================================================================

    #[test]
    fn test_extglob_prefixes() {
        for prefix in ["!", "@", "*", "?", "+"] {
            let doc = parse(&format!("{prefix}(a|b)"));
            let group = doc.top_level()[0];
            assert_eq!(doc.node(group).kind, NodeKind::Group(ExtglobKind::Paren));
            assert_eq!(doc.node(group).prefix.as_deref(), Some(prefix));
        }
    }

    #[test]
    fn test_brace_with_commas() {
        let doc = parse("{a,b}");
        let group = doc.top_level()[0];
        let kinds: Vec<_> = doc
            .children(group)
            .iter()
            .map(|id| doc.node(*id).kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Open(ExtglobKind::Brace),
                NodeKind::Token(ExtglobKind::Text),
                NodeKind::Token(ExtglobKind::Comma),
                NodeKind::Token(ExtglobKind::Text),
                NodeKind::Close(ExtglobKind::Brace),
            ]
        );
    }

    #[test]
    fn test_negated_bracket() {
        let doc = parse("[!abc]");
        let group = doc.top_level()[0];
        assert_eq!(doc.node(group).prefix.as_deref(), Some("!"));
        assert!(doc.is_closed(group));
    }

    #[test]
    fn test_bracket_body_is_class_text() {
        for pattern in ["[(]", "[)]", "[{]", "[}|,*]", r#"[a"b]"#] {
            let doc = parse(pattern);
            let group = doc.top_level()[0];
            assert!(doc.is_closed(group), "{pattern}");
            let kinds: Vec<_> = doc
                .children(group)
                .iter()
                .map(|id| doc.node(*id).kind)
                .collect();
            assert_eq!(
                kinds,
                vec![
                    NodeKind::Open(ExtglobKind::Bracket),
                    NodeKind::Token(ExtglobKind::Text),
                    NodeKind::Close(ExtglobKind::Bracket),
                ]
            );
        }
    }

    #[test]
    fn test_escape_inside_bracket() {
        let doc = parse(r"[\]a]");
        let group = doc.top_level()[0];
        let escape = doc.children(group)[1];
        assert_eq!(doc.node(escape).kind, NodeKind::Token(ExtglobKind::Escape));
        assert!(doc.is_closed(group));
    }

    #[test]
    fn test_mismatched_groups() {
        let err = parser(ParserOptions::default())
            .parse("@(a]")
            .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnbalancedClose);
        assert!(err.message.contains("Missing opening bracket"));
    }

    // =========================================================================
    // Pipe diagnostics
    // =========================================================================

    #[test]
    fn test_pipe_inside_group_is_fine() {
        for pattern in ["+(a|b)", "{a|b}", "[|]", "@({x|y})"] {
            let doc = parse(pattern);
            assert!(!doc.has_errors(), "{pattern}");
        }
    }

    #[test]
    fn test_pipe_outside_group_collected() {
        let doc = parser(ParserOptions::new().lenient())
            .parse("a|b")
            .unwrap();
        assert_eq!(doc.errors().len(), 1);
        assert!(doc.errors()[0].message.contains("outside of a group"));
    }

    #[test]
    fn test_pipe_outside_group_thrown() {
        let err = parser(ParserOptions::default()).parse("a|b").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Diagnostic);
    }

    // =========================================================================
    // Verbatim rendering
    // =========================================================================

    #[test]
    fn test_verbatim_round_trips() {
        for pattern in [
            "",
            "*.js",
            "**/src/*.{rs,toml}",
            "!(foo|bar).txt",
            "@(a|+(b|c))",
            "[!a-z]?*",
            r#""quoted (text)"\*"#,
            "line1\nline2/(a|b)",
        ] {
            assert_eq!(verbatim(pattern), pattern);
        }
    }

    #[test]
    fn test_verbatim_keeps_unterminated_groups() {
        assert_eq!(verbatim("*(a|b"), "*(a|b");
    }
}
