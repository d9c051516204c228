//! Recognition rules.
//!
//! A rule is a regular expression tried against the head of the remaining
//! input. Rules are anchored when compiled, so a rule can only ever match at
//! the cursor. Two named groups carry meaning to the engine:
//!
//! - `prefix`: text attached to a group as its prefix (`(?P<prefix>[!@])?\(`)
//! - `suffix`: text attached to a close node as its suffix

use crate::RuleError;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    regex: Regex,
}

/// The result of a successful, non-empty rule match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// The full matched text.
    pub text: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Every capture group after the full match, in order.
    pub groups: Vec<Option<String>>,
}

impl RuleMatch {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }
}

impl Rule {
    /// Compile a rule from a regex pattern.
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let regex = Regex::new(&format!(r"\A(?:{pattern})")).map_err(|e| RuleError {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// A rule matching `text` exactly.
    pub fn literal(text: &str) -> Self {
        let pattern = regex::escape(text);
        let regex = Regex::new(&format!(r"\A(?:{pattern})")).expect("escaped literal is valid");
        Self { pattern, regex }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match against the head of `input`. Zero-width matches count as no
    /// match, so a rule can never stall the parse loop.
    pub fn match_head(&self, input: &str) -> Option<RuleMatch> {
        let caps = self.regex.captures(input)?;
        let full = caps.get(0)?;
        if full.is_empty() {
            return None;
        }
        let named = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
        Some(RuleMatch {
            text: full.as_str().to_string(),
            prefix: named("prefix"),
            suffix: named("suffix"),
            groups: caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        })
    }
}

impl TryFrom<&str> for Rule {
    type Error = RuleError;

    fn try_from(pattern: &str) -> Result<Self, Self::Error> {
        Rule::new(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_matches_only_at_head() {
        let rule = Rule::new("b").unwrap();
        assert!(rule.match_head("abc").is_none());
        assert_eq!(rule.match_head("bcd").unwrap().text, "b");
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let rule = Rule::new("x|y").unwrap();
        assert!(rule.match_head("ay").is_none());
        assert_eq!(rule.match_head("yz").unwrap().text, "y");
    }

    #[test]
    fn test_zero_width_is_no_match() {
        let rule = Rule::new("a*").unwrap();
        assert!(rule.match_head("bbb").is_none());
        assert_eq!(rule.match_head("aab").unwrap().len(), 2);
    }

    #[test]
    fn test_prefix_group() {
        let rule = Rule::new(r"(?P<prefix>[!@*?+])?\(").unwrap();
        let m = rule.match_head("!(a)").unwrap();
        assert_eq!(m.text, "!(");
        assert_eq!(m.prefix.as_deref(), Some("!"));

        let m = rule.match_head("(a)").unwrap();
        assert_eq!(m.prefix, None);
    }

    #[test]
    fn test_suffix_and_positional_groups() {
        let rule = Rule::new(r"\)(?P<suffix>[?*+]?)").unwrap();
        let m = rule.match_head(")+x").unwrap();
        assert_eq!(m.suffix.as_deref(), Some("+"));
        assert_eq!(m.group(0), Some("+"));
    }

    #[test]
    fn test_literal_escapes_metacharacters() {
        let rule = Rule::literal("**");
        assert_eq!(rule.match_head("**/a").unwrap().text, "**");
        assert!(rule.match_head("*a").is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Rule::new("(unclosed").unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
        assert!(!err.message.is_empty());
    }
}
