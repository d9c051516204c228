//! Parser configuration.

use crate::position::SourceLabel;
use serde::{Deserialize, Serialize};

/// How general diagnostics raised by handlers are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Abort the parse on the first diagnostic.
    #[default]
    Throw,
    /// Record diagnostics in the document and keep going.
    Collect,
}

/// Options recognized by the parser engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserOptions {
    /// Tag used in positions and error messages.
    pub source_label: String,
    /// Treat groups still open at end of input as a fatal error.
    pub strict: bool,
    pub error_mode: ErrorMode,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            source_label: SourceLabel::default().to_string(),
            strict: false,
            error_mode: ErrorMode::Throw,
        }
    }
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Shorthand for `error_mode(ErrorMode::Collect)`.
    pub fn lenient(self) -> Self {
        self.error_mode(ErrorMode::Collect)
    }

    pub(crate) fn label(&self) -> SourceLabel {
        SourceLabel::new(&self.source_label)
    }
}
