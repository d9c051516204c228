//! Source map correlation.
//!
//! The renderer records one `Mapping` per emitted fragment: where the
//! fragment starts in the output and the position of the node it came from.
//! Encoding these into a particular wire format is left to consumers; the
//! types here are plain serde data.

use serde::{Deserialize, Serialize};
use spindle_parser::{Location, Position};

/// Whether and how the renderer produces a source map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SourceMapSetting", into = "SourceMapSetting")]
pub enum SourceMapMode {
    #[default]
    Disabled,
    /// Produce a finished `SourceMap`.
    Enabled,
    /// Hand back the `SourceMapBuilder` so callers can keep adding to it.
    Generator,
}

/// Wire form of `SourceMapMode`: `false`, `true` or `"generator"`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SourceMapSetting {
    Flag(bool),
    Named(String),
}

impl TryFrom<SourceMapSetting> for SourceMapMode {
    type Error = String;

    fn try_from(setting: SourceMapSetting) -> Result<Self, Self::Error> {
        match setting {
            SourceMapSetting::Flag(false) => Ok(SourceMapMode::Disabled),
            SourceMapSetting::Flag(true) => Ok(SourceMapMode::Enabled),
            SourceMapSetting::Named(name) if name == "generator" => Ok(SourceMapMode::Generator),
            SourceMapSetting::Named(name) => Err(format!(
                "unknown sourcemap setting '{name}', expected true, false or \"generator\""
            )),
        }
    }
}

impl From<SourceMapMode> for SourceMapSetting {
    fn from(mode: SourceMapMode) -> Self {
        match mode {
            SourceMapMode::Disabled => SourceMapSetting::Flag(false),
            SourceMapMode::Enabled => SourceMapSetting::Flag(true),
            SourceMapMode::Generator => SourceMapSetting::Named("generator".into()),
        }
    }
}

/// One emitted fragment: output location → originating node position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub generated: Location,
    pub original: Position,
}

/// A finished correlation table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub file: Option<String>,
    pub sources: Vec<String>,
    pub sources_content: Vec<Option<String>>,
    pub mappings: Vec<Mapping>,
}

impl SourceMap {
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// The mapping covering `offset` in the generated output: the last one
    /// starting at or before it.
    pub fn lookup(&self, offset: usize) -> Option<&Mapping> {
        let idx = self
            .mappings
            .partition_point(|m| m.generated.offset <= offset);
        idx.checked_sub(1).map(|i| &self.mappings[i])
    }
}

/// Intermediate source map state that can still be extended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapBuilder {
    file: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    mappings: Vec<Mapping>,
}

impl SourceMapBuilder {
    pub fn new(file: Option<String>) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    /// Record a fragment emitted at `generated` for a node at `original`.
    pub fn add_mapping(&mut self, generated: Location, original: &Position) {
        self.add_source(original.source.as_str());
        self.mappings.push(Mapping {
            generated,
            original: original.clone(),
        });
    }

    /// Register a source label, returning its index.
    pub fn add_source(&mut self, label: &str) -> usize {
        if let Some(idx) = self.sources.iter().position(|s| s == label) {
            return idx;
        }
        self.sources.push(label.to_string());
        self.sources_content.push(None);
        self.sources.len() - 1
    }

    pub fn set_source_content(&mut self, label: &str, content: &str) {
        let idx = self.add_source(label);
        self.sources_content[idx] = Some(content.to_string());
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn finish(self) -> SourceMap {
        SourceMap {
            file: self.file,
            sources: self.sources,
            sources_content: self.sources_content,
            mappings: self.mappings,
        }
    }
}

/// The source map handed back by `render`, shaped by `SourceMapMode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SourceMapOutput {
    Map(SourceMap),
    Generator(SourceMapBuilder),
}

impl SourceMapOutput {
    pub fn mappings(&self) -> &[Mapping] {
        match self {
            SourceMapOutput::Map(map) => &map.mappings,
            SourceMapOutput::Generator(builder) => builder.mappings(),
        }
    }

    /// Finish into a `SourceMap` regardless of mode.
    pub fn into_map(self) -> SourceMap {
        match self {
            SourceMapOutput::Map(map) => map,
            SourceMapOutput::Generator(builder) => builder.finish(),
        }
    }
}
