//! # Source Map Decoding
//!
//! Minimal Source Map v3 reader: decodes `mappings` into per-line segment tables and
//! answers position lookups against them. Lines are 1-based and columns 0-based on
//! both the generated and the original side.

mod error;
mod vlq;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::token::{RawSourceCode, RawToken, SourceCodeLine};

pub use error::SourceMapError;

/// One decoded mapping segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_column: u32,
    pub source: Option<u32>,
    /// 0-based
    pub original_line: u32,
    pub original_column: u32,
    pub name: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: Option<u64>,
    file: Option<String>,
    source_root: Option<String>,
    sources: Option<Vec<Option<String>>>,
    sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    mappings: String,
    sections: Option<serde_json::Value>,
}

/// Source code context around a mapped position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnippet {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
    pub context_lines: Vec<SourceCodeLine>,
}

/// Every source listed by a map, with its embedded content when present
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpackedSources {
    pub sources: BTreeMap<String, Option<String>>,
    pub source_root: Option<String>,
    pub file: Option<String>,
    pub total_sources: usize,
}

/// A decoded Source Map v3 document
#[derive(Debug, Clone)]
pub struct SourceMap {
    file: Option<String>,
    source_root: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    lines: Vec<Vec<Mapping>>,
}

impl SourceMap {
    /// Parse a source map from its JSON text
    pub fn parse(text: &str) -> Result<Self, SourceMapError> {
        let raw: RawSourceMap = serde_json::from_str(text)?;

        if raw.sections.is_some() {
            return Err(SourceMapError::IndexedMap);
        }
        if let Some(version) = raw.version
            && version != 3
        {
            return Err(SourceMapError::UnsupportedVersion(version));
        }

        let sources: Vec<String> = raw
            .sources
            .ok_or(SourceMapError::MissingSources)?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        let lines = decode_mappings(&raw.mappings, sources.len(), raw.names.len())?;

        Ok(Self {
            file: raw.file,
            source_root: raw.source_root.filter(|root| !root.is_empty()),
            sources,
            sources_content: raw.sources_content.unwrap_or_default(),
            names: raw.names,
            lines,
        })
    }

    /// Find the mapping covering a generated position.
    ///
    /// Picks the last segment on `line` starting at or before `column`. Segments
    /// without a source are treated as unmapped.
    pub fn lookup(&self, line: u32, column: u32) -> Result<Option<&Mapping>, SourceMapError> {
        let index = line.checked_sub(1).ok_or(SourceMapError::InvalidLine)? as usize;
        let Some(segments) = self.lines.get(index) else {
            return Ok(None);
        };

        let upper = segments.partition_point(|m| m.generated_column <= column);
        Ok(upper
            .checked_sub(1)
            .map(|i| &segments[i])
            .filter(|m| m.source.is_some()))
    }

    /// Source path with `sourceRoot` applied
    pub fn source_path(&self, index: u32) -> String {
        let source = self
            .sources
            .get(index as usize)
            .map(String::as_str)
            .unwrap_or_default();
        match &self.source_root {
            Some(root) if root.ends_with('/') => format!("{root}{source}"),
            Some(root) => format!("{root}/{source}"),
            None => source.to_string(),
        }
    }

    /// Embedded content of a source, if the map carries it
    pub fn source_content(&self, index: u32) -> Option<&str> {
        self.sources_content
            .get(index as usize)
            .and_then(|content| content.as_deref())
    }

    /// Lines `original_line ± context` of a source. `original_line` is 1-based.
    pub fn context_lines(
        &self,
        source: u32,
        original_line: u32,
        context: u32,
    ) -> Vec<SourceCodeLine> {
        let Some(content) = self.source_content(source) else {
            return Vec::new();
        };

        let first = original_line.saturating_sub(context).max(1);
        let last = original_line.saturating_add(context);
        content
            .lines()
            .enumerate()
            .map(|(i, raw)| (i as u32 + 1, raw))
            .skip_while(|(n, _)| *n < first)
            .take_while(|(n, _)| *n <= last)
            .map(|(n, raw)| SourceCodeLine {
                line: n,
                is_stack_line: n == original_line,
                raw: raw.to_string(),
            })
            .collect()
    }

    /// Resolve a generated position into a resolver-shaped token
    pub fn token_for(
        &self,
        line: u32,
        column: u32,
        context: u32,
    ) -> Result<RawToken, SourceMapError> {
        let mapping = self
            .lookup(line, column)?
            .ok_or(SourceMapError::NoMapping { line, column })?;
        let source = mapping.source.unwrap_or_default();
        let original_line = mapping.original_line.saturating_add(1);

        Ok(RawToken {
            line: original_line,
            column: mapping.original_column,
            src: self.source_path(source),
            source_code: self
                .context_lines(source, original_line, context)
                .into_iter()
                .map(|code| RawSourceCode {
                    line: code.line,
                    is_stack_line: code.is_stack_line,
                    raw: code.raw,
                })
                .collect(),
        })
    }

    /// Context snippet for a generated position, `None` if nothing maps there
    pub fn lookup_context(
        &self,
        line: u32,
        column: u32,
        context: u32,
    ) -> Result<Option<ContextSnippet>, SourceMapError> {
        let Some(mapping) = self.lookup(line, column)? else {
            return Ok(None);
        };
        let source = mapping.source.unwrap_or_default();
        let original_line = mapping.original_line.saturating_add(1);

        Ok(Some(ContextSnippet {
            file: self.source_path(source),
            line: original_line,
            column: mapping.original_column,
            name: mapping
                .name
                .and_then(|n| self.names.get(n as usize))
                .cloned(),
            context_lines: self.context_lines(source, original_line, context),
        }))
    }

    /// List every source with its embedded content
    pub fn unpack(&self) -> UnpackedSources {
        let sources = self
            .sources
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let content = self
                    .source_content(i as u32)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string);
                (name.clone(), content)
            })
            .collect();

        UnpackedSources {
            sources,
            source_root: self.source_root.clone(),
            file: self.file.clone(),
            total_sources: self.sources.len(),
        }
    }
}

/// Decode a `mappings` string into segments grouped by generated line.
///
/// Every field except the generated column is relative to the previous segment across
/// line boundaries; the generated column resets at each `;`.
fn decode_mappings(
    mappings: &str,
    source_count: usize,
    name_count: usize,
) -> Result<Vec<Vec<Mapping>>, SourceMapError> {
    let mut lines = Vec::new();
    let mut fields = Vec::with_capacity(5);

    let mut source: i64 = 0;
    let mut original_line: i64 = 0;
    let mut original_column: i64 = 0;
    let mut name: i64 = 0;

    for line in mappings.split(';') {
        let mut generated_column: i64 = 0;
        let mut segments = Vec::new();

        for segment in line.split(',').filter(|s| !s.is_empty()) {
            vlq::decode_segment(segment, &mut fields)?;

            generated_column += fields[0];
            let mut mapping = Mapping {
                generated_column: to_u32(generated_column)?,
                source: None,
                original_line: 0,
                original_column: 0,
                name: None,
            };

            match fields.len() {
                1 => {}
                4 | 5 => {
                    source += fields[1];
                    original_line += fields[2];
                    original_column += fields[3];
                    if to_u32(source)? as usize >= source_count {
                        return Err(SourceMapError::OutOfRange);
                    }
                    mapping.source = Some(to_u32(source)?);
                    mapping.original_line = to_u32(original_line)?;
                    mapping.original_column = to_u32(original_column)?;

                    if let Some(delta) = fields.get(4) {
                        name += delta;
                        if to_u32(name)? as usize >= name_count {
                            return Err(SourceMapError::OutOfRange);
                        }
                        mapping.name = Some(to_u32(name)?);
                    }
                }
                n => return Err(SourceMapError::InvalidSegment(n)),
            }

            segments.push(mapping);
        }

        segments.sort_by_key(|m| m.generated_column);
        lines.push(segments);
    }

    Ok(lines)
}

fn to_u32(value: i64) -> Result<u32, SourceMapError> {
    u32::try_from(value).map_err(|_| SourceMapError::OutOfRange)
}
